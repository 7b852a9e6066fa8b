//! List and block environments.
//!
//! `enumerate` and `itemize` nest, and a lazy regex over the whole body would
//! pair an outer `\begin` with an inner `\end`. Instead the innermost list is
//! found directly: the last `\begin{..}` before the first `\end{..}` always
//! encloses no other list. Replacing it with HTML exposes the next innermost
//! one, until no list markers are left.

use super::inline::convert_inline;
use regex::Regex;
use std::sync::LazyLock;

static LIST_BEGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\begin\{(itemize|enumerate)\}").expect("list begin regex"));
static LIST_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\end\{(itemize|enumerate)\}").expect("list end regex"));
/// `\item`, optionally with a `[label]`.
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\item\b(?:\s*\[[^\]]*\])?\s*").expect("item regex"));
static TRAILING_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\\\s*$").expect("trailing break regex"));
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex"));
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("spaces regex"));
static BREAK_SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?<br><br> ?").expect("break spacing regex"));
static EM_ENV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{em\}(.*?)\\end\{em\}").expect("em environment regex")
});
static QUOTE_ENV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{quote\}(.*?)\\end\{quote\}").expect("quote environment regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    fn from_env(name: &str) -> Self {
        if name == "enumerate" {
            ListKind::Ordered
        } else {
            ListKind::Unordered
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Unordered => "ul",
        }
    }
}

/// Pass 3: lists innermost first, then `em` and `quote` blocks.
pub fn convert_environments(body: &str) -> String {
    let html = convert_lists(body);
    let html = EM_ENV_RE.replace_all(&html, "<em>${1}</em>");
    QUOTE_ENV_RE
        .replace_all(&html, "<blockquote>${1}</blockquote>")
        .into_owned()
}

fn convert_lists(body: &str) -> String {
    let mut html = body.to_string();
    let mut search_from = 0;
    while let Some(end) = LIST_END_RE.find_at(&html, search_from) {
        let (end_start, end_end) = (end.start(), end.end());
        let begin = LIST_BEGIN_RE
            .captures_iter(&html[..end_start])
            .last()
            .and_then(|c| {
                let whole = c.get(0)?;
                Some((whole.start(), whole.end(), c[1].to_string()))
            });

        // An `\end` with no opening marker is skipped; cleanup removes it.
        let Some((begin_start, begin_end, env)) = begin else {
            search_from = end_end;
            continue;
        };

        let rendered = render_list(ListKind::from_env(&env), &html[begin_end..end_start]);
        html.replace_range(begin_start..end_end, &rendered);
    }
    html
}

fn render_list(kind: ListKind, content: &str) -> String {
    let items: Vec<String> = ITEM_RE
        .split(content)
        .skip(1)
        .filter_map(render_item)
        .collect();

    let tag = kind.tag();
    if items.is_empty() {
        return format!("<{tag}></{tag}>");
    }
    let mut html = format!("<{tag}>\n");
    for item in items {
        html.push_str(&format!("    <li>{item}</li>\n"));
    }
    html.push_str(&format!("</{tag}>"));
    html
}

/// Normalize one item's text. Blank lines inside an item are paragraph breaks;
/// single newlines are soft wraps.
fn render_item(raw: &str) -> Option<String> {
    let text = TRAILING_BREAK_RE.replace(raw.trim(), "");
    let text = convert_inline(&text).replace('~', "&nbsp;");
    let text = PARAGRAPH_RE.replace_all(&text, "<br><br>");
    let text = text.replace('\n', " ");
    let text = SPACES_RE.replace_all(&text, " ");
    let text = BREAK_SPACING_RE.replace_all(&text, "<br><br>");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
