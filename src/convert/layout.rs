//! Layout stripping and headings.

use regex::Regex;
use std::sync::LazyLock;

/// Unescaped `%` to end of line.
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[^\\])%.*$").expect("comment regex"));
static SETLENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\setlength\{[^{}]*\}\{[^{}]*\}").expect("setlength regex")
});
static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[vh]space\*?\{[^{}]*\}").expect("space regex"));
static SKIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:noindent|smallskip|medskip|bigskip)\b[ \t]*").expect("skip regex")
});
static PAGE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(?:newpage|clearpage)\b").expect("page break regex"));

/// Brace group allowing one level of nesting.
const GROUP: &str = r"\{([^{}]*(?:\{[^{}]*\}[^{}]*)*)\}";

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\\section\*?{GROUP}")).expect("section regex"));
static SUBSECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\\subsection\*?{GROUP}")).expect("subsection regex")
});

pub const PAGE_BREAK_HTML: &str = r#"<div class="page-break"></div>"#;

/// Pass 1: remove commands that only affect print layout.
pub fn strip_layout(body: &str) -> String {
    let html = COMMENT_RE.replace_all(body, "${1}");
    let html = SETLENGTH_RE.replace_all(&html, "");
    let html = SPACE_RE.replace_all(&html, "");
    let html = SKIP_RE.replace_all(&html, "");
    PAGE_BREAK_RE
        .replace_all(&html, PAGE_BREAK_HTML)
        .into_owned()
}

/// Pass 2: two heading levels.
pub fn convert_headings(body: &str) -> String {
    let html = SECTION_RE.replace_all(body, "<h3>${1}</h3>");
    SUBSECTION_RE
        .replace_all(&html, "<h4>${1}</h4>")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_removed_but_escaped_percent_kept() {
        let out = strip_layout("Milk 2\\% fat % the good stuff\n% whole line\nNext");
        assert_eq!(out, "Milk 2\\% fat \n\nNext");
    }

    #[test]
    fn spacing_commands_removed() {
        let out = strip_layout(
            "\\setlength{\\columnsep}{20pt}\\vspace*{1em}A\\hspace{2mm}B\n\\noindent C\\medskip",
        );
        assert_eq!(out, "AB\nC");
    }

    #[test]
    fn page_breaks_become_markers() {
        assert_eq!(strip_layout("\\newpage"), PAGE_BREAK_HTML);
        assert_eq!(strip_layout("\\clearpage"), PAGE_BREAK_HTML);
    }

    #[test]
    fn noindent_prefix_of_longer_word_untouched() {
        assert_eq!(strip_layout("\\noindentation"), "\\noindentation");
    }

    #[test]
    fn headings_starred_and_plain() {
        assert_eq!(convert_headings("\\section*{Ingredients}"), "<h3>Ingredients</h3>");
        assert_eq!(convert_headings("\\section{Method}"), "<h3>Method</h3>");
        assert_eq!(convert_headings("\\subsection*{Sauce}"), "<h4>Sauce</h4>");
    }

    #[test]
    fn heading_with_nested_braces() {
        assert_eq!(
            convert_headings("\\section*{The \\textbf{Best} Crust}"),
            "<h3>The \\textbf{Best} Crust</h3>"
        );
    }

    #[test]
    fn subsubsection_is_not_a_heading() {
        assert_eq!(convert_headings("\\subsubsection{X}"), "\\subsubsection{X}");
    }
}
