//! Residue removal after the targeted passes.

use regex::Regex;
use std::sync::LazyLock;

const MAX_UNWRAP_ROUNDS: usize = 10;

static RESIDUE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\\(?:tiny|scriptsize|footnotesize|small|normalsize|large|Large|LARGE|huge|Huge)\b[ \t]*",
        r"\\(?:begin|end)\{(?:itemize|enumerate|quote|em|multicols\*?)\}(?:\{\d+\})?",
        r"\\item\b(?:\[[^\]]*\])?[ \t]*",
        r"\{\d+pt\}",
        r"\{\}",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("cleanup regex"))
    .collect()
});

/// A brace group not attached to a command: not preceded by a letter (command
/// name), `*`, `]` (options) or `}` (earlier argument).
static BARE_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[^A-Za-z*\]}\\])\{([^{}]*)\}").expect("bare group regex"));

/// Known bad nestings from ingredient grids meeting lists and headings.
static NESTING_FIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["li", "h3", "h4"]
        .into_iter()
        .map(|tag| {
            Regex::new(&format!(
                r#"<div class="ingredient-item">\s*(<{tag}>.*?</{tag}>)\s*</div>"#
            ))
            .expect("nesting fix regex")
        })
        .collect()
});

static EMPTY_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(ul|ol)>\s*</(?:ul|ol)>").expect("empty list regex"));
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank run regex"));

/// Pass 8: remove what earlier passes left behind and normalize whitespace.
pub fn cleanup(body: &str) -> String {
    let mut html = RESIDUE_RES
        .iter()
        .fold(body.to_string(), |acc, re| re.replace_all(&acc, "").into_owned());

    for _ in 0..MAX_UNWRAP_ROUNDS {
        let next = BARE_GROUP_RE.replace_all(&html, "${1}${2}").into_owned();
        if next == html {
            break;
        }
        html = next;
    }

    for fix in NESTING_FIXES.iter() {
        html = fix.replace_all(&html, "${1}").into_owned();
    }
    let html = EMPTY_LIST_RE.replace_all(&html, "");
    let html = BLANK_RUN_RE.replace_all(&html, "\n\n");
    html.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_switches_removed() {
        assert_eq!(cleanup(r"\small Note \Large big"), "Note big");
    }

    #[test]
    fn leftover_markers_removed() {
        assert_eq!(
            cleanup(r"\begin{itemize}x\end{itemize} \item y \begin{multicols}{2}"),
            "x y"
        );
    }

    #[test]
    fn point_sizes_and_empty_groups_removed() {
        assert_eq!(cleanup("a{20pt}b{}c"), "abc");
    }

    #[test]
    fn bare_braces_unwrapped_command_args_kept() {
        assert_eq!(cleanup("{plain} and {{double}}"), "plain and double");
        assert_eq!(cleanup(r"\garnish{parsley}"), r"\garnish{parsley}");
        assert_eq!(cleanup(r"\frac{1}{2}"), r"\frac{1}{2}");
        assert_eq!(cleanup(r"\opt[x]{y}"), r"\opt[x]{y}");
    }

    #[test]
    fn malformed_nesting_unwrapped() {
        assert_eq!(
            cleanup(r#"<div class="ingredient-item"><li>Flour</li></div>"#),
            "<li>Flour</li>"
        );
        assert_eq!(
            cleanup(r#"<div class="ingredient-item"><h4>Dry</h4></div>"#),
            "<h4>Dry</h4>"
        );
    }

    #[test]
    fn empty_lists_removed() {
        assert_eq!(cleanup("a<ul></ul>b<ol>\n</ol>c"), "abc");
    }

    #[test]
    fn blank_runs_collapse_and_result_trimmed() {
        assert_eq!(cleanup("\n\na\n\n\n\nb\n \n\t\nc\n\n"), "a\n\nb\n\nc");
    }

    #[test]
    fn idempotent_on_own_output() {
        let once = cleanup("{x} \\small\n\n\n<ul></ul>{{y}} \\foo{z}");
        assert_eq!(cleanup(&once), once);
    }
}
