//! Inline formatting commands.

use regex::Regex;
use std::sync::LazyLock;

/// Upper bound on rewrite rounds. Each round unwraps at least one nesting
/// level, so real recipes settle in two or three.
const MAX_ROUNDS: usize = 10;

/// Command argument with at most one level of nested braces.
const ARG: &str = r"\{([^{}]*(?:\{[^{}]*\}[^{}]*)*)\}";

static INLINE_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("textbf", "<strong>${1}</strong>"),
        ("textit", "<em>${1}</em>"),
        ("emph", "<em>${1}</em>"),
        ("underline", "<u>${1}</u>"),
    ]
    .into_iter()
    .map(|(command, replacement)| {
        let re = Regex::new(&format!(r"\\{command}{ARG}")).expect("inline command regex");
        (re, replacement)
    })
    .collect()
});

/// Pass 4: bold, italic, emphasis and underline, re-applied until nothing
/// changes so nested commands convert from the outside in.
pub fn convert_inline(text: &str) -> String {
    let mut html = text.to_string();
    for _ in 0..MAX_ROUNDS {
        let next = INLINE_RULES
            .iter()
            .fold(html.clone(), |acc, (re, replacement)| {
                re.replace_all(&acc, *replacement).into_owned()
            });
        if next == html {
            break;
        }
        html = next;
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(convert_inline(r"\textbf{a}"), "<strong>a</strong>");
        assert_eq!(convert_inline(r"\textit{a}"), "<em>a</em>");
        assert_eq!(convert_inline(r"\emph{a}"), "<em>a</em>");
        assert_eq!(convert_inline(r"\underline{a}"), "<u>a</u>");
    }

    #[test]
    fn nested_bold_italic() {
        assert_eq!(
            convert_inline(r"\textbf{\textit{x}}"),
            "<strong><em>x</em></strong>"
        );
        assert_eq!(
            convert_inline(r"\emph{very \textbf{hot}} pan"),
            "<em>very <strong>hot</strong></em> pan"
        );
    }

    #[test]
    fn deep_nesting_converges() {
        assert_eq!(
            convert_inline(r"\textbf{\emph{\underline{\textit{deep}}}}"),
            "<strong><em><u><em>deep</em></u></em></strong>"
        );
    }

    #[test]
    fn unbalanced_input_left_alone() {
        assert_eq!(convert_inline(r"\textbf{open"), r"\textbf{open");
    }

    #[test]
    fn other_commands_untouched() {
        assert_eq!(convert_inline(r"\textsc{Caps}"), r"\textsc{Caps}");
    }
}
