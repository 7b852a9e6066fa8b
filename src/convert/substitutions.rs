//! Literal character substitutions.

use regex::Regex;
use std::sync::LazyLock;

/// Rules in application order. `---` must precede `--`, and the line-break
/// rule must see `\\` before the escape rules strip single backslashes.
static LITERAL_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\\textonehalf(?:\{\})?", "½"),
        (r"\\textonequarter(?:\{\})?", "¼"),
        (r"\\textthreequarters?(?:\{\})?", "¾"),
        (r"\\textonethird(?:\{\})?", "⅓"),
        (r"\\texttwothirds(?:\{\})?", "⅔"),
        (r"\\textdegree(?:\{\})?", "°"),
        (r"\\(?:ldots|dots)\b(?:\{\})?", "…"),
        (r"\\dotfill\b", r#"<span class="dotfill"></span>"#),
        (r"\\hrulefill\b", r#"<hr class="section-divider">"#),
        (r"\\\\(?:\[[^\]]*\])?", "<br>"),
        (r"\\newline\b", "<br>"),
        (r"~", "&nbsp;"),
        (r"\\&", "&amp;"),
        (r"\\#", "#"),
        (r"\\%", "%"),
        (r"``", "\u{201C}"),
        (r"''", "\u{201D}"),
        (r"`", "\u{2018}"),
        (r"---", "\u{2014}"),
        (r"--", "\u{2013}"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("literal substitution regex"),
            replacement,
        )
    })
    .collect()
});

/// Pass 7: glyphs, escapes, quotes, dashes and line breaks.
pub fn substitute_literals(body: &str) -> String {
    LITERAL_RULES
        .iter()
        .fold(body.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_with_and_without_braces() {
        assert_eq!(
            substitute_literals(
                r"1\textonehalf{} cups, \textonequarter tsp, \textthreequarters{} cup"
            ),
            "1½ cups, ¼ tsp, ¾ cup"
        );
        assert_eq!(substitute_literals(r"\textonethird\texttwothirds"), "⅓⅔");
    }

    #[test]
    fn degrees_and_ellipsis() {
        assert_eq!(substitute_literals(r"180\textdegree C\ldots"), "180° C…");
    }

    #[test]
    fn escapes_and_breaks() {
        assert_eq!(
            substitute_literals(r"Salt \& pepper\\ \#1 at 5\%~off\newline"),
            "Salt &amp; pepper<br> #1 at 5%&nbsp;off<br>"
        );
    }

    #[test]
    fn quotes_and_dashes() {
        assert_eq!(
            substitute_literals("``Hot'' pan --- 10--12 `min'"),
            "\u{201C}Hot\u{201D} pan \u{2014} 10\u{2013}12 \u{2018}min'"
        );
    }

    #[test]
    fn leftover_dotfill_and_rule() {
        assert_eq!(
            substitute_literals(r"a\dotfill b\hrulefill"),
            r#"a<span class="dotfill"></span> b<hr class="section-divider">"#
        );
    }

    #[test]
    fn idempotent_on_own_output() {
        let once = substitute_literals(r"½ \textonehalf ``q'' -- \& ~ \\ \dotfill");
        assert_eq!(substitute_literals(&once), once);
    }
}
