//! Ingredient grids.
//!
//! Ingredient lists follow the leader-dots convention, one ingredient per line:
//!
//! ```text
//! Flour \dotfill 2 cups\\
//! ```
//!
//! Two places produce them. Most recipes wrap the list in a `multicols` block
//! (pass 5); short lists sit directly under an "Ingredients" heading with no
//! environment around them (pass 6). Both render to the same grid markup.
//! A `\columnbreak` only balanced the printed columns, so both columns
//! flatten into one sequence of items.

use maud::{Markup, PreEscaped, html};
use regex::Regex;
use std::sync::LazyLock;

const DOTFILL: &str = r"\dotfill";
const LINE_BREAK: &str = r"\\";

static MULTICOLS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{multicols\*?\}(?:\{\d+\})?(.*?)\\end\{multicols\*?\}")
        .expect("multicols regex")
});

/// Residue that survives inside a block that already holds HTML.
static BLOCK_RESIDUE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\\setlength\{[^{}]*\}(?:\{[^{}]*\})?",
        r"\{\d+pt\}",
        r"\\columnbreak\b",
        r"\\item\b\s*",
        r"\\(?:begin|end)\{(?:itemize|enumerate)\}",
        r"(?m)^[ \t]*\{[^{}]*\}[ \t]*$",
        r"(?m)^[ \t]*\}",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("block residue regex"))
    .collect()
});

static INGREDIENTS_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<h[34]>\s*Ingredients\s*</h[34]>").expect("ingredients heading regex")
});

/// Where a loose ingredient region stops.
static REGION_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<h[34]>|<[ou]l>|\\begin\{|<div class="ingredients-columns">"#)
        .expect("region end regex")
});

/// One ingredient, split on the leader dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLine {
    pub name: String,
    /// `None` when the line is not a two-part leader-dots line.
    pub amount: Option<String>,
}

impl IngredientLine {
    fn render(&self) -> Markup {
        html! {
            div class="ingredient-item" {
                @match &self.amount {
                    Some(amount) => {
                        span class="ingredient-name" { (PreEscaped(&self.name)) }
                        span class="dotfill" {}
                        span class="ingredient-amount" { (PreEscaped(amount)) }
                    }
                    None => {
                        (PreEscaped(&self.name))
                    }
                }
            }
        }
    }
}

/// Parse one ingredient line. A trailing `\\` is dropped; a line with exactly
/// one `\dotfill` becomes a name/amount pair, anything else keeps the whole
/// line as its name.
pub fn parse_ingredient_line(line: &str) -> IngredientLine {
    let line = line.trim();
    let line = line.strip_suffix(LINE_BREAK).unwrap_or(line).trim();
    let parts: Vec<&str> = line.split(DOTFILL).collect();
    match parts.as_slice() {
        [name, amount] => IngredientLine {
            name: name.trim().to_string(),
            amount: Some(amount.trim().to_string()),
        },
        _ => IngredientLine {
            name: line.to_string(),
            amount: None,
        },
    }
}

/// The grid container holding a sequence of ingredient items.
pub fn render_ingredient_grid(items: &[IngredientLine]) -> String {
    html! {
        div class="ingredients-columns" {
            @for item in items {
                (item.render())
            }
        }
    }
    .into_string()
}

/// Pass 5: `multicols` blocks.
pub fn convert_columns(body: &str) -> String {
    MULTICOLS_RE
        .replace_all(body, |caps: &regex::Captures| convert_column_block(&caps[1]))
        .into_owned()
}

fn convert_column_block(content: &str) -> String {
    if has_block_html(content) {
        let cleaned = BLOCK_RESIDUE_RES
            .iter()
            .fold(content.to_string(), |acc, re| re.replace_all(&acc, "").into_owned());
        return format!(
            "<div class=\"ingredients-columns\">\n{}\n</div>",
            cleaned.trim()
        );
    }

    let items: Vec<IngredientLine> = content
        .replace(r"\columnbreak", "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('%'))
        .map(parse_ingredient_line)
        .collect();
    render_ingredient_grid(&items)
}

fn has_block_html(content: &str) -> bool {
    ["<h3>", "<h4>", "<ul>", "<ol>", "<li>"]
        .iter()
        .any(|tag| content.contains(tag))
}

fn is_leader_dot_line(line: &str) -> bool {
    line.contains(DOTFILL) && line.contains(LINE_BREAK)
}

/// Pass 6: leader-dot lines directly under an "Ingredients" heading.
pub fn convert_loose_ingredients(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(heading) = INGREDIENTS_HEADING_RE.find(rest) {
        out.push_str(&rest[..heading.end()]);
        let after = &rest[heading.end()..];
        let region_len = REGION_END_RE.find(after).map_or(after.len(), |m| m.start());
        out.push_str(&rewrite_region(&after[..region_len]));
        rest = &after[region_len..];
    }
    out.push_str(rest);
    out
}

/// Replace the first contiguous run of leader-dot lines in a region with a
/// grid. Text before and after the run keeps its position.
fn rewrite_region(region: &str) -> String {
    if !region.contains(DOTFILL) {
        return region.to_string();
    }

    let mut before: Vec<&str> = Vec::new();
    let mut items: Vec<IngredientLine> = Vec::new();
    let mut after: Vec<&str> = Vec::new();

    let mut lines = region.split('\n');
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if is_leader_dot_line(trimmed) {
            items.push(parse_ingredient_line(trimmed));
        } else if items.is_empty() {
            before.push(line);
        } else if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        } else {
            after.push(line);
            break;
        }
    }
    after.extend(lines);

    if items.is_empty() {
        return region.to_string();
    }
    format!(
        "{}\n{}\n{}",
        before.join("\n").trim_end(),
        render_ingredient_grid(&items),
        after.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_html(name: &str, amount: &str) -> String {
        format!(
            r#"<div class="ingredient-item"><span class="ingredient-name">{name}</span><span class="dotfill"></span><span class="ingredient-amount">{amount}</span></div>"#
        )
    }

    // =========================================================================
    // Line parsing
    // =========================================================================

    #[test]
    fn leader_dots_line_splits_name_and_amount() {
        assert_eq!(
            parse_ingredient_line(r"Flour \dotfill 2 cups\\"),
            IngredientLine {
                name: "Flour".into(),
                amount: Some("2 cups".into()),
            }
        );
    }

    #[test]
    fn line_without_dots_is_name_only() {
        assert_eq!(
            parse_ingredient_line(r"Salt to taste\\"),
            IngredientLine {
                name: "Salt to taste".into(),
                amount: None,
            }
        );
    }

    #[test]
    fn line_with_two_dotfills_is_not_split() {
        let line = parse_ingredient_line(r"A \dotfill B \dotfill C");
        assert_eq!(line.amount, None);
        assert_eq!(line.name, r"A \dotfill B \dotfill C");
    }

    // =========================================================================
    // Column blocks
    // =========================================================================

    #[test]
    fn column_block_flattens_both_columns() {
        let out = convert_columns(
            "\\begin{multicols}{2}\nFlour \\dotfill 2 cups\\\\\n\\columnbreak\nSugar \\dotfill 1 cup\\\\\n\\end{multicols}",
        );
        assert_eq!(
            out,
            format!(
                r#"<div class="ingredients-columns">{}{}</div>"#,
                item_html("Flour", "2 cups"),
                item_html("Sugar", "1 cup")
            )
        );
    }

    #[test]
    fn starred_multicols_and_plain_lines() {
        let out =
            convert_columns("\\begin{multicols*}{3}\nPinch of salt\n\n% note\n\\end{multicols*}");
        assert_eq!(
            out,
            r#"<div class="ingredients-columns"><div class="ingredient-item">Pinch of salt</div></div>"#
        );
    }

    #[test]
    fn column_block_with_html_is_wrapped_and_cleaned() {
        let out = convert_columns(
            "\\begin{multicols}{2}\n\\setlength{\\columnsep}{20pt}\n<h4>Dry</h4>\n<ul>\n    <li>Flour</li>\n</ul>\n\\columnbreak\n{\\small}\n\\end{multicols}",
        );
        assert!(out.starts_with("<div class=\"ingredients-columns\">\n<h4>Dry</h4>"), "{out}");
        assert!(out.ends_with("</ul>\n</div>"), "{out}");
        assert!(!out.contains("setlength"));
        assert!(!out.contains("columnbreak"));
    }

    // =========================================================================
    // Loose ingredient lists
    // =========================================================================

    #[test]
    fn loose_list_after_heading_becomes_grid() {
        let out = convert_loose_ingredients(
            "<h3>Ingredients</h3>\nEggs \\dotfill 6\\\\\nPaprika \\dotfill a pinch\\\\\n\n<h3>Instructions</h3>\nBoil.",
        );
        assert_eq!(
            out,
            format!(
                "<h3>Ingredients</h3>\n<div class=\"ingredients-columns\">{}{}</div>\n<h3>Instructions</h3>\nBoil.",
                item_html("Eggs", "6"),
                item_html("Paprika", "a pinch")
            )
        );
    }

    #[test]
    fn loose_list_stops_at_prose() {
        let out = convert_loose_ingredients(
            "<h4>Ingredients</h4>\nOil \\dotfill 1 tbsp\\\\\nThen season it.\nMore \\dotfill 2\\\\",
        );
        assert!(out.contains(&item_html("Oil", "1 tbsp")));
        assert!(out.contains("</div>\nThen season it.\nMore \\dotfill 2\\\\"));
    }

    #[test]
    fn heading_other_than_ingredients_untouched() {
        let body = "<h3>Method</h3>\nStir \\dotfill 5 min\\\\";
        assert_eq!(convert_loose_ingredients(body), body);
    }

    #[test]
    fn region_already_in_columns_untouched() {
        let body = "<h3>Ingredients</h3>\n<div class=\"ingredients-columns\"></div>";
        assert_eq!(convert_loose_ingredients(body), body);
    }

    #[test]
    fn dotfill_without_line_break_is_not_an_ingredient_line() {
        let body = "<h3>Ingredients</h3>\nSee \\dotfill below";
        assert_eq!(convert_loose_ingredients(body), body);
    }
}
