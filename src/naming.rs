//! Centralized name parsing for the `NN-name` convention.
//!
//! Section directories and recipe files share one naming pattern: an optional
//! numeric prefix (`NN-` or `NN_`) followed by a name. The prefix only controls
//! ordering; it never appears in anything the reader sees.
//!
//! ## Display Titles
//!
//! Dashes and underscores in the name portion become spaces and every word is
//! capitalized:
//! - `01-main-dishes/` → "Main Dishes" (section title)
//! - `desserts/` → "Desserts" (section title)
//! - `chocolate_cake.tex` → "Chocolate Cake" (recipe title before extraction)

use std::cmp::Ordering;

/// Result of parsing an entry name like `02-main-dishes`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Number prefix if present (e.g., `2` from `02-main-dishes`)
    pub number: Option<u32>,
    /// Raw name part after the prefix, separators preserved. Empty if number-only.
    /// For unnumbered entries, this is the full input.
    pub name: String,
    /// Display title: separators converted to spaces, words capitalized.
    pub display_title: String,
}

/// Parse an entry name following the `NN-name` convention.
///
/// - `"02-main-dishes"` → number=Some(2), name="main-dishes", display_title="Main Dishes"
/// - `"10_desserts"` → number=Some(10), name="desserts", display_title="Desserts"
/// - `"001"` → number=Some(1), name="", display_title=""
/// - `"appendix"` → number=None, name="appendix", display_title="Appendix"
/// - `"side-dishes"` → number=None, name="side-dishes", display_title="Side Dishes"
pub fn parse_entry_name(name: &str) -> ParsedName {
    if let Some(sep_pos) = name.find(['-', '_']) {
        let prefix = &name[..sep_pos];
        if let Ok(num) = prefix.parse::<u32>() {
            let raw = &name[sep_pos + 1..];
            return ParsedName {
                number: Some(num),
                name: raw.to_string(),
                display_title: title_case(raw),
            };
        }
    }
    if let Ok(num) = name.parse::<u32>() {
        return ParsedName {
            number: Some(num),
            name: String::new(),
            display_title: String::new(),
        };
    }
    ParsedName {
        number: None,
        name: name.to_string(),
        display_title: title_case(name),
    }
}

/// Display title for a section directory name.
pub fn section_title(dir_name: &str) -> String {
    let parsed = parse_entry_name(dir_name);
    if parsed.display_title.is_empty() {
        dir_name.to_string()
    } else {
        parsed.display_title
    }
}

/// Fallback recipe title derived from a file stem.
///
/// Recipe files are not ordered by prefix, so the whole stem is the title:
/// `chocolate_cake` → "Chocolate Cake".
pub fn recipe_title_from_stem(stem: &str) -> String {
    title_case(stem)
}

/// Order two section identifiers.
///
/// Numbered sections sort numerically ascending and come before all
/// unnumbered ones; unnumbered sections sort alphabetically. Ties on the
/// number fall back to the full identifier so the order is total.
pub fn compare_sections(a: &str, b: &str) -> Ordering {
    let pa = parse_entry_name(a);
    let pb = parse_entry_name(b);
    match (pa.number, pb.number) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)),
    }
}

/// Replace `-`/`_` with spaces and capitalize each word, lowercasing the rest.
fn title_case(raw: &str) -> String {
    raw.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
