//! Single-file HTML export.
//!
//! Renders the assembled book as one self-contained HTML document: the
//! stylesheet is embedded, every recipe body is converted with
//! [`crate::convert`], and nothing else needs to ship alongside the file.
//!
//! ## Output Structure
//!
//! ```text
//! _build/
//! └── html/
//!     └── book.html
//! ```
//!
//! ## Document Layout
//!
//! ```text
//! header.book-header      title, subtitle, author, "2024 Edition - March"
//! nav.toc                 sections and recipes (when style.include_toc)
//! main
//!   section#01-appetizers one per book section, id from the directory
//!     article#01-appetizers-bruschetta
//!                         one per recipe, id from the file stem
//! ```
//!
//! Ids are unique within the document. An id that would come out empty falls
//! back to `section-N` / `recipe-N`, and a repeated one gets a `-2`, `-3`
//! suffix.
//!
//! Conversion runs in parallel; output order follows the book. A body that
//! cannot be read becomes a visible error paragraph in place of the recipe,
//! and is reported as a per-recipe error.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) like the rest of the crate. Titles
//! and config strings are escaped; converted bodies are inserted as-is.

use crate::assemble::{Book, BookRecipe, BookRenderer, RenderContext, RenderError, Rendered};
use crate::convert;
use crate::types::{RecipeError, Stage};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the export inside `build.html_output_dir`.
pub const BOOK_HTML: &str = "book.html";

const CSS: &str = include_str!("../static/book.css");

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Io(_) => "io",
        }
    }
}

/// The [`BookRenderer`] for the HTML export.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExporter;

impl BookRenderer for HtmlExporter {
    fn stage(&self) -> Stage {
        Stage::ExportHtml
    }

    fn render(&self, book: &Book, ctx: &RenderContext<'_>) -> Result<Rendered, RenderError> {
        let recipes: Vec<&BookRecipe> = book.sections.iter().flat_map(|s| &s.recipes).collect();
        let converted: Vec<Result<String, ExportError>> = recipes
            .par_iter()
            .map(|recipe| convert_recipe(ctx.build_dir, recipe))
            .collect();

        let mut errors = Vec::new();
        let bodies: Vec<String> = recipes
            .iter()
            .zip(converted)
            .map(|(recipe, result)| match result {
                Ok(html) => html,
                Err(err) => {
                    errors.push(RecipeError::new(
                        Stage::ExportHtml,
                        recipe.path.clone(),
                        err.kind(),
                        err.to_string(),
                    ));
                    error_placeholder(&err.to_string())
                }
            })
            .collect();

        let document = render_document(book, ctx, &bodies);
        let out_dir = ctx.build_dir.join(&ctx.config.build.html_output_dir);
        fs::create_dir_all(&out_dir).map_err(ExportError::from)?;
        let path = out_dir.join(BOOK_HTML);
        fs::write(&path, document.into_string()).map_err(ExportError::from)?;
        tracing::debug!(path = %path.display(), recipes = bodies.len(), "wrote HTML export");

        Ok(Rendered { path, errors })
    }
}

fn convert_recipe(build_dir: &Path, recipe: &BookRecipe) -> Result<String, ExportError> {
    let body = fs::read_to_string(build_dir.join(&recipe.body))?;
    Ok(convert::convert(&body))
}

/// Inline replacement for a recipe that could not be converted.
pub fn error_placeholder(message: &str) -> String {
    html! {
        p.error { "Error converting recipe: " (message) }
    }
    .into_string()
}

/// Lowercase, `-`-separated id safe for fragment links.
///
/// `"Main Dishes"` → `main-dishes`, `"Crème brûlée!"` → `crme-brle`
pub fn url_safe_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            id.push(c);
        } else if (c == '-' || c == '_' || c.is_whitespace()) && !id.ends_with('-') {
            id.push('-');
        }
    }
    id.trim_matches('-').to_string()
}

/// Fragment ids for every section and recipe, in book order.
struct BookIds {
    sections: Vec<String>,
    recipes: Vec<Vec<String>>,
}

impl BookIds {
    fn new(book: &Book) -> Self {
        let mut taken = HashSet::new();
        let mut unique = |base: String| {
            let mut id = base.clone();
            let mut n = 2;
            while !taken.insert(id.clone()) {
                id = format!("{base}-{n}");
                n += 1;
            }
            id
        };

        let mut sections = Vec::with_capacity(book.sections.len());
        let mut recipes = Vec::with_capacity(book.sections.len());
        for (i, section) in book.sections.iter().enumerate() {
            let section_id = unique(non_empty(url_safe_id(&section.id), "section", i + 1));
            let ids = section
                .recipes
                .iter()
                .enumerate()
                .map(|(j, recipe)| {
                    let stem = url_safe_id(recipe_stem(recipe));
                    unique(format!("{section_id}-{}", non_empty(stem, "recipe", j + 1)))
                })
                .collect();
            sections.push(section_id);
            recipes.push(ids);
        }
        Self { sections, recipes }
    }
}

fn non_empty(id: String, prefix: &str, position: usize) -> String {
    if id.is_empty() {
        format!("{prefix}-{position}")
    } else {
        id
    }
}

fn recipe_stem(recipe: &BookRecipe) -> &str {
    let file = recipe.path.rsplit('/').next().unwrap_or(&recipe.path);
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

/// Render the whole document. `bodies` holds one converted body per recipe,
/// in book order.
fn render_document(book: &Book, ctx: &RenderContext<'_>, bodies: &[String]) -> Markup {
    let config = ctx.config;
    let ids = BookIds::new(book);
    let mut bodies = bodies.iter();
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (config.book.title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (title_block(ctx))
                @if config.style.include_toc {
                    (table_of_contents(book, &ids))
                }
                main {
                    @for (i, section) in book.sections.iter().enumerate() {
                        section.book-section id=(ids.sections[i]) {
                            h2.section-title { (section.title) }
                            @for (j, recipe) in section.recipes.iter().enumerate() {
                                article.recipe id=(ids.recipes[i][j]) {
                                    h2.recipe-title { (recipe.title) }
                                    div.recipe-body {
                                        (PreEscaped(
                                            bodies.next().map(String::as_str).unwrap_or_default()
                                        ))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn title_block(ctx: &RenderContext<'_>) -> Markup {
    let config = ctx.config;
    html! {
        header.book-header {
            h1.book-title { (config.book.title) }
            @if !config.book.subtitle.is_empty() {
                p.subtitle { (config.book.subtitle) }
            }
            @if !config.authorship.author.is_empty() {
                p.author { (config.authorship.author) }
            }
            p.edition { (ctx.edition()) }
            @if !config.authorship.copyright.is_empty() {
                p.copyright { "© " (config.authorship.copyright) }
            }
        }
    }
}

fn table_of_contents(book: &Book, ids: &BookIds) -> Markup {
    html! {
        nav.toc {
            h2 { "Contents" }
            ol {
                @for (i, section) in book.sections.iter().enumerate() {
                    li {
                        a href=(format!("#{}", ids.sections[i])) { (section.title) }
                        ol {
                            @for (j, recipe) in section.recipes.iter().enumerate() {
                                li {
                                    a href=(format!("#{}", ids.recipes[i][j])) {
                                        (recipe.title)
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::BookSection;
    use crate::config::BookConfig;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_book() -> Book {
        Book {
            sections: vec![BookSection {
                id: "01-appetizers".into(),
                title: "Appetizers".into(),
                recipes: vec![
                    BookRecipe {
                        path: "01-appetizers/bruschetta.tex".into(),
                        title: "Tomato Bruschetta".into(),
                        body: PathBuf::from("bodies/01-appetizers/bruschetta.tex"),
                    },
                    BookRecipe {
                        path: "01-appetizers/olives.tex".into(),
                        title: "Olives".into(),
                        body: PathBuf::from("bodies/01-appetizers/olives.tex"),
                    },
                ],
            }],
        }
    }

    fn context<'a>(
        config: &'a BookConfig,
        build_dir: &'a Path,
        packages: &'a BTreeSet<String>,
    ) -> RenderContext<'a> {
        RenderContext {
            config,
            build_dir,
            last_build: Some(Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()),
            packages,
        }
    }

    #[test]
    fn url_safe_id_normalizes() {
        assert_eq!(url_safe_id("Main Dishes"), "main-dishes");
        assert_eq!(url_safe_id("  Soups_&  Stews -- "), "soups-stews");
        assert_eq!(url_safe_id("Crème brûlée!"), "crme-brle");
    }

    #[test]
    fn ids_are_unique_and_never_empty() {
        let recipe = |path: &str, title: &str| BookRecipe {
            path: path.into(),
            title: title.into(),
            body: PathBuf::from("bodies/x.tex"),
        };
        let book = Book {
            sections: vec![
                BookSection {
                    id: "01-desserts".into(),
                    title: "Desserts".into(),
                    recipes: vec![
                        recipe("01-desserts/tart.tex", "Tart"),
                        recipe("01-desserts/tart_v2.tex", "Tart"),
                    ],
                },
                BookSection {
                    id: "desserts".into(),
                    title: "Desserts".into(),
                    recipes: vec![recipe("desserts/crème.tex", "Crème")],
                },
                BookSection {
                    id: "ÉÉ".into(),
                    title: "ÉÉ".into(),
                    recipes: vec![recipe("ÉÉ/ü.tex", "Ü")],
                },
            ],
        };

        let ids = BookIds::new(&book);
        assert_eq!(ids.sections, vec!["01-desserts", "desserts", "section-3"]);
        assert_eq!(ids.recipes[0], vec!["01-desserts-tart", "01-desserts-tart-v2"]);
        assert_eq!(ids.recipes[1], vec!["desserts-crme"]);
        assert_eq!(ids.recipes[2], vec!["section-3-recipe-1"]);
    }

    #[test]
    fn colliding_ids_get_a_suffix() {
        let book = Book {
            sections: vec![
                BookSection {
                    id: "main dishes".into(),
                    title: "Main".into(),
                    recipes: Vec::new(),
                },
                BookSection {
                    id: "main_dishes".into(),
                    title: "Main".into(),
                    recipes: Vec::new(),
                },
            ],
        };
        assert_eq!(BookIds::new(&book).sections, vec!["main-dishes", "main-dishes-2"]);
    }

    #[test]
    fn error_placeholder_escapes_message() {
        assert_eq!(
            error_placeholder("bad <path>"),
            r#"<p class="error">Error converting recipe: bad &lt;path&gt;</p>"#
        );
    }

    #[test]
    fn render_writes_document_with_converted_bodies() {
        let build = TempDir::new().unwrap();
        let bodies = build.path().join("bodies/01-appetizers");
        fs::create_dir_all(&bodies).unwrap();
        fs::write(bodies.join("bruschetta.tex"), r"\section*{Method}Toast \textbf{well}.").unwrap();
        fs::write(bodies.join("olives.tex"), "Marinate overnight.").unwrap();

        let config = BookConfig::default();
        let packages = BTreeSet::new();
        let rendered = HtmlExporter
            .render(&sample_book(), &context(&config, build.path(), &packages))
            .unwrap();

        assert_eq!(rendered.path, build.path().join("html/book.html"));
        assert!(rendered.errors.is_empty());
        let html = fs::read_to_string(&rendered.path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h3>Method</h3>Toast <strong>well</strong>."));
        assert!(html.contains(r#"<section class="book-section" id="01-appetizers">"#));
        assert!(html.contains(r#"id="01-appetizers-bruschetta""#));
        assert!(html.contains(r##"href="#01-appetizers-olives""##));
        assert!(html.contains("2024 Edition - March"));
        assert!(html.find("Tomato Bruschetta").unwrap() < html.find("Marinate").unwrap());
    }

    #[test]
    fn unreadable_body_becomes_placeholder_and_error() {
        let build = TempDir::new().unwrap();
        let bodies = build.path().join("bodies/01-appetizers");
        fs::create_dir_all(&bodies).unwrap();
        fs::write(bodies.join("olives.tex"), "Marinate overnight.").unwrap();

        let config = BookConfig::default();
        let packages = BTreeSet::new();
        let rendered = HtmlExporter
            .render(&sample_book(), &context(&config, build.path(), &packages))
            .unwrap();

        assert_eq!(rendered.errors.len(), 1);
        assert_eq!(rendered.errors[0].recipe, "01-appetizers/bruschetta.tex");
        assert_eq!(rendered.errors[0].stage, Stage::ExportHtml);
        let html = fs::read_to_string(&rendered.path).unwrap();
        assert!(html.contains(r#"<p class="error">Error converting recipe: "#));
        assert!(html.contains("Marinate overnight."));
    }

    #[test]
    fn toc_omitted_when_disabled() {
        let build = TempDir::new().unwrap();
        let mut config = BookConfig::default();
        config.style.include_toc = false;
        let packages = BTreeSet::new();
        let ctx = context(&config, build.path(), &packages);
        let html = render_document(&sample_book(), &ctx, &[String::new(), String::new()])
            .into_string();
        assert!(!html.contains(r#"class="toc""#));
        assert!(html.contains("<h1 class=\"book-title\">Family Cookbook</h1>"));
    }
}
