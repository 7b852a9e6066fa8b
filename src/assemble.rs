//! Book assembly.
//!
//! Groups the ready recipes of the store into ordered sections and hands the
//! result to renderers. Assembly itself formats nothing; the HTML export and
//! the LaTeX book both implement [`BookRenderer`] and receive the same
//! [`Book`].
//!
//! ## Ordering
//!
//! - Sections: numbered (`NN-name`) ascending by number, then unnumbered
//!   sections alphabetically (see [`naming::compare_sections`]).
//! - Recipes within a section: case-insensitive title, source path as the
//!   tie-break.
//!
//! ```text
//! 10-desserts/   2-mains/   appendix/       →   Mains, Desserts, Appendix
//! ```
//!
//! A recipe is ready once it is preprocessed and its body artifact exists.
//! Recipes that are not ready are listed in [`Assembly::skipped`] and left out
//! of the book.

use crate::config::BookConfig;
use crate::export::ExportError;
use crate::latex::LatexError;
use crate::naming;
use crate::store::BuildStore;
use crate::types::{RecipeError, Stage};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssembleError {
    #[error("the build store holds no recipes; run a scan first")]
    NoRecipes,
    #[error("none of the {0} recipes is ready (preprocessed with a body artifact)")]
    NothingReady(usize),
}

impl AssembleError {
    pub fn kind(&self) -> &'static str {
        match self {
            AssembleError::NoRecipes => "no-recipes",
            AssembleError::NothingReady(_) => "nothing-ready",
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("HTML export failed: {0}")]
    Export(#[from] ExportError),
    #[error("LaTeX rendering failed: {0}")]
    Latex(#[from] LatexError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecipe {
    /// Source path (store key).
    pub path: String,
    pub title: String,
    /// Body artifact, relative to the build directory.
    pub body: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSection {
    /// Directory name, e.g. `02-main-dishes`.
    pub id: String,
    pub title: String,
    pub recipes: Vec<BookRecipe>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    pub sections: Vec<BookSection>,
}

impl Book {
    pub fn recipe_count(&self) -> usize {
        self.sections.iter().map(|s| s.recipes.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub book: Book,
    /// Paths of recipes left out because they were not ready.
    pub skipped: Vec<String>,
}

/// Group and order the ready recipes of `store`.
pub fn assemble(store: &BuildStore, build_dir: &Path) -> Result<Assembly, AssembleError> {
    if store.recipes.is_empty() {
        return Err(AssembleError::NoRecipes);
    }

    let mut grouped: BTreeMap<&str, Vec<BookRecipe>> = BTreeMap::new();
    let mut skipped = Vec::new();
    for (path, record) in &store.recipes {
        match (&record.extracted_body, record.is_ready(build_dir)) {
            (Some(body), true) => grouped
                .entry(record.section.as_str())
                .or_default()
                .push(BookRecipe {
                    path: path.clone(),
                    title: record.title.clone(),
                    body: body.clone(),
                }),
            _ => skipped.push(path.clone()),
        }
    }
    if grouped.is_empty() {
        return Err(AssembleError::NothingReady(store.recipes.len()));
    }

    let mut sections: Vec<BookSection> = grouped
        .into_iter()
        .map(|(id, mut recipes)| {
            recipes.sort_by(|a, b| {
                a.title
                    .to_lowercase()
                    .cmp(&b.title.to_lowercase())
                    .then_with(|| a.path.cmp(&b.path))
            });
            BookSection {
                id: id.to_string(),
                title: store
                    .sections
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| naming::section_title(id)),
                recipes,
            }
        })
        .collect();
    sections.sort_by(|a, b| naming::compare_sections(&a.id, &b.id));

    tracing::debug!(
        sections = sections.len(),
        skipped = skipped.len(),
        "assembled book"
    );
    Ok(Assembly {
        book: Book { sections },
        skipped,
    })
}

/// Everything a renderer needs besides the book itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub config: &'a BookConfig,
    pub build_dir: &'a Path,
    pub last_build: Option<DateTime<Utc>>,
    /// Package list for the LaTeX preamble.
    pub packages: &'a BTreeSet<String>,
}

impl RenderContext<'_> {
    /// Edition line for title blocks, e.g. `2024 Edition - March`. Falls back
    /// to the current date when the store has never been scanned.
    pub fn edition(&self) -> String {
        self.last_build
            .unwrap_or_else(Utc::now)
            .format("%Y Edition - %B")
            .to_string()
    }
}

/// A written output and the per-recipe problems met while producing it.
#[derive(Debug)]
pub struct Rendered {
    pub path: PathBuf,
    pub errors: Vec<RecipeError>,
}

/// An output format for the assembled book.
pub trait BookRenderer {
    fn stage(&self) -> Stage;
    fn render(&self, book: &Book, ctx: &RenderContext<'_>) -> Result<Rendered, RenderError>;
}
