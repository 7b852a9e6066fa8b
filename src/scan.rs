//! Section discovery and change detection.
//!
//! Stage 1 of the build. Walks the content root, turns every section directory
//! and recipe file into fresh records, and reconciles them with the records of
//! the previous run so later stages only touch what actually changed.
//!
//! ## Directory Structure
//!
//! ```text
//! cookbook/                        # Content root
//! ├── book.toml                    # Book config (optional)
//! ├── 01-appetizers/               # Section (numbered = ordered first)
//! │   ├── bruschetta.tex           # Recipe
//! │   └── deviled_eggs.tex
//! ├── 02-main-dishes/
//! │   └── roast_chicken.tex
//! ├── appendix/                    # Unnumbered = after numbered sections
//! │   └── conversions.tex
//! ├── _templates/                  # Leading `_` = ignored
//! └── _build/                      # Build output, ignored for the same reason
//! ```
//!
//! Only `.tex` files directly inside a section are recipes. Subdirectories of
//! a section (image folders and the like) are never descended into.
//!
//! ## Change Detection
//!
//! A recipe counts as changed when its observed mtime differs from the stored
//! one in either direction. An older mtime (reverted edit, restored backup,
//! clock skew) is a change too. A stored mtime that could not be parsed never
//! matches.
//!
//! | Previous record | Fresh mtime     | Result                                              |
//! |-----------------|-----------------|-----------------------------------------------------|
//! | absent          | any             | fresh record, `changed`                             |
//! | present         | equal           | previous record carried forward, `changed = false`  |
//! | present         | different       | fresh metadata, `changed`, body ref + packages kept |
//!
//! Records whose source disappeared are dropped from the store. They are
//! listed in [`ScanSummary::removed`] and reported as warnings because their
//! body artifacts stay behind on disk.

use crate::events::{BuildEvent, EventSender, emit};
use crate::naming;
use crate::store::{BuildStore, RecipeRecord};
use crate::types::Stage;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

/// File extension of recipe sources.
pub const RECIPE_EXTENSION: &str = "tex";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("No recipes found in {0}")]
    NoRecipes(String),
}

impl ScanError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Io(_) | ScanError::Walk(_) => "io",
            ScanError::NoRecipes(_) => "no-recipes",
        }
    }
}

/// What a scan found, relative to the previous store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub sections: usize,
    pub recipes: usize,
    /// Paths of new or modified recipes.
    pub changed: Vec<String>,
    /// Paths that were in the store but no longer exist.
    pub removed: Vec<String>,
}

/// Scan the content root and reconcile the result with `store`.
///
/// On success the store's sections and recipes are replaced and `last_build`
/// is set to now. When no recipe is found the store is left untouched.
pub fn scan(
    root: &Path,
    store: &mut BuildStore,
    events: &EventSender,
) -> Result<ScanSummary, ScanError> {
    let sections = scan_sections(root)?;
    let fresh = scan_recipes(root, &sections)?;
    if fresh.is_empty() {
        return Err(ScanError::NoRecipes(root.display().to_string()));
    }

    let removed = removed_paths(&store.recipes, &fresh);
    let recipes = detect_changes(&store.recipes, fresh);
    let changed: Vec<String> = recipes
        .iter()
        .filter(|(_, r)| r.changed)
        .map(|(path, _)| path.clone())
        .collect();

    for path in &removed {
        emit(
            events,
            BuildEvent::warn(Stage::Scan, "source removed; its body artifact is orphaned")
                .for_recipe(path),
        );
    }
    tracing::debug!(
        sections = sections.len(),
        recipes = recipes.len(),
        changed = changed.len(),
        "scan complete"
    );

    let summary = ScanSummary {
        sections: sections.len(),
        recipes: recipes.len(),
        changed,
        removed,
    };
    store.sections = sections;
    store.recipes = recipes;
    store.last_build = Some(Utc::now());
    Ok(summary)
}

/// Discover section directories and their display titles.
///
/// Every top-level directory whose name does not start with `_` or `.` is a
/// section, even when it holds no recipes.
pub fn scan_sections(root: &Path) -> Result<BTreeMap<String, String>, ScanError> {
    let mut sections = BTreeMap::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('_') || name.starts_with('.') {
            continue;
        }
        let title = naming::section_title(&name);
        sections.insert(name, title);
    }
    Ok(sections)
}

/// Build fresh records for every recipe in the given sections.
///
/// Keys are `<section>/<file name>`. Fresh records carry scan metadata only:
/// no body reference, no packages, `changed` unset.
pub fn scan_recipes(
    root: &Path,
    sections: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, RecipeRecord>, ScanError> {
    let mut recipes = BTreeMap::new();
    for section in sections.keys() {
        let walker = WalkDir::new(root.join(section))
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_recipe(entry.path()) {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            let stem = entry
                .path()
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);

            recipes.insert(
                format!("{section}/{file_name}"),
                RecipeRecord {
                    section: section.clone(),
                    title: naming::recipe_title_from_stem(&stem),
                    mtime,
                    ..RecipeRecord::default()
                },
            );
        }
    }
    Ok(recipes)
}

fn is_recipe(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RECIPE_EXTENSION))
}

/// Reconcile fresh scan records with the previous run's records.
///
/// Pure. Paths absent from `fresh` are dropped from the result.
pub fn detect_changes(
    previous: &BTreeMap<String, RecipeRecord>,
    fresh: BTreeMap<String, RecipeRecord>,
) -> BTreeMap<String, RecipeRecord> {
    fresh
        .into_iter()
        .map(|(path, scanned)| {
            let record = match previous.get(&path) {
                Some(prev) if mtime_matches(prev, &scanned) => RecipeRecord {
                    changed: false,
                    ..prev.clone()
                },
                Some(prev) => RecipeRecord {
                    changed: true,
                    preprocessed: false,
                    extracted_body: prev.extracted_body.clone(),
                    packages: prev.packages.clone(),
                    ..scanned
                },
                None => RecipeRecord {
                    changed: true,
                    preprocessed: false,
                    ..scanned
                },
            };
            (path, record)
        })
        .collect()
}

/// Paths in `previous` that the fresh scan no longer contains.
pub fn removed_paths(
    previous: &BTreeMap<String, RecipeRecord>,
    fresh: &BTreeMap<String, RecipeRecord>,
) -> Vec<String> {
    previous
        .keys()
        .filter(|path| !fresh.contains_key(*path))
        .cloned()
        .collect()
}

/// Equal only when both mtimes are known and identical.
fn mtime_matches(previous: &RecipeRecord, fresh: &RecipeRecord) -> bool {
    matches!((previous.mtime, fresh.mtime), (Some(a), Some(b)) if a == b)
}
