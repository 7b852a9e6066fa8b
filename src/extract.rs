//! Body extraction from recipe sources.
//!
//! Stage 2 of the build. Each recipe is a standalone LaTeX document so it can
//! be compiled on its own while being written. The book only needs what sits
//! between `\begin{document}` and `\end{document}`, plus the packages the
//! preamble declares and the `\title{...}` if there is one.
//!
//! ```text
//! \documentclass{article}
//! \usepackage[utf8]{inputenc}      → packages: {inputenc}
//! \usepackage{xcolor, nicefrac}    → packages: {xcolor, nicefrac}
//! \title{Tomato Bruschetta}        → title: "Tomato Bruschetta"
//! \begin{document}
//! ...                              → body (verbatim, trimmed)
//! \end{document}
//! ```
//!
//! The scan is line-oriented: recipes follow a one-declaration-per-line
//! convention, and nothing here tries to parse LaTeX properly.
//!
//! Bodies are written to `<build_dir>/bodies/<section>/<file>`, with spaces
//! and characters that are unsafe in file names replaced by `_`. That relative
//! path is what the store records.

use crate::events::{BuildEvent, EventSender, emit};
use crate::store::BuildStore;
use crate::types::{RecipeError, Stage, StageOutcome};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory for body artifacts, relative to the build directory.
pub const BODIES_DIR: &str = "bodies";

const BEGIN_DOCUMENT: &str = r"\begin{document}";
const END_DOCUMENT: &str = r"\end{document}";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no content between \\begin{{document}} and \\end{{document}}")]
    NoBody,
}

impl ExtractError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Io(_) => "io",
            ExtractError::NoBody => "no-body",
        }
    }
}

/// Everything extraction pulls out of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub body: String,
    pub packages: BTreeSet<String>,
    pub title: Option<String>,
}

/// Split a recipe source into body, packages, and title.
pub fn extract_content(source: &str) -> Result<Extracted, ExtractError> {
    let mut packages = BTreeSet::new();
    let mut title = None;
    let mut body = String::new();
    let mut in_document = false;

    for line in source.lines() {
        if line.contains(r"\usepackage") {
            packages.extend(parse_packages(line));
        }
        if title.is_none()
            && let Some(t) = parse_title(line)
        {
            title = Some(t);
        }

        if line.contains(BEGIN_DOCUMENT) {
            in_document = true;
            continue;
        }
        if line.contains(END_DOCUMENT) {
            in_document = false;
            continue;
        }
        if in_document {
            body.push_str(line);
            body.push('\n');
        }
    }

    let body = body.trim();
    if body.is_empty() {
        return Err(ExtractError::NoBody);
    }
    Ok(Extracted {
        body: body.to_string(),
        packages,
        title,
    })
}

/// Package names from the first `{...}` group of a `\usepackage` line.
/// Options in `[...]` are skipped; a line without braces yields nothing.
fn parse_packages(line: &str) -> Vec<String> {
    let Some(start) = line.find('{') else {
        return Vec::new();
    };
    let Some(len) = line[start + 1..].find('}') else {
        return Vec::new();
    };
    line[start + 1..start + 1 + len]
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Title from `\title{...}`, honoring nested braces.
fn parse_title(line: &str) -> Option<String> {
    let start = line.find(r"\title{")? + r"\title{".len();
    let mut depth = 1usize;
    for (i, c) in line[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let title = line[start..start + i].trim();
                    return (!title.is_empty()).then(|| title.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Artifact path for a recipe, relative to the build directory.
///
/// `"01-main dishes/pot roast.tex"` → `bodies/01-main_dishes/pot_roast.tex`
pub fn body_artifact_path(recipe_path: &str) -> PathBuf {
    let mut path = PathBuf::from(BODIES_DIR);
    for component in recipe_path.split('/').filter(|c| !c.is_empty()) {
        path.push(sanitize_component(component));
    }
    path
}

fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            ' ' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\\' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Read and extract one recipe without touching the store or the build dir.
pub fn extract_recipe(source_root: &Path, recipe_path: &str) -> Result<Extracted, ExtractError> {
    let source = fs::read_to_string(source_root.join(recipe_path))?;
    extract_content(&source)
}

/// Paths that need extraction: changed records, records without a body
/// reference, and records whose artifact has gone missing.
pub fn extraction_candidates(store: &BuildStore, build_dir: &Path) -> Vec<String> {
    store
        .recipes
        .iter()
        .filter(|(_, r)| r.changed || !r.has_body(build_dir))
        .map(|(path, _)| path.clone())
        .collect()
}

/// Extract every candidate recipe and record the results in the store.
///
/// Sources are read and parsed in parallel. Artifact writes and store updates
/// happen afterwards on the calling thread. A failing recipe is recorded in
/// the outcome and the rest of the batch continues. Its record keeps any
/// earlier body reference but stays `changed` and loses its mtime, so it is
/// neither preprocessed nor assembled until an extraction succeeds.
pub fn extract_all(
    store: &mut BuildStore,
    source_root: &Path,
    build_dir: &Path,
    events: &EventSender,
) -> StageOutcome {
    let mut outcome = StageOutcome::new(Stage::Extract);
    let candidates = extraction_candidates(store, build_dir);
    tracing::debug!(candidates = candidates.len(), "extracting");

    let results: Vec<(String, Result<Extracted, ExtractError>)> = candidates
        .into_par_iter()
        .map(|path| {
            let result = extract_recipe(source_root, &path);
            (path, result)
        })
        .collect();

    for (path, result) in results {
        match result.and_then(|extracted| write_artifact(build_dir, &path, extracted)) {
            Ok((artifact, extracted)) => {
                if let Some(record) = store.recipes.get_mut(&path) {
                    record.extracted_body = Some(artifact);
                    record.packages = extracted.packages;
                    record.preprocessed = false;
                    record.changed = false;
                    if let Some(title) = extracted.title {
                        record.title = title;
                    }
                }
                emit(events, BuildEvent::info(Stage::Extract, "extracted").for_recipe(&path));
                outcome.record_success();
            }
            Err(err) => {
                // Forget the mtime so the next scan retries this recipe.
                if let Some(record) = store.recipes.get_mut(&path) {
                    record.mtime = None;
                    record.preprocessed = false;
                }
                emit(
                    events,
                    BuildEvent::error(Stage::Extract, err.to_string()).for_recipe(&path),
                );
                outcome.record_error(RecipeError::new(
                    Stage::Extract,
                    path,
                    err.kind(),
                    err.to_string(),
                ));
            }
        }
    }
    store.packages = store.recipe_packages();
    outcome
}

fn write_artifact(
    build_dir: &Path,
    recipe_path: &str,
    extracted: Extracted,
) -> Result<(PathBuf, Extracted), ExtractError> {
    let artifact = body_artifact_path(recipe_path);
    let full = build_dir.join(&artifact);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&full, &extracted.body)?;
    Ok((artifact, extracted))
}
