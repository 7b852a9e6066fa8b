//! Stage orchestration.
//!
//! Each `run_*` function runs one stage against a loaded [`BuildStore`] and
//! saves the store afterwards, so a run interrupted between stages resumes
//! where it stopped. [`build`] chains them:
//!
//! ```text
//! scan → extract → preprocess → export-html → latex (→ pdf)
//! ```
//!
//! Per-recipe errors accumulate in the [`BuildReport`]; stage-level failures
//! return a [`BuildError`] and stop the chain.

use crate::assemble::{
    self, AssembleError, Book, BookRenderer, RenderContext, RenderError, Rendered,
};
use crate::config::{self, BookConfig, ConfigError};
use crate::events::{BuildEvent, EventSender, emit};
use crate::export::HtmlExporter;
use crate::extract::{self, ExtractError, Extracted};
use crate::latex::{self, LatexRenderer};
use crate::preprocess::{self, Preprocessor};
use crate::scan::{self, ScanError, ScanSummary};
use crate::store::BuildStore;
use crate::types::{RecipeError, Stage, StageOutcome};
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Assembly failed: {0}")]
    Assemble(#[from] AssembleError),
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("Failed to save build store: {0}")]
    Store(#[from] io::Error),
}

/// Source root, build directory and the config that resolved them.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub source: PathBuf,
    pub build_dir: PathBuf,
    pub config: BookConfig,
}

impl Workspace {
    /// Load `book.toml` from `source`. The build directory is `build_dir` when
    /// given, otherwise `build.output_dir` under the source root.
    pub fn open(source: &Path, build_dir: Option<&Path>) -> Result<Self, BuildError> {
        let config = config::load_config(source)?;
        let build_dir = build_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| source.join(&config.build.output_dir));
        Ok(Self {
            source: source.to_path_buf(),
            build_dir,
            config,
        })
    }

    pub fn load_store(&self) -> BuildStore {
        BuildStore::load(&self.build_dir)
    }
}

/// What a render produced and what it left out.
#[derive(Debug)]
pub struct RenderReport {
    pub stage: Stage,
    pub book: Book,
    /// Recipes that were not ready and were left out of the book.
    pub skipped: Vec<String>,
    pub rendered: Rendered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub html: bool,
    /// Compile the PDF when `build.compile_pdf` also allows it.
    pub pdf: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            html: true,
            pdf: true,
        }
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub scan: ScanSummary,
    pub outcomes: Vec<StageOutcome>,
    pub renders: Vec<RenderReport>,
}

impl BuildReport {
    /// Every per-recipe error in stage order.
    pub fn errors(&self) -> Vec<RecipeError> {
        self.outcomes
            .iter()
            .flat_map(|o| o.errors.iter())
            .chain(self.renders.iter().flat_map(|r| r.rendered.errors.iter()))
            .cloned()
            .collect()
    }
}

// ============================================================================
// Single stages
// ============================================================================

pub fn run_scan(
    ws: &Workspace,
    store: &mut BuildStore,
    events: &EventSender,
) -> Result<ScanSummary, BuildError> {
    let summary = scan::scan(&ws.source, store, events)?;
    store.save(&ws.build_dir)?;
    emit(
        events,
        BuildEvent::info(
            Stage::Scan,
            format!("{} recipes, {} changed", summary.recipes, summary.changed.len()),
        ),
    );
    Ok(summary)
}

pub fn run_extract(
    ws: &Workspace,
    store: &mut BuildStore,
    events: &EventSender,
) -> Result<StageOutcome, BuildError> {
    let outcome = extract::extract_all(store, &ws.source, &ws.build_dir, events);
    store.save(&ws.build_dir)?;
    Ok(outcome)
}

pub fn run_preprocess(
    ws: &Workspace,
    store: &mut BuildStore,
    events: &EventSender,
) -> Result<StageOutcome, BuildError> {
    let outcome = preprocess::process_all(store, &ws.build_dir, &Preprocessor::default(), events);
    store.save(&ws.build_dir)?;
    Ok(outcome)
}

pub fn run_export(
    ws: &Workspace,
    store: &BuildStore,
    events: &EventSender,
) -> Result<RenderReport, BuildError> {
    render_with(ws, store, &HtmlExporter, events)
}

/// Write the master document and, when `compile` is set, the PDF. Replaces the
/// store's package list with the consolidated one the document declares, built
/// from the current records so packages of removed recipes drop out.
pub fn run_latex(
    ws: &Workspace,
    store: &mut BuildStore,
    compile: bool,
    events: &EventSender,
) -> Result<RenderReport, BuildError> {
    store.packages = latex::consolidate_packages(&store.recipe_packages(), &ws.config.style);
    store.save(&ws.build_dir)?;
    render_with(ws, store, &LatexRenderer { compile }, events)
}

fn render_with(
    ws: &Workspace,
    store: &BuildStore,
    renderer: &dyn BookRenderer,
    events: &EventSender,
) -> Result<RenderReport, BuildError> {
    let stage = renderer.stage();
    let assembly = assemble::assemble(store, &ws.build_dir)?;
    for path in &assembly.skipped {
        emit(
            events,
            BuildEvent::warn(stage, "not ready; left out of the book").for_recipe(path),
        );
    }

    let ctx = RenderContext {
        config: &ws.config,
        build_dir: &ws.build_dir,
        last_build: store.last_build,
        packages: &store.packages,
    };
    let rendered = renderer.render(&assembly.book, &ctx)?;
    for error in &rendered.errors {
        emit(
            events,
            BuildEvent::error(stage, error.message.clone()).for_recipe(&error.recipe),
        );
    }
    emit(
        events,
        BuildEvent::info(stage, format!("wrote {}", rendered.path.display())),
    );
    Ok(RenderReport {
        stage,
        book: assembly.book,
        skipped: assembly.skipped,
        rendered,
    })
}

// ============================================================================
// Full build and dry run
// ============================================================================

/// Run every stage in order against the store in the build directory.
pub fn build(
    ws: &Workspace,
    options: BuildOptions,
    events: &EventSender,
) -> Result<BuildReport, BuildError> {
    let mut store = ws.load_store();
    let scan = run_scan(ws, &mut store, events)?;
    let outcomes = vec![
        run_extract(ws, &mut store, events)?,
        run_preprocess(ws, &mut store, events)?,
    ];

    let mut renders = Vec::new();
    if options.html {
        renders.push(run_export(ws, &store, events)?);
    }
    let compile = options.pdf && ws.config.build.compile_pdf;
    renders.push(run_latex(ws, &mut store, compile, events)?);

    Ok(BuildReport {
        scan,
        outcomes,
        renders,
    })
}

/// Result of a dry run.
#[derive(Debug)]
pub struct CheckReport {
    pub scan: ScanSummary,
    /// The store as the scan left it in memory.
    pub store: BuildStore,
    pub extract: StageOutcome,
}

/// Scan and extract in memory. Nothing is written; the extract outcome lists
/// the recipes extraction would fail on.
pub fn check(ws: &Workspace) -> Result<CheckReport, BuildError> {
    let mut store = ws.load_store();
    let summary = scan::scan(&ws.source, &mut store, &None)?;

    let results: Vec<(String, Result<Extracted, ExtractError>)> =
        extract::extraction_candidates(&store, &ws.build_dir)
            .into_par_iter()
            .map(|path| {
                let result = extract::extract_recipe(&ws.source, &path);
                (path, result)
            })
            .collect();

    let mut outcome = StageOutcome::new(Stage::Extract);
    for (path, result) in results {
        match result {
            Ok(_) => outcome.record_success(),
            Err(err) => outcome.record_error(RecipeError::new(
                Stage::Extract,
                path,
                err.kind(),
                err.to_string(),
            )),
        }
    }
    Ok(CheckReport {
        scan: summary,
        store,
        extract: outcome,
    })
}
