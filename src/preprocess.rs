//! Body normalization passes.
//!
//! Stage 3 of the build. Extracted bodies still carry commands that only make
//! sense in a standalone recipe document, and whatever whitespace the author
//! left behind. A [`Preprocessor`] runs an ordered list of [`Pass`]es over each
//! body and rewrites the artifact in place.
//!
//! Every pass is total and idempotent, so running the stage twice on the same
//! artifact is harmless. The stock pipeline:
//!
//! | Order | Pass                       | Effect                                                |
//! |-------|----------------------------|-------------------------------------------------------|
//! | 1     | `strip-layout-commands`    | drop `\maketitle` / `\thispagestyle{..}` lines        |
//! | 2     | `trim-trailing-whitespace` | strip trailing whitespace on every line               |
//! | 3     | `collapse-blank-lines`     | at most one blank line in a row, none at either end   |

use crate::events::{BuildEvent, EventSender, emit};
use crate::store::BuildStore;
use crate::types::{RecipeError, Stage, StageOutcome};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("body artifact missing: {0}")]
    MissingArtifact(String),
}

impl PreprocessError {
    pub fn kind(&self) -> &'static str {
        match self {
            PreprocessError::Io(_) => "io",
            PreprocessError::MissingArtifact(_) => "missing-artifact",
        }
    }
}

/// One rewrite of a body. Must be total and idempotent.
pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, body: &str) -> String;
}

/// Removes lines the master document re-injects itself.
pub struct StripLayoutCommands;

impl Pass for StripLayoutCommands {
    fn name(&self) -> &'static str {
        "strip-layout-commands"
    }

    fn apply(&self, body: &str) -> String {
        join_lines(
            body.lines()
                .filter(|line| !line.contains(r"\maketitle") && !line.contains(r"\thispagestyle{")),
        )
    }
}

pub struct TrimTrailingWhitespace;

impl Pass for TrimTrailingWhitespace {
    fn name(&self) -> &'static str {
        "trim-trailing-whitespace"
    }

    fn apply(&self, body: &str) -> String {
        join_lines(body.lines().map(str::trim_end))
    }
}

pub struct CollapseBlankLines;

impl Pass for CollapseBlankLines {
    fn name(&self) -> &'static str {
        "collapse-blank-lines"
    }

    fn apply(&self, body: &str) -> String {
        let mut out: Vec<&str> = Vec::new();
        for line in body.lines() {
            let blank = line.trim().is_empty();
            if blank && out.last().is_none_or(|prev| prev.trim().is_empty()) {
                continue;
            }
            out.push(if blank { "" } else { line });
        }
        while out.last().is_some_and(|l| l.is_empty()) {
            out.pop();
        }
        join_lines(out.into_iter())
    }
}

fn join_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}

/// An ordered list of passes.
pub struct Preprocessor {
    passes: Vec<Box<dyn Pass>>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StripLayoutCommands),
            Box::new(TrimTrailingWhitespace),
            Box::new(CollapseBlankLines),
        ])
    }
}

impl Preprocessor {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }

    /// Names of the configured passes, in order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn process(&self, body: &str) -> String {
        self.passes.iter().fold(body.to_string(), |text, pass| {
            let next = pass.apply(&text);
            tracing::trace!(pass = pass.name(), before = text.len(), after = next.len());
            next
        })
    }
}

/// Run the preprocessor over every record that is not yet preprocessed.
///
/// Records without a body reference are skipped: extraction already reported
/// them. So are records still marked `changed`, whose body reference points at
/// an artifact from an earlier successful extraction. A missing artifact or an
/// I/O failure is a per-recipe error and leaves `preprocessed` false.
pub fn process_all(
    store: &mut BuildStore,
    build_dir: &Path,
    preprocessor: &Preprocessor,
    events: &EventSender,
) -> StageOutcome {
    let mut outcome = StageOutcome::new(Stage::Preprocess);

    for (path, record) in store.recipes.iter_mut() {
        if record.preprocessed || record.changed {
            continue;
        }
        let Some(artifact) = record.body_path(build_dir) else {
            continue;
        };

        match process_artifact(&artifact, preprocessor) {
            Ok(()) => {
                record.preprocessed = true;
                emit(events, BuildEvent::info(Stage::Preprocess, "preprocessed").for_recipe(path));
                outcome.record_success();
            }
            Err(err) => {
                emit(
                    events,
                    BuildEvent::error(Stage::Preprocess, err.to_string()).for_recipe(path),
                );
                outcome.record_error(RecipeError::new(
                    Stage::Preprocess,
                    path.clone(),
                    err.kind(),
                    err.to_string(),
                ));
            }
        }
    }
    outcome
}

fn process_artifact(artifact: &Path, preprocessor: &Preprocessor) -> Result<(), PreprocessError> {
    if !artifact.is_file() {
        return Err(PreprocessError::MissingArtifact(artifact.display().to_string()));
    }
    let body = fs::read_to_string(artifact)?;
    fs::write(artifact, preprocessor.process(&body))?;
    Ok(())
}
