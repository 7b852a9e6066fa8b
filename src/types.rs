//! Shared types used across all pipeline stages.
//!
//! Per-recipe failures never abort a stage. Each stage collects them as
//! [`RecipeError`] values in a [`StageOutcome`], and the pipeline concatenates
//! the outcomes into the final report.

use serde::Serialize;
use std::fmt;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Scan,
    Extract,
    Preprocess,
    Assemble,
    ExportHtml,
    Latex,
    CompileRecipes,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Extract => "extract",
            Stage::Preprocess => "preprocess",
            Stage::Assemble => "assemble",
            Stage::ExportHtml => "export-html",
            Stage::Latex => "latex",
            Stage::CompileRecipes => "compile-recipes",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable failure attached to one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeError {
    pub stage: Stage,
    /// Source path of the recipe (store key).
    pub recipe: String,
    /// Stable name of the error variant, e.g. `"no-body"`.
    pub kind: String,
    pub message: String,
}

impl RecipeError {
    pub fn new(
        stage: Stage,
        recipe: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            recipe: recipe.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.recipe, self.message)
    }
}

/// Result of a per-recipe stage: how many recipes were handled and which failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    /// Recipes the stage attempted.
    pub attempted: usize,
    /// Recipes that completed successfully.
    pub succeeded: usize,
    pub errors: Vec<RecipeError>,
}

impl StageOutcome {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            attempted: 0,
            succeeded: 0,
            errors: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_error(&mut self, error: RecipeError) {
        self.attempted += 1;
        self.errors.push(error);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_counts_successes_and_errors() {
        let mut outcome = StageOutcome::new(Stage::Extract);
        outcome.record_success();
        outcome.record_error(RecipeError::new(
            Stage::Extract,
            "01-a/x.tex",
            "no-body",
            "missing body",
        ));
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 1);
        assert!(!outcome.is_clean());
    }

    #[test]
    fn recipe_error_display_names_stage_and_recipe() {
        let err = RecipeError::new(Stage::Preprocess, "a/b.tex", "io", "gone");
        assert_eq!(err.to_string(), "[preprocess] a/b.tex: gone");
    }

    #[test]
    fn stage_names_are_kebab_case() {
        assert_eq!(Stage::ExportHtml.to_string(), "export-html");
        assert_eq!(
            serde_json::to_string(&Stage::ExportHtml).unwrap(),
            "\"export-html\""
        );
    }
}
