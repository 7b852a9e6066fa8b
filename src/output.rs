//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Recipes and sections are shown by their display titles first, with source
//! paths as indented `Source:` context lines, so the scan output reads as a
//! table of contents of the book.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Sections
//! 001 Appetizers (2 recipes)
//!     Source: 01-appetizers/
//!     001 Deviled Eggs [changed]
//!         Source: 01-appetizers/deviled_eggs.tex
//!
//! Scanned 5 recipes in 4 sections, 1 changed
//! ```
//!
//! ## Stage outcomes
//!
//! ```text
//! extract: 4 of 5 succeeded, 1 error
//! preprocess: nothing to do
//! ```
//!
//! ## Renders
//!
//! ```text
//! Appetizers
//!     001 Deviled Eggs
//! export-html → _build/html/book.html (5 recipes)
//! ```
//!
//! ## Standalone recipe PDFs
//!
//! ```text
//! compile-recipes: 2 of 3 succeeded, 1 error
//! compile-recipes: 4 up to date
//! ```
//!
//! Per-recipe errors are collected into one table at the end of a run.
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::assemble::{Book, Rendered};
use crate::events::{BuildEvent, Level};
use crate::latex::RecipeCompileReport;
use crate::scan::ScanSummary;
use crate::store::{BuildStore, format_timestamp};
use crate::types::{RecipeError, Stage, StageOutcome};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::collections::BTreeMap;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Events
// ============================================================================

/// One console line for a progress event.
///
/// ```text
/// extract  01-appetizers/bruschetta.tex: extracted
/// warning: scan  01-old/soup.tex: source removed; its body artifact is orphaned
/// ```
pub fn format_event(event: &BuildEvent) -> String {
    let prefix = match event.level {
        Level::Info => "",
        Level::Warn => "warning: ",
        Level::Error => "error: ",
    };
    match &event.recipe {
        Some(recipe) => format!("{prefix}{}  {recipe}: {}", event.stage, event.message),
        None => format!("{prefix}{}  {}", event.stage, event.message),
    }
}

// ============================================================================
// Stage 1: Scan output
// ============================================================================

/// Format the scan result as a section/recipe inventory.
pub fn format_scan_output(summary: &ScanSummary, store: &BuildStore) -> Vec<String> {
    let mut by_section: BTreeMap<&str, Vec<(&str, &str, bool)>> = BTreeMap::new();
    for (path, record) in &store.recipes {
        by_section
            .entry(record.section.as_str())
            .or_default()
            .push((record.title.as_str(), path.as_str(), record.changed));
    }
    let mut sections: Vec<&str> = store.sections.keys().map(String::as_str).collect();
    sections.sort_by(|a, b| crate::naming::compare_sections(a, b));

    let mut lines = vec!["Sections".to_string()];
    for (i, id) in sections.iter().enumerate() {
        let title = store.sections.get(*id).map_or(*id, String::as_str);
        let recipes = by_section.get(id).map(Vec::as_slice).unwrap_or_default();
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            title,
            plural(recipes.len(), "recipe")
        ));
        lines.push(format!("{}Source: {}/", indent(1), id));
        for (j, (title, path, changed)) in recipes.iter().enumerate() {
            let marker = if *changed { " [changed]" } else { "" };
            lines.push(format!("{}{} {}{}", indent(1), format_index(j + 1), title, marker));
            lines.push(format!("{}Source: {}", indent(2), path));
        }
    }

    if !summary.removed.is_empty() {
        lines.push(String::new());
        lines.push("Removed".to_string());
        for path in &summary.removed {
            lines.push(format!("{}{}", indent(1), path));
        }
    }

    lines.push(String::new());
    let mut total = format!(
        "Scanned {} in {}, {} changed",
        plural(summary.recipes, "recipe"),
        plural(summary.sections, "section"),
        summary.changed.len()
    );
    if let Some(at) = &store.last_build {
        total.push_str(&format!(" at {}", format_timestamp(at)));
    }
    lines.push(total);
    lines
}

pub fn print_scan_output(summary: &ScanSummary, store: &BuildStore) {
    for line in format_scan_output(summary, store) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage outcomes (extract, preprocess)
// ============================================================================

pub fn format_outcome(outcome: &StageOutcome) -> String {
    if outcome.attempted == 0 {
        return format!("{}: nothing to do", outcome.stage);
    }
    let mut line = format!(
        "{}: {} of {} succeeded",
        outcome.stage, outcome.succeeded, outcome.attempted
    );
    if !outcome.errors.is_empty() {
        line.push_str(&format!(", {}", plural(outcome.errors.len(), "error")));
    }
    line
}

pub fn print_outcome(outcome: &StageOutcome) {
    println!("{}", format_outcome(outcome));
}

// ============================================================================
// Renders (export-html, latex)
// ============================================================================

/// Book contents followed by the output path of the render.
pub fn format_render_output(
    stage: Stage,
    book: &Book,
    rendered: &Rendered,
    skipped: &[String],
) -> Vec<String> {
    let mut lines = Vec::new();
    for section in &book.sections {
        lines.push(section.title.clone());
        for (i, recipe) in section.recipes.iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(i + 1), recipe.title));
        }
    }
    for path in skipped {
        lines.push(format!("skipped (not ready): {path}"));
    }
    lines.push(format!(
        "{} \u{2192} {} ({})",
        stage,
        rendered.path.display(),
        plural(book.recipe_count(), "recipe")
    ));
    lines
}

pub fn print_render_output(stage: Stage, book: &Book, rendered: &Rendered, skipped: &[String]) {
    for line in format_render_output(stage, book, rendered, skipped) {
        println!("{}", line);
    }
}

pub fn format_compile_recipes_output(report: &RecipeCompileReport) -> Vec<String> {
    let mut lines = vec![format_outcome(&report.outcome)];
    if !report.up_to_date.is_empty() {
        lines.push(format!(
            "{}: {} up to date",
            report.outcome.stage,
            report.up_to_date.len()
        ));
    }
    lines
}

pub fn print_compile_recipes_output(report: &RecipeCompileReport) {
    for line in format_compile_recipes_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Per-recipe errors as a table, one row per error.
pub fn format_error_table(errors: &[RecipeError]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Stage", "Recipe", "Kind", "Message"]);
    for error in errors {
        table.add_row(vec![
            error.stage.to_string(),
            error.recipe.clone(),
            error.kind.clone(),
            error.message.clone(),
        ]);
    }
    table.to_string()
}

pub fn print_error_table(errors: &[RecipeError]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("{}", plural(errors.len(), "recipe error"));
    eprintln!("{}", format_error_table(errors));
}

// ============================================================================
// Tests
// ============================================================================
