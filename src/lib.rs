//! # Recipe Book
//!
//! An incremental build pipeline for a personal recipe book. Every recipe is a
//! standalone LaTeX document; directories are sections. The pipeline pulls the
//! bodies out of those documents, normalizes them, and assembles one LaTeX book
//! (optionally compiled to PDF) plus a single self-contained HTML export.
//!
//! # Architecture: Staged Pipeline Over a Persistent Store
//!
//! ```text
//! 1. Scan        cookbook/   →  metadata.json    (which recipes changed?)
//! 2. Extract     changed     →  bodies/          (body between document markers)
//! 3. Preprocess  bodies/     →  bodies/          (in-place rewrite passes)
//! 4. Assemble    store       →  Book             (ordered sections and recipes)
//! 5. Render      Book        →  html/book.html, book.tex (→ book.pdf)
//! ```
//!
//! Every stage reads and updates the same [`store::BuildStore`], which is saved
//! after each stage. Only recipes whose modification time changed are extracted
//! and preprocessed again, so rebuilding an unchanged book touches nothing but
//! the final renders.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: discovers sections and recipes, classifies changes against the store |
//! | [`extract`] | Stage 2: body, package list and title out of each changed recipe |
//! | [`preprocess`] | Stage 3: ordered rewrite passes over the extracted bodies |
//! | [`assemble`] | Stage 4: groups and orders ready recipes; the [`assemble::BookRenderer`] seam |
//! | [`convert`] | LaTeX subset → HTML transducer used by the export |
//! | [`export`] | Single-file HTML book rendered with Maud |
//! | [`latex`] | LaTeX master document, compiler invocation, standalone recipe PDFs |
//! | [`pipeline`] | Runs stages in order, saves the store, collects per-recipe errors |
//! | [`store`] | The persisted build store (`metadata.json`) |
//! | [`config`] | `book.toml` loading, stock defaults and validation |
//! | [`naming`] | `NN-name` convention: section ordering and display titles |
//! | [`events`] | Progress events sent from stages to the CLI |
//! | [`output`] | CLI output formatting: inventories, outcomes, error tables |
//! | [`types`] | Shared stage and error types |
//!
//! # Design Decisions
//!
//! ## Per-Recipe Errors Never Abort a Stage
//!
//! A recipe without document markers, a deleted body artifact or an
//! unreadable file is recorded as a [`types::RecipeError`] and the batch goes
//! on. Only failures that make the stage meaningless (no recipes at all, an
//! invalid config, an unwritable store) stop the pipeline.
//!
//! ## Regex Transducer for the HTML Export
//!
//! The converter does not parse LaTeX. Recipes use a small, regular subset
//! (headings, lists, multicols ingredient blocks, a few inline commands), and
//! an ordered list of pattern passes covers it. Unknown commands pass through
//! as literal text.
//!
//! ## Maud for HTML
//!
//! The export and the ingredient grids are generated with
//! [Maud](https://maud.lambda.xyz/). Titles and config strings are escaped by
//! construction; only already-converted recipe bodies are inserted raw.
//!
//! ## NN-Prefix Ordering
//!
//! Section directories use a numeric prefix (`01-`, `10-`) for explicit
//! ordering, parsed by [`naming::parse_entry_name`]. Unnumbered sections
//! follow the numbered ones alphabetically. The filesystem is the source of
//! truth; there is no separate table of contents to maintain.

pub mod assemble;
pub mod config;
pub mod convert;
pub mod events;
pub mod export;
pub mod extract;
pub mod latex;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod scan;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
