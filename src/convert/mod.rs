//! LaTeX subset → HTML conversion.
//!
//! Recipes use a small, conventional slice of LaTeX. This module turns a
//! preprocessed body into an HTML fragment with an ordered list of rewrite
//! passes. It is a pattern transducer rather than a parser: each pass targets
//! a handful of commands and leaves everything it does not know as literal
//! text.
//!
//! ## Passes
//!
//! | Order | Pass            | Handles                                                        |
//! |-------|-----------------|----------------------------------------------------------------|
//! | 1     | `layout`        | comments, spacing commands, `\newpage` → page-break div        |
//! | 2     | `headings`      | `\section{}` → `<h3>`, `\subsection{}` → `<h4>`                |
//! | 3     | `environments`  | `enumerate`/`itemize` (innermost first), `em`, `quote`         |
//! | 4     | `inline`        | `\textbf`, `\textit`, `\emph`, `\underline` to a fixed point   |
//! | 5     | `columns`       | `multicols` → ingredient grid or wrapped block                 |
//! | 6     | `loose-ingredients` | leader-dot lines after an "Ingredients" heading            |
//! | 7     | `substitutions` | fractions, quotes, dashes, escapes, line breaks                |
//! | 8     | `cleanup`       | residue removal, known bad nestings, blank-line collapse       |
//!
//! The order matters. Lists are converted before column blocks so a list
//! inside `multicols` is already HTML when the block is sniffed, and list
//! items get their inline formatting before the global inline pass runs.
//! Ingredient grids are built before `\dotfill` is substituted, because the
//! leader dots are what splits a line into name and amount.
//!
//! ```text
//! \section*{Ingredients}                 <h3>Ingredients</h3>
//! \begin{multicols}{2}                   <div class="ingredients-columns">
//! Flour \dotfill 2 cups\\         →        <div class="ingredient-item">
//! \columnbreak                               <span class="ingredient-name">Flour</span>
//! Sugar \dotfill 1 cup\\                     <span class="dotfill"></span>
//! \end{multicols}                            <span class="ingredient-amount">2 cups</span>
//!                                          </div> ...
//! ```
//!
//! Conversion never fails. Output for unknown input degrades to literal text.

mod cleanup;
mod ingredients;
mod inline;
mod layout;
mod lists;
mod substitutions;

pub use ingredients::{IngredientLine, parse_ingredient_line, render_ingredient_grid};
pub use inline::convert_inline;

/// One named conversion pass.
pub struct ConvertPass {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// The conversion pipeline, in execution order.
pub const PASSES: [ConvertPass; 8] = [
    ConvertPass {
        name: "layout",
        apply: layout::strip_layout,
    },
    ConvertPass {
        name: "headings",
        apply: layout::convert_headings,
    },
    ConvertPass {
        name: "environments",
        apply: lists::convert_environments,
    },
    ConvertPass {
        name: "inline",
        apply: inline::convert_inline,
    },
    ConvertPass {
        name: "columns",
        apply: ingredients::convert_columns,
    },
    ConvertPass {
        name: "loose-ingredients",
        apply: ingredients::convert_loose_ingredients,
    },
    ConvertPass {
        name: "substitutions",
        apply: substitutions::substitute_literals,
    },
    ConvertPass {
        name: "cleanup",
        apply: cleanup::cleanup,
    },
];

/// Convert a recipe body to an HTML fragment.
pub fn convert(body: &str) -> String {
    PASSES.iter().fold(body.to_string(), |html, pass| {
        let next = (pass.apply)(&html);
        tracing::trace!(pass = pass.name, before = html.len(), after = next.len());
        next
    })
}
