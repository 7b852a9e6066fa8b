//! LaTeX master document and PDF compilation.
//!
//! The master document does not copy recipe bodies. It `\input`s the body
//! artifacts the earlier stages wrote, so the build directory is a complete,
//! hand-compilable LaTeX project:
//!
//! ```text
//! _build/
//! ├── book.tex            master document (this module)
//! ├── book.pdf            when build.compile_pdf is set
//! └── bodies/
//!     └── 01-appetizers/
//!         └── bruschetta.tex
//! ```
//!
//! The compiler runs twice so the table of contents picks up page numbers.
//! Auxiliary files are removed afterwards.
//!
//! [`compile_recipes`] uses the same compiler run on the recipe sources
//! themselves, writing `<recipe>.pdf` next to each `.tex` so a single recipe
//! can be printed without building the book.

use crate::assemble::{Book, BookRecipe, BookRenderer, RenderContext, RenderError, Rendered};
use crate::config::StyleConfig;
use crate::events::{BuildEvent, EventSender, emit};
use crate::naming;
use crate::scan::{self, ScanError};
use crate::types::{RecipeError, Stage, StageOutcome};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

pub const MASTER_FILENAME: &str = "book.tex";

/// Packages the master template itself depends on.
pub const REQUIRED_PACKAGES: [&str; 4] = ["fontspec", "geometry", "titlesec", "fancyhdr"];

const COMPILER_PASSES: usize = 2;
const AUX_EXTENSIONS: [&str; 5] = ["aux", "log", "toc", "out", "synctex.gz"];

#[derive(Error, Debug)]
pub enum LatexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("LaTeX compiler '{0}' not found")]
    CompilerNotFound(String),
    #[error("{compiler} failed on pass {pass} ({status})")]
    CompilerFailed {
        compiler: String,
        pass: usize,
        status: String,
    },
}

impl LatexError {
    pub fn kind(&self) -> &'static str {
        match self {
            LatexError::Io(_) => "io",
            LatexError::CompilerNotFound(_) => "compiler-not-found",
            LatexError::CompilerFailed { .. } => "compiler-failed",
        }
    }
}

/// Recipe packages plus everything the template and style options need.
pub fn consolidate_packages(
    recipe_packages: &BTreeSet<String>,
    style: &StyleConfig,
) -> BTreeSet<String> {
    let mut packages = recipe_packages.clone();
    packages.extend(REQUIRED_PACKAGES.iter().map(|p| p.to_string()));
    if style.include_toc {
        packages.insert("tocloft".to_string());
    }
    if style.include_index {
        packages.insert("makeidx".to_string());
    }
    packages
}

/// Escape plain text (config values) for use inside LaTeX arguments.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '\\' => out.push_str(r"\textbackslash{}"),
            c => out.push(c),
        }
    }
    out
}

/// Heading text for a recipe. A `\title{}` from the source is already LaTeX
/// and goes in as written; a title derived from the file name is plain text.
fn recipe_heading(recipe: &BookRecipe) -> String {
    let stem = Path::new(&recipe.path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if recipe.title == naming::recipe_title_from_stem(&stem) {
        escape_latex(&recipe.title)
    } else {
        recipe.title.clone()
    }
}

/// `\input` argument for a body artifact: forward slashes regardless of
/// platform.
fn input_path(body: &Path) -> String {
    body.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// The master document source.
pub fn render_master(book: &Book, ctx: &RenderContext<'_>) -> String {
    let config = ctx.config;
    let style = &config.style;
    let packages = consolidate_packages(ctx.packages, style);

    let mut tex = format!(
        "\\documentclass[{}]{{{}}}\n",
        style.font_size, style.documentclass
    );
    for package in &packages {
        tex.push_str(&format!("\\usepackage{{{package}}}\n"));
    }
    if style.include_index {
        tex.push_str("\\makeindex\n");
    }
    tex.push('\n');

    let mut title = escape_latex(&config.book.title);
    if !config.book.subtitle.is_empty() {
        title.push_str(&format!(
            "\\\\ \\large {}",
            escape_latex(&config.book.subtitle)
        ));
    }
    tex.push_str(&format!("\\title{{{title}}}\n"));
    tex.push_str(&format!(
        "\\author{{{}}}\n",
        escape_latex(&config.authorship.author)
    ));
    tex.push_str(&format!("\\date{{{}}}\n\n", ctx.edition()));

    tex.push_str("\\begin{document}\n\\maketitle\n");
    if style.include_toc {
        tex.push_str("\\tableofcontents\n");
    }
    for section in &book.sections {
        tex.push_str(&format!(
            "\n\\section{{{}}}\n",
            escape_latex(&section.title)
        ));
        for recipe in &section.recipes {
            tex.push_str(&format!("\\subsection{{{}}}\n", recipe_heading(recipe)));
            tex.push_str(&format!("\\input{{{}}}\n", input_path(&recipe.body)));
        }
    }
    if style.include_index {
        tex.push_str("\n\\printindex\n");
    }
    tex.push_str("\\end{document}\n");
    tex
}

/// The [`BookRenderer`] for the LaTeX book.
#[derive(Debug, Clone, Copy)]
pub struct LatexRenderer {
    /// Run the compiler after writing the master document.
    pub compile: bool,
}

impl BookRenderer for LatexRenderer {
    fn stage(&self) -> Stage {
        Stage::Latex
    }

    fn render(&self, book: &Book, ctx: &RenderContext<'_>) -> Result<Rendered, RenderError> {
        fs::create_dir_all(ctx.build_dir).map_err(LatexError::from)?;
        let master = ctx.build_dir.join(MASTER_FILENAME);
        fs::write(&master, render_master(book, ctx)).map_err(LatexError::from)?;
        tracing::debug!(path = %master.display(), "wrote master document");

        let path = if self.compile {
            run_compiler(&ctx.config.build.latex_compiler, ctx.build_dir, MASTER_FILENAME)?
        } else {
            master
        };
        Ok(Rendered {
            path,
            errors: Vec::new(),
        })
    }
}

/// Compile `tex_name` in `dir` and return the path of the PDF it produced.
pub fn run_compiler(compiler: &str, dir: &Path, tex_name: &str) -> Result<PathBuf, LatexError> {
    let tex = dir.join(tex_name);
    for pass in 1..=COMPILER_PASSES {
        tracing::debug!(compiler, pass, tex = tex_name, "running LaTeX compiler");
        let output = Command::new(compiler)
            .arg("-interaction=nonstopmode")
            .arg(tex_name)
            .current_dir(dir)
            .output()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => LatexError::CompilerNotFound(compiler.to_string()),
                _ => LatexError::Io(err),
            })?;
        if !output.status.success() {
            tracing::trace!(
                stdout = %String::from_utf8_lossy(&output.stdout),
                "compiler output"
            );
            return Err(LatexError::CompilerFailed {
                compiler: compiler.to_string(),
                pass,
                status: output.status.to_string(),
            });
        }
    }
    remove_aux_files(&tex)?;
    Ok(tex.with_extension("pdf"))
}

/// Remove the compiler's auxiliary files next to `tex`.
fn remove_aux_files(tex: &Path) -> io::Result<()> {
    for ext in AUX_EXTENSIONS {
        match fs::remove_file(tex.with_extension(ext)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
            _ => {}
        }
    }
    Ok(())
}

// ============================================================================
// Standalone recipe PDFs
// ============================================================================

/// True when `tex` has no PDF next to it or was modified after it.
pub fn needs_compilation(tex: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(tex), modified(&tex.with_extension("pdf"))) {
        (Some(source), Some(pdf)) => source > pdf,
        _ => true,
    }
}

/// What [`compile_recipes`] did.
#[derive(Debug)]
pub struct RecipeCompileReport {
    pub outcome: StageOutcome,
    /// Recipes whose PDF was newer than the source.
    pub up_to_date: Vec<String>,
}

/// Compile every recipe under `root` to a PDF beside its source.
///
/// Recipes whose PDF is newer than the source are skipped unless `force` is
/// set. A compiler failure is a per-recipe error; a missing compiler fails
/// every recipe the same way.
pub fn compile_recipes(
    root: &Path,
    compiler: &str,
    force: bool,
    events: &EventSender,
) -> Result<RecipeCompileReport, ScanError> {
    let sections = scan::scan_sections(root)?;
    let recipes = scan::scan_recipes(root, &sections)?;

    let (pending, up_to_date): (Vec<String>, Vec<String>) = recipes
        .into_keys()
        .partition(|path| force || needs_compilation(&root.join(path)));
    for path in &up_to_date {
        emit(
            events,
            BuildEvent::info(Stage::CompileRecipes, "up to date").for_recipe(path),
        );
    }

    let results: Vec<(String, Result<PathBuf, LatexError>)> = pending
        .into_par_iter()
        .map(|path| {
            let result = compile_one(root, &path, compiler);
            (path, result)
        })
        .collect();

    let mut outcome = StageOutcome::new(Stage::CompileRecipes);
    for (path, result) in results {
        match result {
            Ok(pdf) => {
                emit(
                    events,
                    BuildEvent::info(Stage::CompileRecipes, format!("wrote {}", pdf.display()))
                        .for_recipe(&path),
                );
                outcome.record_success();
            }
            Err(err) => {
                emit(
                    events,
                    BuildEvent::error(Stage::CompileRecipes, err.to_string()).for_recipe(&path),
                );
                outcome.record_error(RecipeError::new(
                    Stage::CompileRecipes,
                    path,
                    err.kind(),
                    err.to_string(),
                ));
            }
        }
    }
    Ok(RecipeCompileReport {
        outcome,
        up_to_date,
    })
}

fn compile_one(root: &Path, recipe_path: &str, compiler: &str) -> Result<PathBuf, LatexError> {
    let tex = root.join(recipe_path);
    let dir = tex.parent().unwrap_or(root);
    let name = tex
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    run_compiler(compiler, dir, &name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{BookRecipe, BookSection};
    use crate::config::BookConfig;
    use chrono::{TimeZone, Utc};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn sample_book() -> Book {
        Book {
            sections: vec![
                BookSection {
                    id: "01-appetizers".into(),
                    title: "Appetizers".into(),
                    recipes: vec![BookRecipe {
                        path: "01-appetizers/bruschetta.tex".into(),
                        title: "Tomato Bruschetta".into(),
                        body: PathBuf::from("bodies/01-appetizers/bruschetta.tex"),
                    }],
                },
                BookSection {
                    id: "soups_&_stews".into(),
                    title: "Soups & Stews".into(),
                    recipes: vec![BookRecipe {
                        path: "soups_&_stews/minestrone.tex".into(),
                        title: "Minestrone".into(),
                        body: PathBuf::from("bodies/soups_&_stews/minestrone.tex"),
                    }],
                },
            ],
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

    // =========================================================================
    // Packages and escaping
    // =========================================================================

    #[test]
    fn consolidation_adds_required_and_style_packages() {
        let recipe: BTreeSet<String> = ["xcolor".to_string()].into_iter().collect();
        let mut style = StyleConfig::default();
        style.include_index = true;

        let packages = consolidate_packages(&recipe, &style);
        let expected = [
            "xcolor", "fontspec", "geometry", "titlesec", "fancyhdr", "tocloft", "makeidx",
        ];
        for expected in expected {
            assert!(packages.contains(expected), "missing {expected}");
        }

        style.include_toc = false;
        style.include_index = false;
        let packages = consolidate_packages(&recipe, &style);
        assert!(!packages.contains("tocloft"));
        assert!(!packages.contains("makeidx"));
        assert_eq!(packages.len(), 5);
    }

    #[test]
    fn escape_latex_specials() {
        assert_eq!(escape_latex("Salt & Pepper 100%"), r"Salt \& Pepper 100\%");
        assert_eq!(escape_latex("a_b~c"), r"a\_b\textasciitilde{}c");
    }

    // =========================================================================
    // Master document
    // =========================================================================

    #[test]
    fn master_document_structure() {
        let dir = TempDir::new().unwrap();
        let mut config = BookConfig::default();
        config.book.subtitle = "Recipes & Stories".into();
        config.authorship.author = "The Kitchen".into();
        let packages: BTreeSet<String> = ["xcolor".to_string()].into_iter().collect();

        let tex = render_master(&sample_book(), &context(&config, dir.path(), &packages));
        assert!(tex.starts_with("\\documentclass[11pt]{book}\n"));
        assert!(tex.contains("\\usepackage{xcolor}\n"));
        assert!(tex.contains("\\usepackage{tocloft}\n"));
        assert!(tex.contains(r"\title{Family Cookbook\\ \large Recipes \& Stories}"));
        assert!(tex.contains(r"\author{The Kitchen}"));
        assert!(tex.contains(r"\date{2024 Edition - March}"));
        assert!(tex.contains("\\tableofcontents\n"));
        assert!(tex.contains("\\section{Soups \\& Stews}\n"));
        assert!(tex.contains(
            "\\subsection{Tomato Bruschetta}\n\\input{bodies/01-appetizers/bruschetta.tex}\n"
        ));
        assert!(tex.find("Appetizers").unwrap() < tex.find("Soups").unwrap());
        assert!(tex.ends_with("\\end{document}\n"));
        assert!(!tex.contains("printindex"));
    }

    #[test]
    fn index_enabled_adds_makeindex_and_printindex() {
        let dir = TempDir::new().unwrap();
        let mut config = BookConfig::default();
        config.style.include_index = true;
        config.style.include_toc = false;
        let packages = BTreeSet::new();

        let tex = render_master(&sample_book(), &context(&config, dir.path(), &packages));
        assert!(tex.contains("\\makeindex\n"));
        assert!(tex.contains("\\printindex\n"));
        assert!(!tex.contains("tableofcontents"));
    }

    // =========================================================================
    // Renderer and compiler
    // =========================================================================

    #[test]
    fn render_without_compile_writes_master() {
        let dir = TempDir::new().unwrap();
        let config = BookConfig::default();
        let packages = BTreeSet::new();
        let rendered = LatexRenderer { compile: false }
            .render(&sample_book(), &context(&config, dir.path(), &packages))
            .unwrap();
        assert_eq!(rendered.path, dir.path().join("book.tex"));
        assert!(rendered.path.exists());
        assert!(rendered.errors.is_empty());
    }

    #[test]
    fn missing_compiler_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MASTER_FILENAME), "").unwrap();
        let err = run_compiler("definitely-not-a-latex-compiler", dir.path(), MASTER_FILENAME)
            .unwrap_err();
        assert_eq!(err.kind(), "compiler-not-found");
    }

    #[cfg(unix)]
    #[test]
    fn failing_compiler_stops_on_first_pass() {
        let dir = TempDir::new().unwrap();
        let err = run_compiler("false", dir.path(), MASTER_FILENAME).unwrap_err();
        assert!(matches!(err, LatexError::CompilerFailed { pass: 1, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn successful_compile_removes_aux_files() {
        let dir = TempDir::new().unwrap();
        for ext in ["aux", "log", "toc"] {
            fs::write(dir.path().join(format!("book.{ext}")), "").unwrap();
        }
        let pdf = run_compiler("true", dir.path(), MASTER_FILENAME).unwrap();
        assert_eq!(pdf, dir.path().join("book.pdf"));
        for ext in AUX_EXTENSIONS {
            assert!(!dir.path().join(format!("book.{ext}")).exists());
        }
    }

    #[test]
    fn filename_titles_are_escaped_source_titles_are_not() {
        let dir = TempDir::new().unwrap();
        let config = BookConfig::default();
        let packages = BTreeSet::new();
        let mut book = sample_book();
        book.sections[0].recipes = vec![
            BookRecipe {
                path: "01-appetizers/mac&cheese.tex".into(),
                title: naming::recipe_title_from_stem("mac&cheese"),
                body: PathBuf::from("bodies/01-appetizers/mac&cheese.tex"),
            },
            BookRecipe {
                path: "01-appetizers/bruschetta.tex".into(),
                title: r"Tomato {\em Bruschetta}".into(),
                body: PathBuf::from("bodies/01-appetizers/bruschetta.tex"),
            },
        ];

        let tex = render_master(&book, &context(&config, dir.path(), &packages));
        assert!(tex.contains("\\subsection{Mac\\&cheese}\n"), "{tex}");
        assert!(tex.contains("\\subsection{Tomato {\\em Bruschetta}}\n"));
    }

    // =========================================================================
    // Standalone recipe PDFs
    // =========================================================================

    fn recipe_tree() -> TempDir {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("01-soups")).unwrap();
        fs::create_dir_all(root.path().join("_templates")).unwrap();
        fs::write(root.path().join("01-soups/leek.tex"), "").unwrap();
        fs::write(root.path().join("01-soups/onion.tex"), "").unwrap();
        fs::write(root.path().join("_templates/recipe.tex"), "").unwrap();
        root
    }

    fn set_mtime(path: &Path, offset_secs: u64) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(offset_secs))
            .unwrap();
    }

    #[test]
    fn needs_compilation_compares_against_pdf() {
        let root = recipe_tree();
        let tex = root.path().join("01-soups/leek.tex");
        assert!(needs_compilation(&tex));

        let pdf = tex.with_extension("pdf");
        fs::write(&pdf, "").unwrap();
        set_mtime(&tex, 1_000);
        set_mtime(&pdf, 2_000);
        assert!(!needs_compilation(&tex));

        set_mtime(&tex, 3_000);
        assert!(needs_compilation(&tex));
    }

    #[cfg(unix)]
    #[test]
    fn compile_recipes_skips_up_to_date_unless_forced() {
        let root = recipe_tree();
        let leek = root.path().join("01-soups/leek.tex");
        fs::write(leek.with_extension("pdf"), "").unwrap();
        set_mtime(&leek, 1_000);
        set_mtime(&leek.with_extension("pdf"), 2_000);
        fs::write(root.path().join("01-soups/onion.log"), "").unwrap();

        let report = compile_recipes(root.path(), "true", false, &None).unwrap();
        assert_eq!(report.up_to_date, vec!["01-soups/leek.tex".to_string()]);
        assert_eq!(report.outcome.attempted, 1);
        assert!(report.outcome.is_clean());
        assert!(!root.path().join("01-soups/onion.log").exists());

        let forced = compile_recipes(root.path(), "true", true, &None).unwrap();
        assert!(forced.up_to_date.is_empty());
        assert_eq!(forced.outcome.succeeded, 2);
    }

    #[cfg(unix)]
    #[test]
    fn compile_recipes_records_failures_per_recipe() {
        let root = recipe_tree();
        let report = compile_recipes(root.path(), "false", false, &None).unwrap();
        assert_eq!(report.outcome.attempted, 2);
        assert_eq!(report.outcome.errors.len(), 2);
        assert_eq!(report.outcome.errors[0].recipe, "01-soups/leek.tex");
        assert_eq!(report.outcome.errors[0].kind, "compiler-failed");
        assert_eq!(report.outcome.errors[0].stage, Stage::CompileRecipes);
    }
}
