use clap::{Parser, Subcommand};
use recipe_book::events::EventSender;
use recipe_book::pipeline::{self, BuildOptions, Workspace};
use recipe_book::types::RecipeError;
use recipe_book::{config, latex, output};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "recipe-book")]
#[command(about = "Incremental builder for a LaTeX recipe book")]
#[command(long_about = "\
Incremental builder for a LaTeX recipe book

Every recipe is its own LaTeX document. Top-level directories are sections,
ordered by numeric prefix; the .tex files inside them are recipes. Only recipes
whose files changed since the last run are extracted and preprocessed again.

Content structure:

  cookbook/
  ├── book.toml                    # Book config (optional)
  ├── 01-appetizers/               # Section \"Appetizers\" (numbered = ordered first)
  │   ├── bruschetta.tex           # Recipe; \\title{...} overrides the filename title
  │   └── deviled_eggs.tex         # Recipe \"Deviled Eggs\"
  ├── 02-main-dishes/
  │   └── roast_chicken.tex
  ├── appendix/                    # Unnumbered sections come last, alphabetically
  │   └── conversions.tex
  └── _templates/                  # Leading _ or . = ignored

Build output (default _build/ inside the content root):

  _build/
  ├── metadata.json                # Incremental build state
  ├── bodies/                      # Extracted, preprocessed recipe bodies
  ├── book.tex                     # Master document (\\input's the bodies)
  ├── book.pdf                     # When compile_pdf is enabled
  └── html/book.html               # Self-contained web export

'recipe-book compile-recipes' writes a standalone PDF next to each recipe.

Run 'recipe-book gen-config' to generate a documented book.toml.")]
#[command(version)]
struct Cli {
    /// Content directory (holds book.toml and the section directories)
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Build directory, overriding build.output_dir from book.toml
    #[arg(long, global = true)]
    build_dir: Option<PathBuf>,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan sections and recipes, detecting changes since the last run
    Scan,
    /// Extract bodies of changed recipes into the build directory
    Extract,
    /// Run the preprocessing passes over extracted bodies
    Preprocess,
    /// Write the single-file HTML export
    ExportHtml,
    /// Write the LaTeX master document and compile it
    Render {
        /// Write book.tex only, without running the compiler
        #[arg(long)]
        no_pdf: bool,
    },
    /// Run the full pipeline: scan → extract → preprocess → export-html → render
    Build {
        /// Write book.tex only, without running the compiler
        #[arg(long)]
        no_pdf: bool,
        /// Skip the HTML export
        #[arg(long)]
        no_html: bool,
    },
    /// Scan and extract in memory, reporting failures without writing anything
    Check,
    /// Compile each recipe to a standalone PDF next to its source
    CompileRecipes {
        /// Recompile even when the PDF is newer than the source
        #[arg(long)]
        force: bool,
    },
    /// Print a stock book.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let open = || -> Result<Workspace, pipeline::BuildError> {
        let ws = Workspace::open(&cli.source, cli.build_dir.as_deref())?;
        init_thread_pool(&ws.config.processing);
        Ok(ws)
    };

    let errors = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Vec::new()
        }
        Command::Scan => {
            let ws = open()?;
            let mut store = ws.load_store();
            let summary = with_printer(|events| pipeline::run_scan(&ws, &mut store, events))?;
            output::print_scan_output(&summary, &store);
            Vec::new()
        }
        Command::Extract => {
            let ws = open()?;
            let mut store = ws.load_store();
            let outcome = with_printer(|events| pipeline::run_extract(&ws, &mut store, events))?;
            output::print_outcome(&outcome);
            outcome.errors
        }
        Command::Preprocess => {
            let ws = open()?;
            let mut store = ws.load_store();
            let outcome =
                with_printer(|events| pipeline::run_preprocess(&ws, &mut store, events))?;
            output::print_outcome(&outcome);
            outcome.errors
        }
        Command::ExportHtml => {
            let ws = open()?;
            let store = ws.load_store();
            let report = with_printer(|events| pipeline::run_export(&ws, &store, events))?;
            output::print_render_output(
                report.stage,
                &report.book,
                &report.rendered,
                &report.skipped,
            );
            report.rendered.errors
        }
        Command::Render { no_pdf } => {
            let ws = open()?;
            let mut store = ws.load_store();
            let compile = !no_pdf && ws.config.build.compile_pdf;
            let report =
                with_printer(|events| pipeline::run_latex(&ws, &mut store, compile, events))?;
            output::print_render_output(
                report.stage,
                &report.book,
                &report.rendered,
                &report.skipped,
            );
            report.rendered.errors
        }
        Command::Build { no_pdf, no_html } => {
            let ws = open()?;
            println!("==> Building {}", ws.source.display());
            let options = BuildOptions {
                html: !no_html,
                pdf: !no_pdf,
            };
            let report = with_printer(|events| pipeline::build(&ws, options, events))?;
            for outcome in &report.outcomes {
                output::print_outcome(outcome);
            }
            for render in &report.renders {
                output::print_render_output(
                    render.stage,
                    &render.book,
                    &render.rendered,
                    &render.skipped,
                );
            }
            println!("==> Build complete: {}", ws.build_dir.display());
            report.errors()
        }
        Command::Check => {
            let ws = open()?;
            println!("==> Checking {}", ws.source.display());
            let report = pipeline::check(&ws)?;
            output::print_scan_output(&report.scan, &report.store);
            output::print_outcome(&report.extract);
            if report.extract.is_clean() {
                println!("==> All recipes extract cleanly");
            }
            report.extract.errors
        }
        Command::CompileRecipes { force } => {
            let ws = open()?;
            let compiler = &ws.config.build.latex_compiler;
            let report = with_printer(|events| {
                latex::compile_recipes(&ws.source, compiler, force, events)
            })?;
            output::print_compile_recipes_output(&report);
            report.outcome.errors
        }
    };

    Ok(finish(&errors))
}

/// Run `stage` with progress events printed as they arrive.
fn with_printer<T>(stage: impl FnOnce(&EventSender) -> T) -> T {
    let (tx, rx) = mpsc::channel();
    let printer = thread::spawn(move || {
        for event in rx {
            println!("{}", output::format_event(&event));
        }
    });
    let events: EventSender = Some(tx);
    let result = stage(&events);
    drop(events);
    printer.join().ok();
    result
}

fn finish(errors: &[RecipeError]) -> ExitCode {
    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        output::print_error_table(errors);
        ExitCode::FAILURE
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
