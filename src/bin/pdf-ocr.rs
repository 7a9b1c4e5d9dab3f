//! CLI binary for pdf-ocr-batch.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ConversionRequest`, runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_ocr_batch::{
    BatchConverter, BatchSummary, ConversionProgressCallback, ConversionRequest, ProgressCallback,
    PromptKind,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status when the run was interrupted after partial results were saved.
const EXIT_INTERRUPTED: i32 = 130;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Shorten `s` to at most `max` characters, marking the cut with an ellipsis.
fn truncate_chars(s: &str, max: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() > max {
        let head: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{head}\u{2026}")
    } else {
        flat
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar pinned to the bottom of the
/// terminal plus one log line per finished page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Print the first characters of each page's text.
    preview: bool,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize, preview: bool) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("OCR");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            preview,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, selected_pages: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {selected_pages} page(s)…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _last_page: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, last_page: usize, text: &str, elapsed: Duration) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            last_page,
            dim(&format!("{:>5} chars", text.chars().count())),
            dim(&format!("{:.1}s", elapsed.as_secs_f64())),
        ));
        if self.preview && !text.trim().is_empty() {
            self.bar
                .println(format!("      {}", dim(&truncate_chars(text.trim(), 100))));
        }
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, last_page: usize, error: &str, elapsed: Duration) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            last_page,
            red(&truncate_chars(error, 80)),
            dim(&format!("{:.1}s", elapsed.as_secs_f64())),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, attempted_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {} page(s) recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} page(s) recognised  ({} failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                attempted_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic usage - process entire PDF into output.txt
  pdf-ocr document.pdf

  # Process first 10 pages only
  pdf-ocr document.pdf -o output.txt --end-page 10

  # Process pages 5-15 with layout preservation
  pdf-ocr document.pdf --start-page 5 --end-page 15 --prompt layout

  # High quality with markdown output
  pdf-ocr document.pdf --dpi 400 --prompt markdown -v

  # Process with delay between pages (to avoid overloading the daemon)
  pdf-ocr large.pdf --delay 5 --end-page 20

PROMPTS:
  free      Free OCR.
  layout    <|grounding|>Given the layout of the image.
  markdown  <|grounding|>Convert the document to markdown.
  extract   Extract the text in the image.
  figure    Parse the figure.

ENVIRONMENT VARIABLES:
  PDF_OCR_MODEL           Model passed to `ollama run` (default: deepseek-ocr)
  OLLAMA_BIN              OCR program to invoke (default: ollama)
  PDFIUM_LIB_PATH         Path to the pdfium shared library
  RUST_LOG                Override the log filter (e.g. pdf_ocr_batch=debug)

EXIT STATUS:
  0    every selected page was attempted (individual page failures included)
  1    invalid arguments, unreadable PDF, or output file could not be written
  130  interrupted; pages finished so far were saved
"#;

/// OCR multi-page PDFs with DeepSeek-OCR via ollama.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-ocr",
    version,
    about = "OCR multi-page PDFs with DeepSeek-OCR via ollama",
    long_about = "Rasterise each page of a PDF and send it to an OCR model served by a local \
ollama daemon, one page at a time. Recognised text is collected into a single text file \
with one section per page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF file to process.
    pdf: PathBuf,

    /// Output text file.
    #[arg(short, long, env = "PDF_OCR_OUTPUT", default_value = "output.txt")]
    output: PathBuf,

    /// Resolution for PDF to image conversion (72–1200).
    #[arg(long, env = "PDF_OCR_DPI", default_value_t = 300)]
    dpi: u32,

    /// Delay in seconds between processing pages.
    #[arg(long, env = "PDF_OCR_DELAY", default_value_t = 0)]
    delay: u64,

    /// First page to process, 1-indexed.
    #[arg(long, env = "PDF_OCR_START_PAGE", default_value_t = 1)]
    start_page: usize,

    /// Last page to process, inclusive (default: last page).
    #[arg(long, env = "PDF_OCR_END_PAGE")]
    end_page: Option<usize>,

    /// OCR prompt type.
    #[arg(long, env = "PDF_OCR_PROMPT", value_enum, default_value = "free")]
    prompt: PromptKind,

    /// Model name passed to `ollama run`.
    #[arg(long, env = "PDF_OCR_MODEL", default_value = ConversionRequest::DEFAULT_MODEL)]
    model: String,

    /// Refuse page ranges longer than this.
    #[arg(long, env = "PDF_OCR_MAX_PAGES", default_value_t = ConversionRequest::DEFAULT_MAX_PAGES)]
    max_pages: usize,

    /// Refuse PDFs larger than this many MiB.
    #[arg(long, env = "PDF_OCR_MAX_FILE_SIZE", default_value_t = 512)]
    max_file_size: u64,

    /// Longest edge of a rendered page in pixels.
    #[arg(long, env = "PDF_OCR_MAX_PIXELS", default_value_t = 10_000)]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_OCR_PASSWORD")]
    password: Option<String>,

    /// OCR program, invoked as `<program> run <model> <instruction>`.
    #[arg(long, env = "OLLAMA_BIN", default_value = ConversionRequest::DEFAULT_PROGRAM)]
    ollama_bin: PathBuf,

    /// Per-page OCR timeout in seconds (default: wait indefinitely).
    #[arg(long, env = "PDF_OCR_TIMEOUT")]
    timeout: Option<u64>,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "PDF_OCR_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable verbose output (DEBUG logs, text previews).
    #[arg(short, long, env = "PDF_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries per-page feedback; keep library logs quiet
    // while it is active unless --verbose asks for everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build and validate the request ───────────────────────────────────
    let request = build_request(&cli).context("Invalid arguments")?;
    info!("Input:  {}", request.document.display());
    info!("Output: {}", request.output.display());
    info!("DPI:    {}", request.dpi);
    info!("Model:  {}", request.model);
    info!("Prompt: {} -> '{}'", request.prompt, request.prompt.template());

    let converter = BatchConverter::for_request(&request).context("Failed to load PDF engine")?;
    let job = converter
        .validate(request)
        .context("Cannot process this PDF")?;

    let (first, last) = job.page_range();
    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  pages {}-{} of {}",
            cyan("◆"),
            bold(&job.request().document_name()),
            first,
            last,
            job.total_pages()
        );
    }

    let converter = if show_progress {
        let cb = CliProgressCallback::new(last + 1 - first, cli.verbose);
        converter.with_progress(cb as ProgressCallback)
    } else {
        converter
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = match converter.run_batch(&job, shutdown_signal()).await {
        Ok(summary) => summary,
        Err(e) => {
            // Don't throw away recognised pages because the output path is bad.
            if let Some(text) = e.unsaved_output() {
                eprintln!(
                    "{} Could not save results; writing them to stdout instead",
                    red("✘")
                );
                print!("{text}");
                io::stdout().flush().ok();
            }
            return Err(anyhow::Error::new(e).context("OCR batch failed"));
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary);
    }

    if summary.interrupted {
        io::stdout().flush().ok();
        std::process::exit(EXIT_INTERRUPTED);
    }

    Ok(())
}

/// Map CLI args to a `ConversionRequest`.
fn build_request(cli: &Cli) -> Result<ConversionRequest> {
    let max_file_size = cli
        .max_file_size
        .checked_mul(1024 * 1024)
        .context("--max-file-size is too large")?;

    let mut builder = ConversionRequest::builder(&cli.pdf)
        .output(&cli.output)
        .dpi(cli.dpi)
        .delay(Duration::from_secs(cli.delay))
        .start_page(cli.start_page)
        .end_page_opt(cli.end_page)
        .prompt(cli.prompt)
        .model(cli.model.clone())
        .max_pages(cli.max_pages)
        .max_file_size(max_file_size)
        .max_rendered_pixels(cli.max_pixels)
        .ocr_program(&cli.ollama_bin)
        .ocr_timeout(cli.timeout.map(Duration::from_secs));

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }

    Ok(builder.build()?)
}

fn print_summary(summary: &BatchSummary) {
    let total_secs = summary.total_duration_ms as f64 / 1000.0;
    let avg_secs = summary.average_page_ms() as f64 / 1000.0;

    if summary.interrupted {
        eprintln!(
            "\n{} Interrupted after {} of {} page(s) in {:.1}s",
            cyan("⚠"),
            summary.pages.len(),
            summary.selected_pages(),
            total_secs
        );
    } else {
        eprintln!(
            "\n{} Processed {} page(s) in {:.1}s",
            if summary.failed_pages == 0 { green("✔") } else { cyan("⚠") },
            summary.pages.len(),
            total_secs
        );
    }
    eprintln!("   Average: {avg_secs:.1}s per page");
    if summary.failed_pages > 0 {
        eprintln!(
            "   {} page(s) failed: {}",
            red(&summary.failed_pages.to_string()),
            summary
                .pages
                .iter()
                .filter(|p| !p.is_success())
                .map(|p| p.page_num.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    eprintln!(
        "   Output saved to: {}",
        bold(&summary.output_path.display().to_string())
    );
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, saving pages finished so far...");
        },
        _ = terminate => {
            warn!("Received SIGTERM, saving pages finished so far...");
        },
    }
}
