//! # pdf-ocr-batch
//!
//! OCR multi-page PDF documents with a vision OCR model (DeepSeek-OCR by
//! default) served by a local `ollama` daemon.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Validate  path, size cap, %PDF magic, page count, page range
//!  ├─ 2. Render    one page at a time via pdfium (at most one image alive)
//!  ├─ 3. OCR       `ollama run <model> "<page.png>\n<prompt>"`, awaited
//!  ├─ 4. Record    text or failure marker, in page order
//!  └─ 5. Output    header + one section per page, written atomically
//! ```
//!
//! Pages are processed strictly one after another. A page that fails to
//! render or OCR is marked `*OCR failed*` and the batch continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_ocr_batch::{convert_to_file, ConversionRequest, PromptKind};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = ConversionRequest::builder("scan.pdf")
//!         .start_page(5)
//!         .end_page(15)
//!         .prompt(PromptKind::Layout)
//!         .output("scan.txt")
//!         .build()?;
//!     let summary = convert_to_file(request).await?;
//!     eprintln!(
//!         "{} pages in {}ms ({} failed)",
//!         summary.pages.len(),
//!         summary.total_duration_ms,
//!         summary.failed_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Prompts
//!
//! | Kind | Instruction |
//! |------|-------------|
//! | `free` | `Free OCR.` |
//! | `layout` | `<\|grounding\|>Given the layout of the image.` |
//! | `markdown` | `<\|grounding\|>Convert the document to markdown.` |
//! | `extract` | `Extract the text in the image.` |
//! | `figure` | `Parse the figure.` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionRequest, ConversionRequestBuilder};
pub use convert::{convert_to_file, resolve_page_range, validate, BatchConverter, ValidatedRequest};
pub use error::{OcrBatchError, OcrFailure};
pub use output::{BatchSummary, PageResult, FAILURE_MARKER};
pub use pipeline::input::SourceDocument;
pub use pipeline::ocr::{OcrEngine, OllamaCli};
pub use pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer, RenderedPage};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::PromptKind;
