//! Configuration for a batch OCR run.
//!
//! Every knob lives in one immutable [`ConversionRequest`], built through
//! [`ConversionRequestBuilder`]. The CLI constructs it once from flags and
//! hands it to [`crate::convert::validate`]; nothing reads configuration from
//! ambient state afterwards.
//!
//! `build()` checks every invariant that needs no I/O. Checks that need the
//! file system or the PDF itself (existence, size cap, page count) happen in
//! [`crate::convert::validate`].

use crate::error::OcrBatchError;
use crate::prompts::PromptKind;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lowest accepted rendering resolution.
pub const MIN_DPI: u32 = 72;
/// Highest accepted rendering resolution.
pub const MAX_DPI: u32 = 1200;

/// A fully specified OCR batch request.
///
/// # Example
/// ```rust
/// use pdf_ocr_batch::{ConversionRequest, PromptKind};
///
/// let request = ConversionRequest::builder("scan.pdf")
///     .start_page(2)
///     .end_page(4)
///     .prompt(PromptKind::Markdown)
///     .output("scan.txt")
///     .build()
///     .unwrap();
/// assert_eq!(request.dpi, 300);
/// ```
#[derive(Clone)]
pub struct ConversionRequest {
    /// PDF to process.
    pub document: PathBuf,

    /// First page to process, 1-indexed. Default: 1.
    pub start_page: usize,

    /// Last page to process, inclusive. `None` means the last page of the document.
    pub end_page: Option<usize>,

    /// Rasterisation resolution. Range: 72–1200. Default: 300.
    ///
    /// DeepSeek-OCR reads 300 DPI scans reliably; lower values lose
    /// subscripts and footnotes, higher values mostly cost time.
    pub dpi: u32,

    /// Longest edge of a rendered page in pixels. Default: 10 000.
    ///
    /// Caps memory for oversized pages (posters, plans) independently of DPI.
    pub max_rendered_pixels: u32,

    /// Pause between pages. Default: zero.
    pub delay: Duration,

    /// Instruction template sent with every page. Default: [`PromptKind::Free`].
    pub prompt: PromptKind,

    /// Model name handed to the OCR program. Default: `deepseek-ocr`.
    pub model: String,

    /// Executable used for OCR; invoked as `<program> run <model> <instruction>`.
    /// Default: `ollama`.
    pub ocr_program: PathBuf,

    /// Per-page OCR timeout. `None` waits indefinitely. Default: `None`.
    pub ocr_timeout: Option<Duration>,

    /// Where the text artifact is written. Default: `output.txt`.
    pub output: PathBuf,

    /// Refuse ranges longer than this many pages. Default: 1000.
    pub max_pages: usize,

    /// Refuse source files larger than this many bytes. Default: 512 MiB.
    pub max_file_size: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("document", &self.document)
            .field("start_page", &self.start_page)
            .field("end_page", &self.end_page)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("delay", &self.delay)
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .field("ocr_program", &self.ocr_program)
            .field("ocr_timeout", &self.ocr_timeout)
            .field("output", &self.output)
            .field("max_pages", &self.max_pages)
            .field("max_file_size", &self.max_file_size)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ConversionRequest {
    pub const DEFAULT_DPI: u32 = 300;
    pub const DEFAULT_MODEL: &'static str = "deepseek-ocr";
    pub const DEFAULT_PROGRAM: &'static str = "ollama";
    pub const DEFAULT_OUTPUT: &'static str = "output.txt";
    pub const DEFAULT_MAX_PAGES: usize = 1000;
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 512 * 1024 * 1024;

    /// Start a builder for the given document with every default applied.
    pub fn builder(document: impl Into<PathBuf>) -> ConversionRequestBuilder {
        ConversionRequestBuilder {
            request: ConversionRequest {
                document: document.into(),
                start_page: 1,
                end_page: None,
                dpi: Self::DEFAULT_DPI,
                max_rendered_pixels: 10_000,
                delay: Duration::ZERO,
                prompt: PromptKind::default(),
                model: Self::DEFAULT_MODEL.to_string(),
                ocr_program: PathBuf::from(Self::DEFAULT_PROGRAM),
                ocr_timeout: None,
                output: PathBuf::from(Self::DEFAULT_OUTPUT),
                max_pages: Self::DEFAULT_MAX_PAGES,
                max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
                password: None,
            },
        }
    }

    /// File name of the source document, for headers and log lines.
    pub fn document_name(&self) -> String {
        display_name(&self.document)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Builder for [`ConversionRequest`].
#[derive(Debug)]
pub struct ConversionRequestBuilder {
    request: ConversionRequest,
}

impl ConversionRequestBuilder {
    pub fn start_page(mut self, page: usize) -> Self {
        self.request.start_page = page;
        self
    }

    pub fn end_page(mut self, page: usize) -> Self {
        self.request.end_page = Some(page);
        self
    }

    /// Set or clear the end page.
    pub fn end_page_opt(mut self, page: Option<usize>) -> Self {
        self.request.end_page = page;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.request.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.request.max_rendered_pixels = px;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.request.delay = delay;
        self
    }

    pub fn prompt(mut self, kind: PromptKind) -> Self {
        self.request.prompt = kind;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.request.model = model.into();
        self
    }

    pub fn ocr_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.request.ocr_program = program.into();
        self
    }

    pub fn ocr_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request.ocr_timeout = timeout;
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.output = path.into();
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.request.max_pages = n;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.request.max_file_size = bytes;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.request.password = Some(pwd.into());
        self
    }

    /// Build the request, checking every invariant that needs no I/O.
    ///
    /// Fails with [`OcrBatchError::InvalidInput`] naming the offending field.
    pub fn build(self) -> Result<ConversionRequest, OcrBatchError> {
        let r = &self.request;
        if r.document.as_os_str().is_empty() {
            return Err(OcrBatchError::invalid("document", "path is empty"));
        }
        if r.start_page < 1 {
            return Err(OcrBatchError::invalid(
                "start_page",
                format!("must be >= 1, got {}", r.start_page),
            ));
        }
        if let Some(end) = r.end_page {
            if end < r.start_page {
                return Err(OcrBatchError::invalid(
                    "end_page",
                    format!("must be >= start page {}, got {}", r.start_page, end),
                ));
            }
        }
        if !(MIN_DPI..=MAX_DPI).contains(&r.dpi) {
            return Err(OcrBatchError::invalid(
                "dpi",
                format!("must be {MIN_DPI}–{MAX_DPI}, got {}", r.dpi),
            ));
        }
        if r.max_rendered_pixels < 100 {
            return Err(OcrBatchError::invalid(
                "max_rendered_pixels",
                format!("must be >= 100, got {}", r.max_rendered_pixels),
            ));
        }
        if r.model.trim().is_empty() {
            return Err(OcrBatchError::invalid("model", "must not be empty"));
        }
        if r.ocr_program.as_os_str().is_empty() {
            return Err(OcrBatchError::invalid("ocr_program", "must not be empty"));
        }
        if r.ocr_timeout == Some(Duration::ZERO) {
            return Err(OcrBatchError::invalid("ocr_timeout", "must be greater than zero"));
        }
        if r.output.as_os_str().is_empty() {
            return Err(OcrBatchError::invalid("output", "path is empty"));
        }
        if r.max_pages == 0 {
            return Err(OcrBatchError::invalid("max_pages", "must be >= 1"));
        }
        if r.max_file_size == 0 {
            return Err(OcrBatchError::invalid("max_file_size", "must be >= 1 byte"));
        }
        Ok(self.request)
    }
}
