//! Error types for the pdf-ocr-batch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OcrBatchError`]: **Fatal**: the batch cannot start or its result
//!   cannot be saved (bad page bounds, missing file, unwritable output).
//!   Returned as `Err(OcrBatchError)` from [`crate::convert::validate`] and
//!   [`crate::convert::BatchConverter::run_batch`].
//!
//! * [`OcrFailure`]: **Non-fatal**: a single page could not be rendered or
//!   the OCR process rejected it. Stored inside
//!   [`crate::output::PageResult`] and written as a failure marker, while
//!   every other page is still processed.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-ocr-batch library.
#[derive(Debug, Error)]
pub enum OcrBatchError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A request field failed validation. `field` names the offending option.
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The start page lies beyond the end of the document.
    #[error("Start page {start} exceeds total pages ({total})")]
    RangeError { start: usize, total: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium (https://github.com/bblanchon/pdfium-binaries) and either:\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium, or\n\
  • place the library in the current directory, or\n\
  • put it on the system library search path.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    ///
    /// `unsaved` holds the complete artifact that was meant for `path`.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        unsaved: String,
    },

    /// Unexpected internal error (temporary directory, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrBatchError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        OcrBatchError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Recognised text that could not be saved, if this error lost any.
    pub fn unsaved_output(&self) -> Option<&str> {
        match self {
            OcrBatchError::OutputWriteFailed { unsaved, .. } => Some(unsaved.as_str()),
            _ => None,
        }
    }
}

/// A non-fatal failure for a single page.
///
/// The page is written as `*OCR failed*` and the batch carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum OcrFailure {
    /// pdfium could not rasterise the page.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The rendered page could not be written as a temporary PNG.
    #[error("Page {page}: could not write page image: {detail}")]
    ImageWriteFailed { page: usize, detail: String },

    /// The OCR program could not be started at all.
    #[error("Page {page}: failed to launch '{program}': {detail}")]
    SpawnFailed {
        page: usize,
        program: String,
        detail: String,
    },

    /// The OCR program exited unsuccessfully.
    #[error("Page {page}: OCR process exited with {}: {stderr}", exit_label(.code))]
    NonZeroExit {
        page: usize,
        code: Option<i32>,
        stderr: String,
    },

    /// The OCR program exited cleanly but wrote to its error stream.
    #[error("Page {page}: OCR process reported an error: {stderr}")]
    ErrorOutput { page: usize, stderr: String },

    /// The OCR program did not finish within the configured timeout.
    #[error("Page {page}: OCR process timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

impl OcrFailure {
    /// 1-indexed page the failure belongs to.
    pub fn page(&self) -> usize {
        match self {
            OcrFailure::RenderFailed { page, .. }
            | OcrFailure::ImageWriteFailed { page, .. }
            | OcrFailure::SpawnFailed { page, .. }
            | OcrFailure::NonZeroExit { page, .. }
            | OcrFailure::ErrorOutput { page, .. }
            | OcrFailure::Timeout { page, .. } => *page,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}
