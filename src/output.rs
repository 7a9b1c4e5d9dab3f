//! Result types and the text artifact written at the end of a run.
//!
//! The artifact is plain UTF-8: a `#`-prefixed header block, a blank line,
//! then one section per processed page in ascending page order:
//!
//! ```text
//! # OCR Results: report.pdf
//! # Pages: 2-4
//! # Prompt: free
//! # Model: deepseek-ocr
//!
//!
//! === Page 2 ===
//!
//! <recognised text>
//! === Page 3 ===
//!
//! *OCR failed*
//! ```

use crate::error::{OcrBatchError, OcrFailure};
use crate::prompts::PromptKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Marker written in place of text for a page whose OCR failed.
pub const FAILURE_MARKER: &str = "*OCR failed*";

/// Outcome for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Recognised text; empty when `error` is set.
    pub text: String,
    /// Wall-clock time for rendering plus OCR.
    pub duration_ms: u64,
    /// Set when the page could not be recognised.
    pub error: Option<OcrFailure>,
}

impl PageResult {
    pub fn from_outcome(
        page_num: usize,
        outcome: Result<String, OcrFailure>,
        elapsed: Duration,
    ) -> Self {
        let duration_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(text) => Self {
                page_num,
                text,
                duration_ms,
                error: None,
            },
            Err(e) => Self {
                page_num,
                text: String::new(),
                duration_ms,
                error: Some(e),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The page's section in the output artifact.
    pub fn render_section(&self) -> String {
        match self.error {
            None => format!("\n=== Page {} ===\n\n{}", self.page_num, self.text),
            Some(_) => format!("\n=== Page {} ===\n\n{}\n", self.page_num, FAILURE_MARKER),
        }
    }
}

/// What a finished (or interrupted) batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// File name of the source PDF.
    pub document: String,
    /// Page count of the whole document.
    pub total_pages: usize,
    /// First page of the resolved range (1-indexed).
    pub first_page: usize,
    /// Last page of the resolved range (inclusive).
    pub last_page: usize,
    pub prompt: PromptKind,
    pub model: String,
    /// Per-page results in ascending page order.
    pub pages: Vec<PageResult>,
    pub processed_pages: usize,
    pub failed_pages: usize,
    /// True when the run was stopped before reaching `last_page`.
    pub interrupted: bool,
    /// Wall-clock time for the whole loop, delays included.
    pub total_duration_ms: u64,
    pub output_path: PathBuf,
}

impl BatchSummary {
    /// Pages in the resolved range, attempted or not.
    pub fn selected_pages(&self) -> usize {
        self.last_page + 1 - self.first_page
    }

    /// Mean wall-clock time per attempted page.
    pub fn average_page_ms(&self) -> u64 {
        if self.pages.is_empty() {
            0
        } else {
            self.total_duration_ms / self.pages.len() as u64
        }
    }

    /// Render the complete text artifact.
    pub fn render_artifact(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# OCR Results: {}\n", self.document));
        out.push_str(&format!("# Pages: {}-{}\n", self.first_page, self.last_page));
        out.push_str(&format!("# Prompt: {}\n", self.prompt));
        out.push_str(&format!("# Model: {}\n", self.model));
        if self.interrupted {
            out.push_str(&format!(
                "# Interrupted: {} of {} pages completed\n",
                self.pages.len(),
                self.selected_pages()
            ));
        }
        out.push('\n');

        for page in &self.pages {
            out.push_str(&page.render_section());
        }
        out
    }
}

/// Write `contents` to `path` atomically: temp sibling, then rename.
pub async fn write_artifact(path: &Path, contents: &str) -> Result<(), OcrBatchError> {
    let write_failed = |source: std::io::Error| OcrBatchError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
        unsaved: contents.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.txt".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
