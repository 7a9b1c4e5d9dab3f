//! OCR invocation: hand a page image to the external model process.
//!
//! The model runs behind a local inference daemon and is reached through its
//! command-line client:
//!
//! ```text
//! ollama run <model> "<image path>\n<prompt template>"
//! ```
//!
//! The instruction is passed as a single argv entry, never through a shell,
//! so paths containing spaces or shell metacharacters are delivered as-is.
//!
//! ## Success and failure
//!
//! A page succeeds when the process exits with status 0 and its error
//! stream is empty once terminal escape sequences and spinner glyphs are
//! removed. Anything else becomes an [`OcrFailure`] for that page; the batch
//! keeps going.

use crate::error::OcrFailure;
use crate::prompts::{build_instruction, PromptKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Recognises the text on one page image.
///
/// The batch loop awaits each call to completion before starting the next
/// page; implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait OcrEngine {
    /// Run OCR on the PNG at `image_path` for 1-indexed `page_num`.
    async fn recognize(
        &self,
        page_num: usize,
        image_path: &Path,
        prompt: PromptKind,
        model: &str,
    ) -> Result<String, OcrFailure>;
}

/// [`OcrEngine`] that shells out to `ollama run` (or a compatible program).
#[derive(Debug, Clone)]
pub struct OllamaCli {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for OllamaCli {
    fn default() -> Self {
        Self::new("ollama")
    }
}

impl OllamaCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the process and fail the page if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl OcrEngine for OllamaCli {
    async fn recognize(
        &self,
        page_num: usize,
        image_path: &Path,
        prompt: PromptKind,
        model: &str,
    ) -> Result<String, OcrFailure> {
        let instruction = build_instruction(image_path, prompt);
        debug!(
            "Page {}: {} run {} {:?}",
            page_num,
            self.program.display(),
            model,
            instruction
        );

        let mut cmd = Command::new(&self.program);
        cmd.arg("run")
            .arg(model)
            .arg(&instruction)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let pending = cmd.output();
        let finished = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(r) => r,
                Err(_) => {
                    return Err(OcrFailure::Timeout {
                        page: page_num,
                        secs: limit.as_secs(),
                    })
                }
            },
            None => pending.await,
        };

        let output = finished.map_err(|e| OcrFailure::SpawnFailed {
            page: page_num,
            program: self.program.display().to_string(),
            detail: e.to_string(),
        })?;

        interpret_output(
            page_num,
            output.status.success(),
            output.status.code(),
            &output.stdout,
            &output.stderr,
        )
    }
}

/// Classify a finished OCR process.
///
/// Returns the recognised text on success, with terminal escape sequences
/// removed but otherwise untouched.
pub fn interpret_output(
    page_num: usize,
    success: bool,
    code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<String, OcrFailure> {
    let diagnostics = clean_error_stream(&String::from_utf8_lossy(stderr));

    if !success {
        return Err(OcrFailure::NonZeroExit {
            page: page_num,
            code,
            stderr: diagnostics,
        });
    }
    if !diagnostics.is_empty() {
        return Err(OcrFailure::ErrorOutput {
            page: page_num,
            stderr: diagnostics,
        });
    }

    Ok(strip_terminal_codes(&String::from_utf8_lossy(stdout)))
}

static RE_TERMINAL_CODES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]").unwrap()
});

// Braille block: the frames of the daemon client's loading spinner.
static RE_SPINNER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x{2800}-\x{28FF}]").unwrap());

// Printed by the client when it attaches the image named in the instruction.
static RE_IMAGE_NOTICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Added image '.*'$").unwrap());

fn strip_terminal_codes(input: &str) -> String {
    RE_TERMINAL_CODES.replace_all(input, "").into_owned()
}

fn clean_error_stream(input: &str) -> String {
    let s = strip_terminal_codes(input);
    let s = RE_SPINNER.replace_all(&s, "");
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !RE_IMAGE_NOTICE.is_match(l))
        .collect::<Vec<_>>()
        .join("\n")
}
