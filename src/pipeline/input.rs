//! Input checks: turn a user-supplied path into a [`SourceDocument`].
//!
//! Everything here runs before pdfium is asked to open the file, so a typo
//! or an oversized upload is reported with the offending option named
//! instead of surfacing as a pdfium parse error. The `%PDF` magic bytes are
//! checked up front for the same reason.

use crate::error::OcrBatchError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A local PDF that passed the pre-flight checks.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: PathBuf,
    size_bytes: u64,
    password: Option<String>,
}

impl SourceDocument {
    /// Absolute path of the PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size at validation time.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// User password for encrypted documents.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// Check that `path` is a readable PDF no larger than `max_file_size` bytes.
///
/// Fails with [`OcrBatchError::InvalidInput`] on field `document` (missing,
/// not a file, unreadable, wrong magic) or `max_file_size` (too large).
pub fn open_document(
    path: &Path,
    max_file_size: u64,
    password: Option<String>,
) -> Result<SourceDocument, OcrBatchError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrBatchError::invalid(
                "document",
                format!("file '{}' not found", path.display()),
            ));
        }
        Err(e) => {
            return Err(OcrBatchError::invalid(
                "document",
                format!("cannot stat '{}': {e}", path.display()),
            ));
        }
    };

    if !meta.is_file() {
        return Err(OcrBatchError::invalid(
            "document",
            format!("'{}' is not a regular file", path.display()),
        ));
    }

    let size_bytes = meta.len();
    if size_bytes > max_file_size {
        return Err(OcrBatchError::invalid(
            "max_file_size",
            format!(
                "'{}' is {} bytes, limit is {} bytes",
                path.display(),
                size_bytes,
                max_file_size
            ),
        ));
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(OcrBatchError::invalid(
                    "document",
                    format!(
                        "'{}' is not a PDF (first bytes: {:?})",
                        path.display(),
                        String::from_utf8_lossy(&magic)
                    ),
                ));
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(OcrBatchError::invalid(
                "document",
                format!("permission denied reading '{}'", path.display()),
            ));
        }
        Err(e) => {
            return Err(OcrBatchError::invalid(
                "document",
                format!("cannot open '{}': {e}", path.display()),
            ));
        }
    }

    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    debug!("Resolved local PDF: {} ({} bytes)", path.display(), size_bytes);

    Ok(SourceDocument {
        path,
        size_bytes,
        password,
    })
}
