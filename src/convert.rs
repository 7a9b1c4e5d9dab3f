//! Batch conversion: validate a request, then OCR its pages one at a time.
//!
//! ## Flow
//!
//! ```text
//! ConversionRequest ──validate──▶ ValidatedRequest ──run_batch──▶ BatchSummary
//!                     (I/O checks,                  (render → PNG → OCR,
//!                      page count)                   per page, in order)
//! ```
//!
//! Validation failures are fatal and happen before any page is rendered.
//! Inside the loop a page that fails to render or OCR is recorded with a
//! failure marker and the loop moves on. The output file is written once,
//! after the loop, including when the run is interrupted.

use crate::config::{display_name, ConversionRequest};
use crate::error::{OcrBatchError, OcrFailure};
use crate::output::{self, BatchSummary, PageResult};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::ocr::{OcrEngine, OllamaCli};
use crate::pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer};
use crate::progress::ProgressCallback;
use std::future::Future;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A request whose document and page range have been checked.
///
/// Only [`validate`] creates one.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    request: ConversionRequest,
    document: SourceDocument,
    total_pages: usize,
    first_page: usize,
    last_page: usize,
}

impl ValidatedRequest {
    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    pub fn document(&self) -> &SourceDocument {
        &self.document
    }

    /// Page count of the whole document.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Resolved 1-indexed `(first, last)` pages, inclusive.
    pub fn page_range(&self) -> (usize, usize) {
        (self.first_page, self.last_page)
    }

    /// The pages that will be processed, in order.
    pub fn pages(&self) -> RangeInclusive<usize> {
        self.first_page..=self.last_page
    }
}

/// Clamp the requested bounds to a document of `total_pages`.
///
/// `end` defaults to, and is clamped to, `total_pages`. Fails with
/// [`OcrBatchError::RangeError`] when `start` lies beyond the document.
pub fn resolve_page_range(
    total_pages: usize,
    start: usize,
    end: Option<usize>,
) -> Result<(usize, usize), OcrBatchError> {
    if start < 1 {
        return Err(OcrBatchError::invalid(
            "start_page",
            format!("must be >= 1, got {start}"),
        ));
    }
    if start > total_pages {
        return Err(OcrBatchError::RangeError {
            start,
            total: total_pages,
        });
    }
    let last = end.map_or(total_pages, |e| e.min(total_pages));
    if last < start {
        return Err(OcrBatchError::invalid(
            "end_page",
            format!("must be >= start page {start}, got {last}"),
        ));
    }
    Ok((start, last))
}

/// Check a request against the file system and the PDF itself.
///
/// Confirms the document exists, is within the size cap and is a PDF, opens
/// it with `rasterizer` to count its pages, resolves the page range and checks it
/// against the page-count cap. Nothing is rendered.
pub fn validate<R: Rasterizer>(
    request: ConversionRequest,
    rasterizer: &R,
) -> Result<ValidatedRequest, OcrBatchError> {
    let document = input::open_document(
        &request.document,
        request.max_file_size,
        request.password.clone(),
    )?;

    let total_pages = {
        let opened = rasterizer.open(&document)?;
        rasterizer.page_count(&opened)
    };
    let (first_page, last_page) =
        resolve_page_range(total_pages, request.start_page, request.end_page)?;

    let selected = last_page + 1 - first_page;
    if selected > request.max_pages {
        return Err(OcrBatchError::invalid(
            "max_pages",
            format!(
                "pages {first_page}-{last_page} are {selected} pages, limit is {}",
                request.max_pages
            ),
        ));
    }

    debug!(
        "Validated {}: {} pages total, processing {}-{}",
        document.path().display(),
        total_pages,
        first_page,
        last_page
    );

    Ok(ValidatedRequest {
        request,
        document,
        total_pages,
        first_page,
        last_page,
    })
}

/// Drives one batch: renders each page, runs OCR on it, writes the result.
pub struct BatchConverter<R, O> {
    rasterizer: R,
    ocr: O,
    progress: Option<ProgressCallback>,
}

impl<R: Rasterizer, O: OcrEngine> BatchConverter<R, O> {
    pub fn new(rasterizer: R, ocr: O) -> Self {
        Self {
            rasterizer,
            ocr,
            progress: None,
        }
    }

    /// Report per-page events to `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn ocr(&self) -> &O {
        &self.ocr
    }

    /// Validate `request` with this converter's rasterizer.
    pub fn validate(&self, request: ConversionRequest) -> Result<ValidatedRequest, OcrBatchError> {
        validate(request, &self.rasterizer)
    }

    /// Process every page of `job` in ascending order and write the artifact.
    ///
    /// When `cancel` resolves while an OCR call or the inter-page delay is
    /// pending, the in-flight page is abandoned and the results collected so
    /// far are written with an `# Interrupted` header line. Pass
    /// [`std::future::pending()`] to run to completion.
    ///
    /// # Errors
    /// Only fatal errors: the scratch directory cannot be created, the
    /// document can no longer be opened, or the output file cannot be
    /// written. In the last case the error still carries the artifact text
    /// ([`OcrBatchError::unsaved_output`]). Page failures are inside the
    /// summary.
    pub async fn run_batch<F>(
        &self,
        job: &ValidatedRequest,
        cancel: F,
    ) -> Result<BatchSummary, OcrBatchError>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        tokio::pin!(cancel);

        let request = job.request();
        let (first_page, last_page) = job.page_range();
        let selected = last_page + 1 - first_page;

        let scratch = tempfile::Builder::new()
            .prefix("pdf-ocr-")
            .tempdir()
            .map_err(|e| OcrBatchError::Internal(format!("scratch directory: {e}")))?;

        let pdf = self.rasterizer.open(job.document())?;

        info!(
            "Processing {} pages {}-{} ({} page(s)), model {}, prompt {}",
            request.document_name(),
            first_page,
            last_page,
            selected,
            request.model,
            request.prompt
        );
        if let Some(ref cb) = self.progress {
            cb.on_conversion_start(selected);
        }

        let mut pages: Vec<PageResult> = Vec::with_capacity(selected);
        let mut interrupted = false;

        for page_num in job.pages() {
            if let Some(ref cb) = self.progress {
                cb.on_page_start(page_num, last_page);
            }
            let page_start = Instant::now();
            let image_path = scratch.path().join(format!("page_{page_num}.png"));

            let outcome = match self.stage_page(&pdf, request.dpi, page_num, &image_path) {
                Err(failure) => Err(failure),
                Ok(()) => {
                    let recognized = tokio::select! {
                        biased;
                        _ = &mut cancel => None,
                        r = self.ocr.recognize(page_num, &image_path, request.prompt, &request.model) => Some(r),
                    };
                    discard_page_image(&image_path);
                    match recognized {
                        Some(r) => r,
                        None => {
                            warn!("Interrupted during page {}", page_num);
                            interrupted = true;
                            break;
                        }
                    }
                }
            };

            let result = PageResult::from_outcome(page_num, outcome, page_start.elapsed());
            self.report(&result, last_page);
            pages.push(result);

            if page_num < last_page && !request.delay.is_zero() {
                debug!("Waiting {:?} before page {}", request.delay, page_num + 1);
                tokio::select! {
                    biased;
                    _ = &mut cancel => {
                        warn!("Interrupted after page {}", page_num);
                        interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(request.delay) => {}
                }
            }
        }

        let processed_pages = pages.iter().filter(|p| p.is_success()).count();
        let failed_pages = pages.len() - processed_pages;

        let summary = BatchSummary {
            document: display_name(job.document().path()),
            total_pages: job.total_pages(),
            first_page,
            last_page,
            prompt: request.prompt,
            model: request.model.clone(),
            processed_pages,
            failed_pages,
            pages,
            interrupted,
            total_duration_ms: started.elapsed().as_millis() as u64,
            output_path: request.output.clone(),
        };

        if let Some(ref cb) = self.progress {
            cb.on_conversion_complete(summary.pages.len(), processed_pages);
        }

        output::write_artifact(&request.output, &summary.render_artifact()).await?;

        info!(
            "Batch complete: {}/{} pages recognised, {} failed, {}ms total{}",
            processed_pages,
            selected,
            failed_pages,
            summary.total_duration_ms,
            if interrupted { " (interrupted)" } else { "" }
        );

        Ok(summary)
    }

    /// Render one page and write it as PNG to `dest`.
    ///
    /// The image is dropped on return, before OCR starts, so at most one
    /// rendered page is alive at any time.
    fn stage_page(
        &self,
        pdf: &R::Document<'_>,
        dpi: u32,
        page_num: usize,
        dest: &Path,
    ) -> Result<(), OcrFailure> {
        let image = self.rasterizer.render_page(pdf, page_num - 1, dpi)?;
        let (w, h) = image.dimensions();
        debug!("Page {}: {}x{} px → {}", page_num, w, h, dest.display());

        image
            .write_png(dest)
            .map_err(|e| OcrFailure::ImageWriteFailed {
                page: page_num,
                detail: e.to_string(),
            })
    }

    fn report(&self, result: &PageResult, last_page: usize) {
        let elapsed = Duration::from_millis(result.duration_ms);
        match &result.error {
            None => {
                info!(
                    "Page {}/{}: {} chars in {:.1}s",
                    result.page_num,
                    last_page,
                    result.text.len(),
                    elapsed.as_secs_f64()
                );
                if let Some(ref cb) = self.progress {
                    cb.on_page_complete(result.page_num, last_page, &result.text, elapsed);
                }
            }
            Some(e) => {
                warn!("{} ({:.1}s)", e, elapsed.as_secs_f64());
                if let Some(ref cb) = self.progress {
                    cb.on_page_error(result.page_num, last_page, &e.to_string(), elapsed);
                }
            }
        }
    }
}

impl BatchConverter<PdfiumRasterizer, OllamaCli> {
    /// Converter backed by pdfium and the OCR program named in `request`.
    pub fn for_request(request: &ConversionRequest) -> Result<Self, OcrBatchError> {
        let rasterizer =
            PdfiumRasterizer::bind()?.with_max_rendered_pixels(request.max_rendered_pixels);
        let ocr = OllamaCli::new(&request.ocr_program).with_timeout(request.ocr_timeout);
        Ok(Self::new(rasterizer, ocr))
    }
}

fn discard_page_image(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!("Could not remove {}: {}", path.display(), e);
    }
}

/// Validate `request` and run it to completion with pdfium and `ollama`.
///
/// # Example
/// ```rust,no_run
/// use pdf_ocr_batch::{convert_to_file, ConversionRequest};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let request = ConversionRequest::builder("scan.pdf").end_page(10).build()?;
///     let summary = convert_to_file(request).await?;
///     eprintln!("{}/{} pages recognised", summary.processed_pages, summary.pages.len());
///     Ok(())
/// }
/// ```
pub async fn convert_to_file(request: ConversionRequest) -> Result<BatchSummary, OcrBatchError> {
    let converter = BatchConverter::for_request(&request)?;
    let job = converter.validate(request)?;
    converter.run_batch(&job, std::future::pending()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_defaults_to_last_page() {
        assert_eq!(resolve_page_range(12, 1, None).unwrap(), (1, 12));
        assert_eq!(resolve_page_range(12, 5, None).unwrap(), (5, 12));
    }

    #[test]
    fn end_is_clamped_to_document() {
        assert_eq!(resolve_page_range(4, 3, Some(10)).unwrap(), (3, 4));
    }

    #[test]
    fn explicit_range_is_kept() {
        assert_eq!(resolve_page_range(5, 2, Some(4)).unwrap(), (2, 4));
        assert_eq!(resolve_page_range(5, 5, Some(5)).unwrap(), (5, 5));
    }

    #[test]
    fn start_past_end_of_document_is_range_error() {
        let err = resolve_page_range(5, 6, None).unwrap_err();
        assert!(
            matches!(err, OcrBatchError::RangeError { start: 6, total: 5 }),
            "got {err:?}"
        );
    }

    #[test]
    fn empty_document_is_range_error() {
        let err = resolve_page_range(0, 1, None).unwrap_err();
        assert!(matches!(err, OcrBatchError::RangeError { start: 1, total: 0 }));
    }

    #[test]
    fn zero_start_is_invalid() {
        let err = resolve_page_range(5, 0, None).unwrap_err();
        assert!(matches!(
            err,
            OcrBatchError::InvalidInput {
                field: "start_page",
                ..
            }
        ));
    }

    #[test]
    fn end_before_start_is_invalid() {
        let err = resolve_page_range(5, 3, Some(2)).unwrap_err();
        assert!(matches!(
            err,
            OcrBatchError::InvalidInput {
                field: "end_page",
                ..
            }
        ));
    }
}
