//! End-to-end tests against a real pdfium library and a running ollama daemon.
//!
//! They read PDFs from `./test_cases/` and invoke `ollama run` for every
//! page, so they are gated behind the `E2E_ENABLED` environment variable and
//! do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_page_range -- --nocapture

use pdf_ocr_batch::{
    convert_to_file, BatchConverter, ConversionRequest, OcrBatchError, PromptKind, Rasterizer,
    FAILURE_MARKER,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

fn e2e_model() -> String {
    std::env::var("PDF_OCR_MODEL").unwrap_or_else(|_| ConversionRequest::DEFAULT_MODEL.into())
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Assert the artifact has the header block and one section per page.
fn assert_artifact_shape(text: &str, first: usize, last: usize, context: &str) {
    assert!(
        text.starts_with("# OCR Results: "),
        "[{context}] missing results header"
    );
    assert!(
        text.contains(&format!("# Pages: {first}-{last}\n")),
        "[{context}] wrong page range header"
    );
    assert_eq!(
        text.matches("\n=== Page ").count(),
        last + 1 - first,
        "[{context}] wrong number of page sections"
    );
    let mut prev = 0;
    for page in first..=last {
        let pos = text
            .find(&format!("\n=== Page {page} ===\n"))
            .unwrap_or_else(|| panic!("[{context}] section for page {page} missing"));
        assert!(pos >= prev, "[{context}] page {page} out of order");
        prev = pos;
    }
    assert!(
        !text.contains('\u{1b}'),
        "[{context}] terminal escape codes leaked into the artifact"
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_page_free_ocr() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let out = output_dir().join("sample_p1.txt");

    let request = ConversionRequest::builder(&pdf)
        .end_page(1)
        .model(e2e_model())
        .output(&out)
        .build()
        .unwrap();
    let summary = convert_to_file(request).await.expect("batch should run");

    println!(
        "page 1: {} chars in {}ms",
        summary.pages[0].text.len(),
        summary.pages[0].duration_ms
    );
    assert_eq!(summary.pages.len(), 1);
    assert_eq!(summary.processed_pages, 1, "{:?}", summary.pages[0].error);
    assert!(!summary.pages[0].text.trim().is_empty());

    let text = std::fs::read_to_string(&out).unwrap();
    assert_artifact_shape(&text, 1, 1, "first page");
    assert!(!text.contains(FAILURE_MARKER));
}

#[tokio::test]
async fn test_page_range_with_markdown_prompt() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let out = output_dir().join("sample_range.txt");

    let request = ConversionRequest::builder(&pdf)
        .start_page(2)
        .end_page(3)
        .dpi(200)
        .prompt(PromptKind::Markdown)
        .model(e2e_model())
        .output(&out)
        .build()
        .unwrap();
    let summary = convert_to_file(request).await.expect("batch should run");

    let pages: Vec<usize> = summary.pages.iter().map(|p| p.page_num).collect();
    assert_eq!(pages, vec![2, 3]);

    let text = std::fs::read_to_string(&out).unwrap();
    assert_artifact_shape(&text, 2, 3, "range");
    assert!(text.contains("# Prompt: markdown\n"));
}

#[tokio::test]
async fn test_page_count_matches_pdfium() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let request = ConversionRequest::builder(&pdf).build().unwrap();
    let converter = BatchConverter::for_request(&request).expect("pdfium should bind");
    let job = converter.validate(request).expect("sample.pdf should validate");

    let rasterizer = converter.rasterizer();
    let opened = rasterizer.open(job.document()).expect("sample.pdf should open");
    let counted = rasterizer.page_count(&opened);
    assert_eq!(counted, job.total_pages());
    assert_eq!(job.page_range(), (1, counted));
}

#[tokio::test]
async fn test_start_past_end_is_range_error() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let request = ConversionRequest::builder(&pdf)
        .start_page(100_000)
        .output(output_dir().join("never_written.txt"))
        .build()
        .unwrap();
    let err = convert_to_file(request).await.unwrap_err();

    assert!(matches!(err, OcrBatchError::RangeError { start: 100_000, .. }), "got {err:?}");
    assert!(!output_dir().join("never_written.txt").exists());
}

#[tokio::test]
async fn test_missing_model_marks_pages_failed() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let out = output_dir().join("sample_bad_model.txt");

    let request = ConversionRequest::builder(&pdf)
        .end_page(1)
        .model("no-such-model-for-e2e")
        .output(&out)
        .build()
        .unwrap();
    let summary = convert_to_file(request).await.expect("batch should still run");

    assert_eq!(summary.failed_pages, 1);
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains(&format!("=== Page 1 ===\n\n{FAILURE_MARKER}\n")));
}
