//! Pipeline stages for one page of a batch.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr
//! (checks)  (pdfium)   (ollama run)
//! ```
//!
//! 1. [`input`]:  pre-flight checks on the document path (exists, is a PDF,
//!    within the size cap)
//! 2. [`render`]: rasterise exactly one page per call behind the
//!    [`render::Rasterizer`] trait
//! 3. [`ocr`]:    run the external OCR process on the page PNG behind the
//!    [`ocr::OcrEngine`] trait

pub mod input;
pub mod ocr;
pub mod render;
