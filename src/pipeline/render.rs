//! PDF rasterisation: render one page at a time to an image.
//!
//! The batch loop asks for exactly one page per call and drops the image
//! before asking for the next, so peak memory is a single page no matter
//! how long the document is. The [`Rasterizer`] trait is the seam between
//! that loop and pdfium; tests substitute an in-process fake.
//!
//! pdfium is synchronous and not async-safe. The loop is strictly
//! sequential, so rendering simply blocks the runtime thread; there is no
//! other work it could be doing meanwhile.

use crate::error::{OcrBatchError, OcrFailure};
use crate::pipeline::input::SourceDocument;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A rasterised page owned by the batch loop for one iteration.
pub trait PageImage {
    /// Pixel dimensions `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Serialise the page as PNG at `dest`.
    fn write_png(&self, dest: &Path) -> image::ImageResult<()>;
}

/// Produces page counts and single-page images for a document.
///
/// A document is opened once per run with [`Rasterizer::open`]; pages are then
/// rendered from the open handle one at a time.
pub trait Rasterizer {
    type Page: PageImage;

    /// A parsed document, borrowed from the rasterizer for one run.
    type Document<'a>
    where
        Self: 'a;

    /// Parse `document`. Opening failures are fatal.
    fn open<'a>(&'a self, document: &'a SourceDocument)
        -> Result<Self::Document<'a>, OcrBatchError>;

    /// Number of pages in an open document.
    fn page_count(&self, document: &Self::Document<'_>) -> usize;

    /// Render the page at 0-based `page_index` at `dpi`.
    ///
    /// Failures are reported as [`OcrFailure::RenderFailed`] so the batch can
    /// continue with the next page.
    fn render_page(
        &self,
        document: &Self::Document<'_>,
        page_index: usize,
        dpi: u32,
    ) -> Result<Self::Page, OcrFailure>;
}

/// A page rendered by pdfium.
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub image: DynamicImage,
}

impl PageImage for RenderedPage {
    fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    fn write_png(&self, dest: &Path) -> image::ImageResult<()> {
        self.image.save_with_format(dest, ImageFormat::Png)
    }
}

/// [`Rasterizer`] backed by the pdfium library.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    max_rendered_pixels: u32,
}

impl PdfiumRasterizer {
    /// Bind pdfium and create a rasterizer.
    ///
    /// Lookup order: `PDFIUM_LIB_PATH` (path to the shared library), the
    /// current directory, then the system library search path.
    pub fn bind() -> Result<Self, OcrBatchError> {
        let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
            Some(path) if !path.is_empty() => {
                let path = PathBuf::from(path);
                debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path.display());
                Pdfium::bind_to_library(&path)
                    .map_err(|e| OcrBatchError::PdfiumBindingFailed(format!("{e:?}")))?
            }
            _ => {
                let local = std::env::current_dir()
                    .unwrap_or_default()
                    .join(Pdfium::pdfium_platform_library_name());
                Pdfium::bind_to_library(&local)
                    .or_else(|_| Pdfium::bind_to_system_library())
                    .map_err(|e| OcrBatchError::PdfiumBindingFailed(format!("{e:?}")))?
            }
        };

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            max_rendered_pixels: 10_000,
        })
    }

    /// Cap the longest edge of rendered pages.
    pub fn with_max_rendered_pixels(mut self, px: u32) -> Self {
        self.max_rendered_pixels = px.max(100);
        self
    }
}

impl Rasterizer for PdfiumRasterizer {
    type Page = RenderedPage;
    type Document<'a> = PdfDocument<'a>;

    fn open<'a>(
        &'a self,
        document: &'a SourceDocument,
    ) -> Result<PdfDocument<'a>, OcrBatchError> {
        let path = document.path();
        let password = document.password();
        let pdf = self
            .pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        OcrBatchError::WrongPassword {
                            path: path.to_path_buf(),
                        }
                    } else {
                        OcrBatchError::PasswordRequired {
                            path: path.to_path_buf(),
                        }
                    }
                } else {
                    OcrBatchError::CorruptPdf {
                        path: path.to_path_buf(),
                        detail: err_str,
                    }
                }
            })?;
        info!("PDF loaded: {} pages", pdf.pages().len());
        Ok(pdf)
    }

    fn page_count(&self, document: &PdfDocument<'_>) -> usize {
        document.pages().len() as usize
    }

    fn render_page(
        &self,
        document: &PdfDocument<'_>,
        page_index: usize,
        dpi: u32,
    ) -> Result<RenderedPage, OcrFailure> {
        let page_num = page_index + 1;
        let failed = |detail: String| OcrFailure::RenderFailed {
            page: page_num,
            detail,
        };

        let index = u16::try_from(page_index)
            .map_err(|_| failed(format!("page index {page_index} out of range")))?;
        let pages = document.pages();
        let page = pages.get(index).map_err(|e| failed(format!("{:?}", e)))?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| failed(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {} DPI → {}x{} px",
            page_num,
            dpi,
            image.width(),
            image.height()
        );

        Ok(RenderedPage { page_num, image })
    }
}
