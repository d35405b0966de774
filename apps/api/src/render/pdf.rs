//! PDF first-page preview renderer.
//!
//! pdfium rasterises the page when its shared library can be loaded. Without it
//! the built-in painter in `render::canvas` draws the page from its content stream.

use std::io::Cursor;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, warn};

use crate::render::canvas::paint_first_page;
use crate::render::{preview_name, DocumentRenderer, PREVIEW_CONTENT_TYPE};
use crate::storage::UploadFile;

/// Longest side of the preview in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 1600;

/// Upper bound on the configured preview size.
pub const MAX_PREVIEW_DIMENSION: u32 = 4096;

/// The PDF header may appear anywhere in the first 1024 bytes.
const HEADER_SEARCH_WINDOW: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBackend {
    Pdfium,
    Painter,
}

pub struct PdfPreviewRenderer {
    max_dimension: u32,
    backend: RenderBackend,
}

impl PdfPreviewRenderer {
    /// Picks the backend once: pdfium if its library loads, the built-in painter otherwise.
    pub fn new(max_dimension: u32) -> Self {
        let backend = if check_pdfium_available() {
            info!("[PdfPreviewRenderer] Using pdfium backend");
            RenderBackend::Pdfium
        } else {
            warn!("[PdfPreviewRenderer] pdfium not available, previews use the built-in page painter");
            RenderBackend::Painter
        };
        Self::with_backend(max_dimension, backend)
    }

    pub fn with_backend(max_dimension: u32, backend: RenderBackend) -> Self {
        if max_dimension > MAX_PREVIEW_DIMENSION {
            warn!("Preview size {max_dimension}px capped at {MAX_PREVIEW_DIMENSION}px");
        }
        Self {
            max_dimension: max_dimension.clamp(1, MAX_PREVIEW_DIMENSION),
            backend,
        }
    }

    pub fn backend(&self) -> RenderBackend {
        self.backend
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}

impl Default for PdfPreviewRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

#[async_trait]
impl DocumentRenderer for PdfPreviewRenderer {
    async fn render(&self, file: &UploadFile) -> Result<Option<UploadFile>> {
        if file.is_empty() {
            bail!("Document {} is empty", file.name);
        }
        if !has_pdf_header(&file.bytes) {
            bail!("Document {} is not a PDF", file.name);
        }

        let bytes = file.bytes.clone();
        let max_dimension = self.max_dimension;
        let backend = self.backend;
        let png = tokio::task::spawn_blocking(move || render_first_page(&bytes, max_dimension, backend))
            .await
            .map_err(|e| anyhow!("Render task failed: {e}"))??;

        debug!(
            "Rendered preview for {} with {:?} ({} bytes)",
            file.name,
            backend,
            png.len()
        );
        Ok(Some(UploadFile::new(
            preview_name(&file.name),
            PREVIEW_CONTENT_TYPE,
            png,
        )))
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

fn check_pdfium_available() -> bool {
    #[cfg(feature = "pdfium")]
    {
        pdfium_render::prelude::Pdfium::bind_to_system_library().is_ok()
    }
    #[cfg(not(feature = "pdfium"))]
    {
        false
    }
}

fn render_first_page(bytes: &[u8], max_dimension: u32, backend: RenderBackend) -> Result<Vec<u8>> {
    let image = match backend {
        RenderBackend::Pdfium => render_with_pdfium(bytes, max_dimension)?,
        RenderBackend::Painter => {
            let document = lopdf::Document::load_mem(bytes).context("Failed to parse PDF")?;
            DynamicImage::ImageRgba8(paint_first_page(&document, max_dimension)?)
        }
    };
    encode_png(&image)
}

#[cfg(feature = "pdfium")]
fn render_with_pdfium(bytes: &[u8], max_dimension: u32) -> Result<DynamicImage> {
    use pdfium_render::prelude::*;

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| anyhow!("Failed to bind pdfium: {e}"))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| anyhow!("Failed to load PDF: {e}"))?;
    let page = document
        .pages()
        .first()
        .map_err(|e| anyhow!("PDF has no pages: {e}"))?;

    // max_dimension is capped well below i32::MAX
    let config = PdfRenderConfig::new()
        .set_target_width(max_dimension as i32)
        .set_maximum_height(max_dimension as i32)
        .render_form_data(true)
        .render_annotations(true);

    let image = page
        .render_with_config(&config)
        .map_err(|e| anyhow!("Failed to render page: {e}"))?
        .as_image();
    Ok(image)
}

#[cfg(not(feature = "pdfium"))]
fn render_with_pdfium(_bytes: &[u8], _max_dimension: u32) -> Result<DynamicImage> {
    bail!("Built without pdfium support")
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .context("Failed to encode preview")?;
    Ok(buffer)
}
