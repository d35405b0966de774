//! Document Renderer: turns an uploaded document into a first-page preview image.
//!
//! Rasterising is CPU-bound; implementations run it inside `tokio::task::spawn_blocking`.

use anyhow::Result;
use async_trait::async_trait;

use crate::storage::UploadFile;

pub mod canvas;
pub mod pdf;

pub use pdf::{PdfPreviewRenderer, RenderBackend};

pub const PREVIEW_CONTENT_TYPE: &str = "image/png";

/// Produces a single raster image of the first page of `file`.
///
/// `Ok(None)` means the renderer ran but produced nothing usable.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, file: &UploadFile) -> Result<Option<UploadFile>>;
}

/// `resume.pdf` -> `resume.png`. Names without an extension get `.png` appended.
pub fn preview_name(source_name: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(idx) if idx > 0 => &source_name[..idx],
        _ => source_name,
    };
    if stem.is_empty() {
        "preview.png".to_string()
    } else {
        format!("{stem}.png")
    }
}
