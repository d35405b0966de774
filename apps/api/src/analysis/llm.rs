use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use crate::analysis::prompts::{resume_text_block, ANALYSIS_SYSTEM};
use crate::analysis::{AnalysisClient, AnalysisResponse};
use crate::llm_client::{LlmClient, Part};
use crate::storage::{ArtifactRef, ArtifactStore};

/// Claude-backed analysis. Reads the stored document back from the artifact
/// store and sends its extracted text with the instructions. Documents without
/// extractable text (scans, image-only exports) are sent as the PDF itself.
pub struct LlmAnalysisClient {
    llm: LlmClient,
    artifacts: Arc<dyn ArtifactStore>,
}

impl LlmAnalysisClient {
    pub fn new(llm: LlmClient, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { llm, artifacts }
    }
}

#[async_trait]
impl AnalysisClient for LlmAnalysisClient {
    async fn analyze(
        &self,
        document: &ArtifactRef,
        instructions: &str,
    ) -> Result<Option<AnalysisResponse>> {
        let Some(bytes) = self.artifacts.fetch(document).await? else {
            warn!("Document {document} not found in artifact store");
            return Ok(None);
        };

        let resume_block = extract_text(document, bytes.clone())
            .await
            .map(|text| resume_text_block(&text));
        if resume_block.is_none() {
            info!("Sending {document} to the model as a PDF document");
        }
        let parts = request_parts(resume_block.as_deref(), &bytes, instructions);

        let response = self.llm.call(&parts, ANALYSIS_SYSTEM).await?;
        if response.content.is_empty() {
            return Ok(None);
        }

        info!(
            "Analysis of {document} returned {} content block(s)",
            response.content.len()
        );
        Ok(Some(AnalysisResponse::blocks(response.content)))
    }
}

/// Extracted text, or `None` when the document has none or extraction fails.
async fn extract_text(document: &ArtifactRef, bytes: Bytes) -> Option<String> {
    // pdf-extract can panic on some fonts, which surfaces here as a join error
    match tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
        Ok(Ok(_)) => {
            warn!("Document {document} has no extractable text");
            None
        }
        Ok(Err(e)) => {
            warn!("Failed to extract text from {document}: {e}");
            None
        }
        Err(e) => {
            warn!("Text extraction task for {document} failed: {e}");
            None
        }
    }
}

/// The user turn: resume (as text when available, else the PDF) followed by the instructions.
fn request_parts<'a>(
    resume_block: Option<&'a str>,
    document: &'a [u8],
    instructions: &'a str,
) -> Vec<Part<'a>> {
    let resume = match resume_block {
        Some(text) => Part::Text(text),
        None => Part::Pdf(document),
    };
    vec![resume, Part::Text(instructions)]
}
