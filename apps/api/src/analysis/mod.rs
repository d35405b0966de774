//! Analysis: the structured-inference capability and the parsing of its output.
//!
//! The capability is opaque: given a stored document and an instruction payload it
//! returns content that is either a plain string or a sequence of blocks whose first
//! element carries the text. Both shapes must parse to the same `Feedback`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::{strip_json_fences, ContentBlock};
use crate::models::resume::Feedback;
use crate::storage::ArtifactRef;

pub mod llm;
pub mod prompts;

pub use llm::LlmAnalysisClient;
pub use prompts::prepare_instructions;

/// Ways the analysis step can fail. `NoResult` and `Malformed` are distinct on purpose:
/// the first means the capability returned nothing, the second that it returned
/// something unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisFailure {
    #[error("analysis returned no result")]
    NoResult,

    #[error("malformed analysis response: {0}")]
    Malformed(String),

    #[error("analysis unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl AnalysisContent {
    /// The textual payload: the string itself, or the first block's text.
    pub fn text(&self) -> Option<&str> {
        match self {
            AnalysisContent::Text(text) => Some(text.as_str()),
            AnalysisContent::Blocks(blocks) => blocks.first().and_then(|b| b.text.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub content: AnalysisContent,
}

impl AnalysisResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: AnalysisContent::Text(text.into()),
        }
    }

    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            content: AnalysisContent::Blocks(blocks),
        }
    }
}

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// `Ok(None)` is the capability's "no result" answer.
    async fn analyze(
        &self,
        document: &ArtifactRef,
        instructions: &str,
    ) -> Result<Option<AnalysisResponse>>;
}

/// Extracts the textual payload from `response` and parses it as `Feedback`.
pub fn parse_feedback(response: &AnalysisResponse) -> Result<Feedback, AnalysisFailure> {
    let text = response
        .content
        .text()
        .ok_or_else(|| AnalysisFailure::Malformed("response carried no text".to_string()))?;

    let json = strip_json_fences(text);
    if json.is_empty() {
        return Err(AnalysisFailure::Malformed("response text was empty".to_string()));
    }

    let feedback: Feedback = serde_json::from_str(json)
        .map_err(|e| AnalysisFailure::Malformed(format!("not valid feedback JSON: {e}")))?;

    if !(0.0..=100.0).contains(&feedback.overall_score) {
        return Err(AnalysisFailure::Malformed(format!(
            "overallScore {} is outside 0-100",
            feedback.overall_score
        )));
    }

    Ok(feedback)
}
