use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::intake::error::ErrorKind;

/// Pipeline states in execution order. A failure can end the run from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Validating,
    Uploading,
    Converting,
    UploadingPreview,
    Checkpointing,
    Analyzing,
    Completed,
}

impl IngestStage {
    pub fn status_text(self) -> &'static str {
        match self {
            IngestStage::Validating => "Checking your upload...",
            IngestStage::Uploading => "Uploading your resume...",
            IngestStage::Converting => "Converting to image...",
            IngestStage::UploadingPreview => "Uploading the image...",
            IngestStage::Checkpointing => "Preparing data...",
            IngestStage::Analyzing => "Analyzing with AI... This may take a few minutes.",
            IngestStage::Completed => "Analysis complete.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Stage { stage: IngestStage },
    Failed { kind: ErrorKind, message: String },
}

impl ProgressEvent {
    pub fn stage(stage: IngestStage) -> Self {
        ProgressEvent::Stage { stage }
    }

    pub fn message(&self) -> &str {
        match self {
            ProgressEvent::Stage { stage } => stage.status_text(),
            ProgressEvent::Failed { message, .. } => message,
        }
    }
}

/// Receives advisory status updates while a submission runs.
pub trait ProgressObserver: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

/// Forwards events to a channel. A dropped receiver is ignored.
impl ProgressObserver for UnboundedSender<ProgressEvent> {
    fn notify(&self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}

/// Writes each event to the log.
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn notify(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Stage { stage } => info!("[{stage:?}] {}", stage.status_text()),
            ProgressEvent::Failed { kind, message } => warn!("[Failed {kind:?}] {message}"),
        }
    }
}
