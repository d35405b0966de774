//! Ingestion Pipeline: drives one resume submission from upload to stored feedback.
//!
//! Flow: validate → upload original → render preview → upload preview →
//!       checkpoint record → analyze → parse feedback → overwrite record.
//!
//! Steps run strictly in order and the first failure ends the run. Nothing already
//! written is deleted or retried: a failure after the checkpoint leaves the
//! record at `resume_<id>` with pending feedback, and a fresh `submit` gets a new id.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analysis::{parse_feedback, prepare_instructions, AnalysisClient, AnalysisFailure};
use crate::intake::error::IngestError;
use crate::intake::progress::{IngestStage, ProgressEvent, ProgressObserver};
use crate::intake::records::{load_record, save_record};
use crate::models::resume::{FeedbackState, ResumeRecord};
use crate::render::DocumentRenderer;
use crate::storage::{record_key, ArtifactRef, ArtifactStore, IdGenerator, RecordStore, UploadFile};

/// Per-call time limits for external collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Uploads, rendering and record writes.
    pub call_timeout: Duration,
    pub analysis_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            analysis_timeout: Duration::from_secs(300),
        }
    }
}

/// One resume submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub file: Option<UploadFile>,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
}

/// External collaborators the pipeline sequences.
#[derive(Clone)]
pub struct Collaborators {
    pub artifacts: Arc<dyn ArtifactStore>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub records: Arc<dyn RecordStore>,
    pub analysis: Arc<dyn AnalysisClient>,
    pub ids: Arc<dyn IdGenerator>,
}

/// Holds no per-submission state, so concurrent `submit` calls are independent.
pub struct IngestionPipeline {
    collaborators: Collaborators,
    options: PipelineOptions,
}

impl IngestionPipeline {
    pub fn new(collaborators: Collaborators, options: PipelineOptions) -> Self {
        Self {
            collaborators,
            options,
        }
    }

    /// Runs the full pipeline and returns the new record id.
    ///
    /// Every stage transition and the terminal failure (if any) are reported to `progress`.
    pub async fn submit(
        &self,
        request: SubmitRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<String, IngestError> {
        match self.run(request, progress).await {
            Ok(id) => Ok(id),
            Err(err) => {
                warn!("Submission failed ({:?}): {err}", err.kind());
                progress.notify(&ProgressEvent::Failed {
                    kind: err.kind(),
                    message: err.status_message().to_string(),
                });
                Err(err)
            }
        }
    }

    /// Reads a record back. Either the checkpoint or the completed state may be returned.
    pub async fn fetch(&self, id: &str) -> anyhow::Result<Option<ResumeRecord>> {
        load_record(self.collaborators.records.as_ref(), id).await
    }

    async fn run(
        &self,
        request: SubmitRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<String, IngestError> {
        // Step 1: Validate. No side effects before this passes
        progress.notify(&ProgressEvent::stage(IngestStage::Validating));
        let file = match request.file {
            None => return Err(IngestError::Validation("no file provided".to_string())),
            Some(file) if file.is_empty() => {
                return Err(IngestError::Validation(format!("{} is empty", file.name)))
            }
            Some(file) => file,
        };

        // Step 2: Store the original
        progress.notify(&ProgressEvent::stage(IngestStage::Uploading));
        let resume_artifact = self.upload(&file).await?;

        // Step 3: Derive the preview
        progress.notify(&ProgressEvent::stage(IngestStage::Converting));
        let preview = self.render_preview(&file).await?;

        // Step 4: Store the preview
        progress.notify(&ProgressEvent::stage(IngestStage::UploadingPreview));
        let preview_artifact = self.upload(&preview).await?;

        // Step 5: Allocate the id and checkpoint
        progress.notify(&ProgressEvent::stage(IngestStage::Checkpointing));
        let id = self.collaborators.ids.new_id();
        let mut record = ResumeRecord {
            id: id.clone(),
            resume_artifact,
            preview_artifact,
            company_name: request.company_name,
            job_title: request.job_title,
            job_description: request.job_description,
            feedback: FeedbackState::Pending,
            created_at: Some(Utc::now()),
        };
        self.persist(&record).await?;
        info!("Checkpointed {}", record_key(&id));

        // Step 6: Analyze
        progress.notify(&ProgressEvent::stage(IngestStage::Analyzing));
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let response = match timeout(
            self.options.analysis_timeout,
            self.collaborators
                .analysis
                .analyze(&record.resume_artifact, &instructions),
        )
        .await
        {
            Err(_) => {
                return Err(AnalysisFailure::Unavailable(format!(
                    "timed out after {}s",
                    self.options.analysis_timeout.as_secs()
                ))
                .into())
            }
            Ok(Err(e)) => return Err(AnalysisFailure::Unavailable(e.to_string()).into()),
            Ok(Ok(None)) => return Err(AnalysisFailure::NoResult.into()),
            Ok(Ok(Some(response))) => response,
        };

        // Step 7: Parse
        let feedback = parse_feedback(&response)?;
        info!(
            "Analysis for {} scored {}/100",
            record_key(&id),
            feedback.overall_score
        );

        // Step 8: Overwrite the same slot with feedback attached
        record.feedback = FeedbackState::Ready(feedback);
        self.persist(&record).await?;

        // Step 9
        progress.notify(&ProgressEvent::stage(IngestStage::Completed));
        info!("Completed {}", record_key(&id));
        Ok(id)
    }

    async fn upload(&self, file: &UploadFile) -> Result<ArtifactRef, IngestError> {
        let outcome = self
            .bounded(self.collaborators.artifacts.upload(file))
            .await;
        match outcome {
            Some(Ok(Some(artifact))) => Ok(artifact),
            Some(Ok(None)) => {
                warn!("Artifact store returned no handle for {}", file.name);
                Err(IngestError::upload_failed())
            }
            Some(Err(e)) => {
                error!("Upload of {} failed: {e:#}", file.name);
                Err(IngestError::upload_failed())
            }
            None => {
                error!("Upload of {} timed out", file.name);
                Err(IngestError::upload_failed())
            }
        }
    }

    async fn render_preview(&self, file: &UploadFile) -> Result<UploadFile, IngestError> {
        match self.bounded(self.collaborators.renderer.render(file)).await {
            Some(Ok(Some(preview))) if !preview.is_empty() => Ok(preview),
            Some(Ok(_)) => Err(IngestError::Conversion(format!(
                "no preview produced for {}",
                file.name
            ))),
            Some(Err(e)) => Err(IngestError::Conversion(format!("{e:#}"))),
            None => Err(IngestError::Conversion(format!(
                "rendering {} timed out",
                file.name
            ))),
        }
    }

    async fn persist(&self, record: &ResumeRecord) -> Result<(), IngestError> {
        match self
            .bounded(save_record(self.collaborators.records.as_ref(), record))
            .await
        {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => {
                error!("Writing {} failed: {e:#}", record_key(&record.id));
                Err(IngestError::record_write_failed())
            }
            None => {
                error!("Writing {} timed out", record_key(&record.id));
                Err(IngestError::record_write_failed())
            }
        }
    }

    /// `None` when the call exceeded `call_timeout`.
    async fn bounded<T>(&self, call: impl Future<Output = T>) -> Option<T> {
        timeout(self.options.call_timeout, call).await.ok()
    }
}
