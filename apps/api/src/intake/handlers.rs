use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::intake::pipeline::SubmitRequest;
use crate::intake::progress::LogObserver;
use crate::models::resume::ResumeRecord;
use crate::state::AppState;
use crate::storage::UploadFile;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
}

/// POST /api/v1/resumes
///
/// Multipart fields: `file` (required), `company-name`, `job-title`, `job-description`.
pub async fn handle_submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let mut request = SubmitRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                request.file = Some(UploadFile::new(file_name, content_type, bytes));
            }
            "company-name" => request.company_name = read_text(field).await?,
            "job-title" => request.job_title = read_text(field).await?,
            "job-description" => request.job_description = read_text(field).await?,
            other => tracing::debug!("Ignoring unknown multipart field '{other}'"),
        }
    }

    let id = state.pipeline.submit(request, &LogObserver).await?;
    Ok((StatusCode::CREATED, Json(SubmitResponse { id })))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    let record = state
        .pipeline
        .fetch(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("resume {id}")))?;
    Ok(Json(record))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::intake::pipeline::{Collaborators, IngestionPipeline, PipelineOptions};
    use crate::routes::build_router;
    use crate::state::AppState;
    use crate::testing::{
        MemoryArtifactStore, MemoryRecordStore, Outcome, ScriptedAnalysis, SequentialIds,
        StaticRenderer,
    };

    use super::*;

    const BOUNDARY: &str = "X-INTAKE-BOUNDARY";

    fn app(analysis: ScriptedAnalysis) -> Router {
        let pipeline = IngestionPipeline::new(
            Collaborators {
                artifacts: Arc::new(MemoryArtifactStore::default()),
                renderer: Arc::new(StaticRenderer::new(Outcome::Ok)),
                records: Arc::new(MemoryRecordStore::default()),
                analysis: Arc::new(analysis),
                ids: Arc::new(SequentialIds::default()),
            },
            PipelineOptions::default(),
        );
        build_router(
            AppState {
                pipeline: Arc::new(pipeline),
            },
            1024 * 1024,
        )
    }

    fn multipart_body(with_file: bool) -> String {
        let mut body = String::new();
        for (name, value) in [
            ("company-name", "Acme"),
            ("job-title", "Engineer"),
            ("job-description", "Build things"),
        ] {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        if with_file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.7 fake\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn submit(with_file: bool) -> Request<Body> {
        Request::post("/api/v1/resumes")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(with_file)))
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(ScriptedAnalysis::absent())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_submit_then_fetch() {
        let app = app(ScriptedAnalysis::text(r#"{"overallScore":82}"#));

        let response = app.clone().oneshot(submit(true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json(response).await["id"].as_str().unwrap().to_string();
        assert_eq!(id, "id-1");

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/resumes/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["companyName"], "Acme");
        assert_eq!(body["jobTitle"], "Engineer");
        assert_eq!(body["feedback"]["overallScore"], 82.0);
    }

    #[tokio::test]
    async fn test_submit_without_file_is_bad_request() {
        let response = app(ScriptedAnalysis::absent())
            .oneshot(submit(false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_failed_analysis_is_bad_gateway() {
        let response = app(ScriptedAnalysis::absent())
            .oneshot(submit(true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            json(response).await["error"]["message"],
            "Error: Failed to analyze resume"
        );
    }

    #[tokio::test]
    async fn test_unknown_resume_is_not_found() {
        let response = app(ScriptedAnalysis::absent())
            .oneshot(
                Request::get("/api/v1/resumes/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
