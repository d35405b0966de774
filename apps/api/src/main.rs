use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use intake::analysis::LlmAnalysisClient;
use intake::config::Config;
use intake::intake::{Collaborators, IngestionPipeline, PipelineOptions};
use intake::llm_client::{self, LlmClient};
use intake::render::PdfPreviewRenderer;
use intake::routes::build_router;
use intake::state::AppState;
use intake::storage::{ArtifactStore, RedisRecordStore, S3ArtifactStore, UuidGenerator};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Intake API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let records = RedisRecordStore::connect(&redis).await?;
    info!("Redis record store connected");

    // Initialize S3 / MinIO
    let s3 = S3ArtifactStore::new(build_s3_client(&config).await, config.s3_bucket.clone());
    s3.ensure_bucket(&config.s3_region).await?;
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(s3);
    info!("S3 artifact store ready (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.analysis_timeout,
        config.analysis_max_attempts,
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let pipeline = IngestionPipeline::new(
        Collaborators {
            artifacts: artifacts.clone(),
            renderer: Arc::new(PdfPreviewRenderer::new(config.preview_max_dimension)),
            records: Arc::new(records),
            analysis: Arc::new(LlmAnalysisClient::new(llm, artifacts)),
            ids: Arc::new(UuidGenerator),
        },
        PipelineOptions {
            call_timeout: config.call_timeout,
            analysis_timeout: config.analysis_timeout,
        },
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = build_router(state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "intake-static",
    );

    let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets under the path, not a subdomain
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
