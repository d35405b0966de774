use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use tracing::{debug, info};

use crate::storage::{artifact_key, ArtifactRef, ArtifactStore, UploadFile};

/// Artifact store backed by S3 (MinIO locally).
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Creates the bucket if it does not exist yet. An existing bucket is not an error.
    pub async fn ensure_bucket(&self, region: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(region);
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!("Created bucket {}", self.bucket);
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .map(|se| se.is_bucket_already_exists() || se.is_bucket_already_owned_by_you())
                    == Some(true) =>
            {
                debug!("Bucket {} already exists", self.bucket);
                Ok(())
            }
            Err(err) => Err(anyhow::anyhow!(
                "Failed to create bucket {}: {err}",
                self.bucket
            )),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(&self, file: &UploadFile) -> Result<Option<ArtifactRef>> {
        let key = artifact_key(&file.name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.to_vec()))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!(
            "Uploaded {} ({} bytes) to s3://{}/{}",
            file.name,
            file.bytes.len(),
            self.bucket,
            key
        );
        Ok(Some(ArtifactRef::new(key)))
    }

    async fn fetch(&self, artifact: &ArtifactRef) -> Result<Option<Bytes>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(artifact.as_str())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if err.as_service_error().map(|se| se.is_no_such_key()) == Some(true) => {
                return Ok(None);
            }
            Err(err) => return Err(anyhow::anyhow!("S3 download failed: {err}")),
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| anyhow::anyhow!("S3 body read failed: {e}"))?;
        Ok(Some(body.into_bytes()))
    }
}
