//! Capability interfaces for the external stores the pipeline writes to.
//!
//! Every call may fail (`Err`) or report absence without failing (`Ok(None)`).
//! Callers must check both.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod redis_store;
pub mod s3_store;

pub use redis_store::RedisRecordStore;
pub use s3_store::S3ArtifactStore;

/// Prefix of the canonical record key. Both the checkpoint and the final write use it.
pub const RECORD_KEY_PREFIX: &str = "resume_";

/// The one key under which a record lives for its whole lifecycle.
pub fn record_key(id: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// A file handed to the pipeline or produced by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Stable path of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blob store for original documents and preview images.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<Option<ArtifactRef>>;

    async fn fetch(&self, artifact: &ArtifactRef) -> Result<Option<Bytes>>;
}

/// String key-value store holding serialized records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Source of record identifiers. Output must be unique and safe as a key suffix.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Builds the object key for a newly uploaded artifact: `uploads/<uuid>/<name>`.
pub fn artifact_key(file_name: &str) -> String {
    format!("uploads/{}/{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_format() {
        assert_eq!(record_key("1234"), "resume_1234");
    }

    #[test]
    fn test_uuid_generator_is_unique_and_key_safe() {
        let ids = UuidGenerator;
        let a = ids.new_id();
        let b = ids.new_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() || c == '-'));
    }

    #[test]
    fn test_artifact_key_layout() {
        let key = artifact_key("My Resume (final).pdf");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("/My_Resume__final_.pdf"));
        assert_eq!(key.split('/').count(), 3);
    }

    #[test]
    fn test_sanitize_strips_directories_and_dotfiles() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }
}
