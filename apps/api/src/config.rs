use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    /// Limit on each upload, render and record write.
    pub call_timeout: Duration,
    pub analysis_timeout: Duration,
    /// Transport attempts per analysis call. 1 means no retry.
    pub analysis_max_attempts: u32,
    pub preview_max_dimension: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            redis_url: require("REDIS_URL")?,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            s3_region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            call_timeout: Duration::from_secs(parse_or(&lookup, "CALL_TIMEOUT_SECS", 60)?),
            analysis_timeout: Duration::from_secs(parse_or(
                &lookup,
                "ANALYSIS_TIMEOUT_SECS",
                300,
            )?),
            analysis_max_attempts: parse_or(&lookup, "ANALYSIS_MAX_ATTEMPTS", 1)?,
            preview_max_dimension: parse_or(&lookup, "PREVIEW_MAX_DIMENSION", 1600)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("REDIS_URL", "redis://localhost:6379"),
        ("S3_BUCKET", "resumes"),
        ("S3_ENDPOINT", "http://localhost:9000"),
        ("AWS_ACCESS_KEY_ID", "minio"),
        ("AWS_SECRET_ACCESS_KEY", "minio123"),
        ("ANTHROPIC_API_KEY", "sk-test"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(env(REQUIRED)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.s3_region, "us-east-1");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.call_timeout, Duration::from_secs(60));
        assert_eq!(config.analysis_timeout, Duration::from_secs(300));
        assert_eq!(config.analysis_max_attempts, 1);
        assert_eq!(config.preview_max_dimension, 1600);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "3000"));
        pairs.push(("ANALYSIS_TIMEOUT_SECS", "30"));
        pairs.push(("ANALYSIS_MAX_ATTEMPTS", "3"));
        let config = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.analysis_timeout, Duration::from_secs(30));
        assert_eq!(config.analysis_max_attempts, 3);
    }

    #[test]
    fn test_missing_required_variable() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "S3_BUCKET")
            .collect();
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("S3_BUCKET"));
    }

    #[test]
    fn test_invalid_number() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
