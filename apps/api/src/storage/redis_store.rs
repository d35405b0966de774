use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::storage::RecordStore;

/// Record store backed by Redis string keys.
#[derive(Clone)]
pub struct RedisRecordStore {
    conn: MultiplexedConnection,
}

impl RedisRecordStore {
    pub async fn connect(client: &redis::Client) -> Result<Self> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        info!("Redis connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .with_context(|| format!("Redis SET {key} failed"))?;
        debug!("Redis SET {key}");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("Redis GET {key} failed"))?;
        Ok(value)
    }
}
