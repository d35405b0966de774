use anyhow::{Context, Result};

use crate::models::resume::ResumeRecord;
use crate::storage::{record_key, RecordStore};

/// Writes `record` to its canonical slot, replacing whatever was there.
pub async fn save_record(records: &dyn RecordStore, record: &ResumeRecord) -> Result<()> {
    let value = serde_json::to_string(record)
        .with_context(|| format!("Failed to serialize record {}", record.id))?;
    records.set(&record_key(&record.id), value).await
}

/// Reads the record for `id` in whatever state it was last written.
pub async fn load_record(records: &dyn RecordStore, id: &str) -> Result<Option<ResumeRecord>> {
    let Some(raw) = records.get(&record_key(id)).await? else {
        return Ok(None);
    };
    let record = serde_json::from_str(&raw)
        .with_context(|| format!("Stored record {id} is not a valid resume record"))?;
    Ok(Some(record))
}
