//! In-memory collaborators for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;

use crate::analysis::{AnalysisClient, AnalysisResponse};
use crate::render::DocumentRenderer;
use crate::storage::{
    artifact_key, ArtifactRef, ArtifactStore, IdGenerator, RecordStore, UploadFile,
};

/// What a scripted collaborator does on a given call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok,
    Absent,
    Fail,
}

#[derive(Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, Bytes>>,
    calls: AtomicUsize,
    /// 1-based upload call index -> outcome; unlisted calls succeed.
    script: HashMap<usize, Outcome>,
    delay: Option<Duration>,
}

impl MemoryArtifactStore {
    pub fn scripted(script: impl IntoIterator<Item = (usize, Outcome)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn always(outcome: Outcome) -> Self {
        Self::scripted((1..=8).map(|n| (n, outcome.clone())))
    }

    /// Every upload sleeps for `delay` first.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, file: &UploadFile) -> Result<Option<ArtifactRef>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.get(&call).cloned().unwrap_or(Outcome::Ok) {
            Outcome::Ok => {
                let key = artifact_key(&file.name);
                self.objects
                    .lock()
                    .unwrap()
                    .insert(key.clone(), file.bytes.clone());
                Ok(Some(ArtifactRef::new(key)))
            }
            Outcome::Absent => Ok(None),
            Outcome::Fail => Err(anyhow!("blob store unreachable")),
        }
    }

    async fn fetch(&self, artifact: &ArtifactRef) -> Result<Option<Bytes>> {
        Ok(self.objects.lock().unwrap().get(artifact.as_str()).cloned())
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    /// 1-based write attempt from which every `set` fails.
    fail_from: Option<usize>,
    delay: Option<Duration>,
}

impl MemoryRecordStore {
    pub fn failing_writes() -> Self {
        Self::failing_from(1)
    }

    pub fn failing_from(attempt: usize) -> Self {
        Self {
            fail_from: Some(attempt),
            ..Default::default()
        }
    }

    /// Every `set` sleeps for `delay` first.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `set` in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn set(&self, key: &str, value: String) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_from.is_some_and(|from| attempt >= from) {
            return Err(anyhow!("record store unreachable"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }
}

/// Renderer that returns a fixed PNG-named file without looking at the input.
pub struct StaticRenderer {
    outcome: Outcome,
    delay: Option<Duration>,
}

impl StaticRenderer {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl DocumentRenderer for StaticRenderer {
    async fn render(&self, file: &UploadFile) -> Result<Option<UploadFile>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.outcome {
            Outcome::Ok => Ok(Some(UploadFile::new(
                crate::render::preview_name(&file.name),
                crate::render::PREVIEW_CONTENT_TYPE,
                Bytes::from_static(b"\x89PNG preview"),
            ))),
            Outcome::Absent => Ok(None),
            Outcome::Fail => Err(anyhow!("corrupt document")),
        }
    }
}

/// Analysis fake returning a canned response, optionally after a delay.
pub struct ScriptedAnalysis {
    response: Option<AnalysisResponse>,
    fail: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<(ArtifactRef, String)>>,
}

impl ScriptedAnalysis {
    pub fn returning(response: AnalysisResponse) -> Self {
        Self {
            response: Some(response),
            fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::returning(AnalysisResponse::text(text))
    }

    pub fn absent() -> Self {
        Self {
            response: None,
            fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::absent()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(ArtifactRef, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedAnalysis {
    async fn analyze(
        &self,
        document: &ArtifactRef,
        instructions: &str,
    ) -> Result<Option<AnalysisResponse>> {
        self.calls
            .lock()
            .unwrap()
            .push((document.clone(), instructions.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(anyhow!("inference backend unreachable"));
        }
        Ok(self.response.clone())
    }
}

/// Deterministic ids: `id-1`, `id-2`, ...
#[derive(Default)]
pub struct SequentialIds {
    next: AtomicUsize,
}

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
