//! Progress events for the task-queue boundary.
//!
//! The ingestor emits `ProgressUpdate`s through a `tokio::sync::broadcast`
//! channel; the CLI, socket clients, or the job runner subscribe
//! independently. When nobody listens, events are silently dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Coarse milestones of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    Init,
    Discover,
    Render,
    Extract,
    Classify,
    Done,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Discover => "discover",
            Self::Render => "render",
            Self::Extract => "extract",
            Self::Classify => "classify",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// One progress update, the sole coupling to the surrounding task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// The ingestion run this update belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number within the run.
    pub seq: u64,
    pub stage: IngestStage,
    pub percentage: u8,
    pub current: u32,
    pub total: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_result: Option<serde_json::Value>,
}

pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressUpdate>;
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressUpdate>;

/// Create a progress channel. 64 events is plenty for one run's coarse
/// milestones.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(64)
}

/// Emitter handle owned by the ingestor. Send errors (no receivers) are
/// ignored — progress costs nothing when nobody is watching.
pub struct ProgressReporter {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: AtomicU64,
}

impl ProgressReporter {
    pub fn new(tx: Option<ProgressSender>) -> Self {
        Self {
            tx,
            run_id: uuid::Uuid::new_v4().to_string(),
            seq: AtomicU64::new(0),
        }
    }

    /// A reporter that drops everything.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn update(
        &self,
        stage: IngestStage,
        percentage: u8,
        current: u32,
        total: u32,
        message: impl Into<String>,
    ) {
        self.send(stage, percentage, current, total, message.into(), None);
    }

    /// Like `update`, carrying a partial-result payload for live previews.
    pub fn update_with_partial(
        &self,
        stage: IngestStage,
        percentage: u8,
        current: u32,
        total: u32,
        message: impl Into<String>,
        partial_result: serde_json::Value,
    ) {
        self.send(
            stage,
            percentage,
            current,
            total,
            message.into(),
            Some(partial_result),
        );
    }

    fn send(
        &self,
        stage: IngestStage,
        percentage: u8,
        current: u32,
        total: u32,
        message: String,
        partial_result: Option<serde_json::Value>,
    ) {
        let Some(tx) = &self.tx else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = tx.send(ProgressUpdate {
            run_id: self.run_id.clone(),
            seq,
            stage,
            percentage: percentage.min(100),
            current,
            total,
            message,
            partial_result,
        });
    }
}
