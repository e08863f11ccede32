use crate::job::EtlStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest error message kept in a checkpoint
const MAX_ERROR_CHARS: usize = 512;

/// Bounded description of what a stage attempt produced
///
/// Only counts are kept; the stage payload itself never goes into a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    /// What the count refers to ("queries", "documents", "embeddings", ...)
    pub kind: String,
    pub item_count: usize,
    /// Secondary count, e.g. successful queries out of `item_count`
    pub success_count: Option<usize>,
}

impl CheckpointSummary {
    pub fn count(kind: impl Into<String>, item_count: usize) -> Self {
        Self {
            kind: kind.into(),
            item_count,
            success_count: None,
        }
    }

    pub fn with_successes(mut self, success_count: usize) -> Self {
        self.success_count = Some(success_count);
        self
    }

    pub fn empty() -> Self {
        Self::count("none", 0)
    }
}

/// Immutable record of one stage attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCheckpoint {
    pub id: Uuid,
    pub stage: EtlStage,
    /// 1-based attempt number within the stage
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub succeeded: bool,
    pub duration_seconds: f64,
    pub summary: CheckpointSummary,
    pub error_message: Option<String>,
}

impl StageCheckpoint {
    pub fn success(
        stage: EtlStage,
        attempt: u32,
        duration_seconds: f64,
        summary: CheckpointSummary,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage,
            attempt,
            timestamp: Utc::now(),
            succeeded: true,
            duration_seconds,
            summary,
            error_message: None,
        }
    }

    pub fn failure(
        stage: EtlStage,
        attempt: u32,
        duration_seconds: f64,
        error_message: impl Into<String>,
    ) -> Self {
        let mut message: String = error_message.into();
        if message.chars().count() > MAX_ERROR_CHARS {
            message = message.chars().take(MAX_ERROR_CHARS).collect();
        }
        Self {
            id: Uuid::new_v4(),
            stage,
            attempt,
            timestamp: Utc::now(),
            succeeded: false,
            duration_seconds,
            summary: CheckpointSummary::empty(),
            error_message: Some(message),
        }
    }
}

/// Append-only checkpoint list owned by one job run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckpointLog {
    entries: Vec<StageCheckpoint>,
}

impl CheckpointLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, checkpoint: StageCheckpoint) {
        self.entries.push(checkpoint);
    }

    pub fn entries(&self) -> &[StageCheckpoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checkpoints recorded for one stage, in attempt order
    pub fn for_stage(&self, stage: EtlStage) -> impl Iterator<Item = &StageCheckpoint> {
        self.entries.iter().filter(move |cp| cp.stage == stage)
    }

    pub fn last(&self) -> Option<&StageCheckpoint> {
        self.entries.last()
    }
}
