//! Job status tracking
//!
//! [`InMemoryJobTracker`] keeps the latest record plus every applied update
//! per job. Jobs are created on first update, in `Pending`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::job::{JobRecord, JobStateMachine, JobUpdate};

/// External job status store
#[async_trait]
pub trait JobTracker: Send + Sync {
    async fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<()>;

    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>>;
}

struct TrackedJob {
    machine: JobStateMachine,
    history: Vec<JobUpdate>,
}

#[derive(Clone, Default)]
pub struct InMemoryJobTracker {
    jobs: Arc<DashMap<String, TrackedJob>>,
}

impl InMemoryJobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates applied to a job, oldest first
    pub fn history(&self, job_id: &str) -> Vec<JobUpdate> {
        self.jobs
            .get(job_id)
            .map(|job| job.history.clone())
            .unwrap_or_default()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

#[async_trait]
impl JobTracker for InMemoryJobTracker {
    async fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<()> {
        let mut job = self.jobs.entry(job_id.to_string()).or_insert_with(|| TrackedJob {
            machine: JobStateMachine::new(JobRecord::new_pending(job_id)),
            history: Vec::new(),
        });

        job.machine.apply(update.clone())?;
        debug!(job_id, status = %update.status, "Job updated");
        job.history.push(update);
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.jobs.get(job_id).map(|job| job.machine.record().clone()))
    }
}

/// Latest record or [`EtlError::JobNotFound`]
pub async fn require_job(tracker: &dyn JobTracker, job_id: &str) -> Result<JobRecord> {
    tracker
        .get_job(job_id)
        .await?
        .ok_or_else(|| EtlError::JobNotFound(job_id.to_string()))
}
