use crate::error::{EtlError, Result};
use crate::failure::ErrorType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtlStage {
    Initialization,
    QueryExecution,
    DataValidation,
    DocumentTransformation,
    EmbeddingGeneration,
    DocumentStorage,
    Completion,
}

impl EtlStage {
    pub const ALL: [EtlStage; 7] = [
        EtlStage::Initialization,
        EtlStage::QueryExecution,
        EtlStage::DataValidation,
        EtlStage::DocumentTransformation,
        EtlStage::EmbeddingGeneration,
        EtlStage::DocumentStorage,
        EtlStage::Completion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EtlStage::Initialization => "initialization",
            EtlStage::QueryExecution => "query_execution",
            EtlStage::DataValidation => "data_validation",
            EtlStage::DocumentTransformation => "document_transformation",
            EtlStage::EmbeddingGeneration => "embedding_generation",
            EtlStage::DocumentStorage => "document_storage",
            EtlStage::Completion => "completion",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        EtlStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| EtlError::parse(format!("Invalid stage: {}", s)))
    }

    /// Zero-based position in the pipeline
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// Progress reported to the job tracker when the stage starts
    pub fn progress_percentage(&self) -> f64 {
        match self {
            EtlStage::Initialization => 5.0,
            EtlStage::QueryExecution => 20.0,
            EtlStage::DataValidation => 35.0,
            EtlStage::DocumentTransformation => 50.0,
            EtlStage::EmbeddingGeneration => 70.0,
            EtlStage::DocumentStorage => 90.0,
            EtlStage::Completion => 100.0,
        }
    }

    /// Human-readable step shown by the job tracker
    pub fn step_message(&self) -> &'static str {
        match self {
            EtlStage::Initialization => "Initializing processing",
            EtlStage::QueryExecution => "Executing legacy queries",
            EtlStage::DataValidation => "Validating query results",
            EtlStage::DocumentTransformation => "Transforming documents",
            EtlStage::EmbeddingGeneration => "Generating embeddings",
            EtlStage::DocumentStorage => "Storing documents",
            EtlStage::Completion => "Completing processing",
        }
    }
}

impl std::fmt::Display for EtlStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Externally visible job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Success,
    Failure,
    Partial,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Success => "success",
            JobStatus::Failure => "failure",
            JobStatus::Partial => "partial",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "success" => Ok(JobStatus::Success),
            "failure" => Ok(JobStatus::Failure),
            "partial" => Ok(JobStatus::Partial),
            _ => Err(EtlError::parse(format!("Invalid job status: {}", s))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Partial)
    }

    fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failure)
                | (Processing, Processing)
                | (Processing, Success)
                | (Processing, Failure)
                | (Failure, Failure)
                | (Failure, Partial)
                | (Failure, Processing)
                | (Partial, Processing)
        )
    }

    /// A processing update on a failed or partial job starts a new run
    fn is_restart(&self, next: JobStatus) -> bool {
        matches!(self, JobStatus::Failure | JobStatus::Partial) && next == JobStatus::Processing
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input to one orchestration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: String,
    pub user_id: Uuid,
    pub test_sequence_id: i64,
}

impl JobDescriptor {
    pub fn new(job_id: impl Into<String>, user_id: Uuid, test_sequence_id: i64) -> Self {
        Self {
            job_id: job_id.into(),
            user_id,
            test_sequence_id,
        }
    }

    /// Descriptor with a generated job id
    pub fn generated(user_id: Uuid, test_sequence_id: i64) -> Self {
        Self::new(Uuid::new_v4().to_string(), user_id, test_sequence_id)
    }
}

/// A partial update sent to the job tracker
///
/// `None` fields leave the tracked value unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub progress_percentage: Option<f64>,
    pub current_step: Option<String>,
    pub completed_steps: Option<usize>,
    pub error_message: Option<String>,
    pub error_type: Option<ErrorType>,
    pub failed_stage: Option<EtlStage>,
    pub documents_created: Option<Vec<String>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            progress_percentage: None,
            current_step: None,
            completed_steps: None,
            error_message: None,
            error_type: None,
            failed_stage: None,
            documents_created: None,
            completed_at: None,
        }
    }

    /// Progress report at the start of a stage
    pub fn stage_started(stage: EtlStage) -> Self {
        Self {
            progress_percentage: Some(stage.progress_percentage()),
            current_step: Some(stage.step_message().to_string()),
            completed_steps: Some(stage.ordinal() + 1),
            ..Self::with_status(JobStatus::Processing)
        }
    }

    pub fn success(document_types: Vec<String>) -> Self {
        Self {
            progress_percentage: Some(100.0),
            current_step: Some("Completed".to_string()),
            completed_steps: Some(EtlStage::ALL.len()),
            documents_created: Some(document_types),
            completed_at: Some(Utc::now()),
            ..Self::with_status(JobStatus::Success)
        }
    }

    pub fn failure(
        error_message: impl Into<String>,
        error_type: ErrorType,
        failed_stage: Option<EtlStage>,
    ) -> Self {
        Self {
            error_message: Some(error_message.into()),
            error_type: Some(error_type),
            failed_stage,
            completed_at: Some(Utc::now()),
            ..Self::with_status(JobStatus::Failure)
        }
    }

    pub fn partial(documents_kept: Vec<String>) -> Self {
        Self {
            documents_created: Some(documents_kept),
            ..Self::with_status(JobStatus::Partial)
        }
    }
}

/// Latest tracked state of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub progress_percentage: f64,
    pub current_step: Option<String>,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub error_message: Option<String>,
    pub error_type: Option<ErrorType>,
    pub failed_stage: Option<EtlStage>,
    pub documents_created: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new_pending(job_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            progress_percentage: 0.0,
            current_step: None,
            completed_steps: 0,
            total_steps: EtlStage::ALL.len(),
            error_message: None,
            error_type: None,
            failed_stage: None,
            documents_created: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// Job state machine for transitions
pub struct JobStateMachine {
    record: JobRecord,
}

impl JobStateMachine {
    pub fn new(record: JobRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    pub fn into_record(self) -> JobRecord {
        self.record
    }

    /// Apply an update, rejecting illegal status transitions
    pub fn apply(&mut self, update: JobUpdate) -> Result<()> {
        if !self.record.status.can_transition_to(update.status) {
            return Err(EtlError::InvalidStateTransition {
                from: self.record.status.to_string(),
                to: update.status.to_string(),
            });
        }

        let r = &mut self.record;
        if r.status.is_restart(update.status) {
            r.error_message = None;
            r.error_type = None;
            r.failed_stage = None;
            r.completed_at = None;
            r.documents_created.clear();
        }
        r.status = update.status;
        if let Some(p) = update.progress_percentage {
            r.progress_percentage = p;
        }
        if let Some(step) = update.current_step {
            r.current_step = Some(step);
        }
        if let Some(n) = update.completed_steps {
            r.completed_steps = n;
        }
        if let Some(msg) = update.error_message {
            r.error_message = Some(msg);
        }
        if let Some(t) = update.error_type {
            r.error_type = Some(t);
        }
        if let Some(stage) = update.failed_stage {
            r.failed_stage = Some(stage);
        }
        if let Some(docs) = update.documents_created {
            r.documents_created = docs;
        }
        if let Some(at) = update.completed_at {
            r.completed_at = Some(at);
        }
        r.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_roundtrip_and_order() {
        for (i, stage) in EtlStage::ALL.iter().enumerate() {
            assert_eq!(EtlStage::from_str(stage.as_str()).unwrap(), *stage);
            assert_eq!(stage.ordinal(), i);
        }
        assert!(EtlStage::from_str("bogus").is_err());
    }

    #[test]
    fn test_stage_progress_is_monotonic() {
        let progress: Vec<f64> = EtlStage::ALL
            .iter()
            .map(|s| s.progress_percentage())
            .collect();
        assert_eq!(progress, vec![5.0, 20.0, 35.0, 50.0, 70.0, 90.0, 100.0]);
    }

    #[test]
    fn test_job_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Success,
            JobStatus::Failure,
            JobStatus::Partial,
        ] {
            assert_eq!(JobStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut sm = JobStateMachine::new(JobRecord::new_pending("job-1"));

        for stage in EtlStage::ALL {
            sm.apply(JobUpdate::stage_started(stage)).unwrap();
        }
        assert_eq!(sm.record().completed_steps, 7);

        sm.apply(JobUpdate::success(vec!["PERSONALITY_PROFILE".into()]))
            .unwrap();
        let record = sm.into_record();
        assert_eq!(record.status, JobStatus::Success);
        assert_eq!(record.progress_percentage, 100.0);
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_failure_then_partial() {
        let mut sm = JobStateMachine::new(JobRecord::new_pending("job-2"));
        sm.apply(JobUpdate::stage_started(EtlStage::Initialization))
            .unwrap();
        sm.apply(JobUpdate::failure(
            "boom",
            ErrorType::DatabaseError,
            Some(EtlStage::Completion),
        ))
        .unwrap();
        sm.apply(JobUpdate::partial(vec!["THINKING_SKILLS".into()]))
            .unwrap();

        let record = sm.record();
        assert_eq!(record.status, JobStatus::Partial);
        assert_eq!(record.failed_stage, Some(EtlStage::Completion));
        assert_eq!(record.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failed_job_can_run_again() {
        let mut sm = JobStateMachine::new(JobRecord::new_pending("job-4"));
        sm.apply(JobUpdate::stage_started(EtlStage::Initialization))
            .unwrap();
        sm.apply(JobUpdate::failure(
            "no thinking skills",
            ErrorType::ValidationError,
            Some(EtlStage::DocumentTransformation),
        ))
        .unwrap();

        sm.apply(JobUpdate::stage_started(EtlStage::Initialization))
            .unwrap();
        let record = sm.record();
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.error_message, None);
        assert_eq!(record.failed_stage, None);
        assert!(record.completed_at.is_none());

        sm.apply(JobUpdate::failure("again", ErrorType::TrackerError, Some(EtlStage::Completion)))
            .unwrap();
        sm.apply(JobUpdate::partial(vec!["THINKING_SKILLS".into()]))
            .unwrap();
        sm.apply(JobUpdate::stage_started(EtlStage::Initialization))
            .unwrap();
        assert!(sm.record().documents_created.is_empty());
    }

    #[test]
    fn test_invalid_transition_from_success() {
        let mut sm = JobStateMachine::new(JobRecord::new_pending("job-3"));
        sm.apply(JobUpdate::stage_started(EtlStage::Initialization))
            .unwrap();
        sm.apply(JobUpdate::success(vec![])).unwrap();

        let result = sm.apply(JobUpdate::stage_started(EtlStage::Initialization));
        match result {
            Err(EtlError::InvalidStateTransition { from, to }) => {
                assert_eq!(from, "success");
                assert_eq!(to, "processing");
            }
            _ => panic!("Expected InvalidStateTransition error"),
        }
    }
}
