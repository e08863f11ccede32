//! Shared fixtures and collaborator doubles for integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assessment_etl::{
    AdminNotifier, AssessmentTransformer, CriticalFailure, EmbeddedDocument, EmbeddingService,
    EtlConfig, EtlError, EtlServices, InMemoryJobTracker, JobRecord, JobStatus, JobTracker,
    JobUpdate, LegacyDataSource, Result, Row, TransformedDocument,
};
use assessment_etl::query::{is_critical, QueryKind, RESERVED_QUERIES};
use assessment_storage::{
    DocumentId, DocumentRef, DocumentStore, DocumentTransaction, DocumentType, InMemoryStore,
    NewDocument, StoredDocument, StorageError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

pub fn rows(v: Value) -> Vec<Row> {
    v.as_array()
        .map(|items| items.iter().filter_map(|r| r.as_object().cloned()).collect())
        .unwrap_or_default()
}

/// Valid legacy rows for every implemented query
pub fn fixture_rows(kind: QueryKind) -> Vec<Row> {
    let v = match kind {
        QueryKind::Tendency => json!([{"Tnd1": "Creative", "Tnd2": "Analytic"}]),
        QueryKind::TopTendency => json!([
            {"rank": 1, "tendency_name": "Creative type", "code": "T01", "score": 92},
            {"rank": 2, "tendency_name": "Analytic type", "code": "T02", "score": 85},
            {"rank": 3, "tendency_name": "Social type", "code": "T03", "score": 71}
        ]),
        QueryKind::BottomTendency => json!([
            {"rank": 1, "tendency_name": "Routine type", "code": "T09", "score": 22}
        ]),
        QueryKind::ThinkingSkills => json!([
            {"skill_name": "Logic", "score": 88, "percentile": 91},
            {"skill_name": "Memory", "score": 64, "percentile": 55},
            {"skill_name": "Spatial", "score": 72, "percentile": 70}
        ]),
        QueryKind::CareerRecommendation => json!([
            {"job_code": "J100", "job_name": "Product designer", "match_score": 93},
            {"job_code": "J200", "job_name": "Data analyst", "match_score": 87}
        ]),
        QueryKind::PersonalityDetail => json!([
            {"detail_description": "Enjoys new ideas", "rank": 1, "weight": 3, "code": "T01"}
        ]),
        QueryKind::StrengthsWeaknesses => json!([
            {"description": "Original thinking", "type": "strength", "weight": 5},
            {"description": "Dislikes repetition", "type": "weakness", "weight": 2}
        ]),
        QueryKind::LearningStyle => json!([{
            "tnd1_name": "Explorer", "tnd1_study_tendency": "Learns by trying things out.",
            "tnd1_study_way": "Project-based study.",
            "tnd2_name": "Analyst", "tnd2_study_tendency": "Learns by structure.",
            "tnd2_study_way": "Outlines and summaries.",
            "tnd_row": 2, "tnd_col": 3
        }]),
        QueryKind::LearningStyleChart => json!([
            {"item_name": "Self-directed", "item_rate": 70, "item_color": "#3366ff", "item_type": "S"},
            {"item_name": "Group study", "item_rate": 40, "item_color": "#ff9933", "item_type": "W"}
        ]),
        QueryKind::CompetencyAnalysis => json!([
            {"competency_name": "Creativity", "score": 90, "rank": 1,
             "description": "Generates ideas", "percentile": 95},
            {"competency_name": "Planning", "score": 75, "rank": 2,
             "description": "Organises work", "percentile": 80}
        ]),
        QueryKind::CompetencySubjects => json!([
            {"competency_rank": 1, "competency_name": "Creativity", "subject_group": "Arts",
             "subject_area": "Design", "subject_name": "Visual design",
             "subject_explain": "Composition and colour", "subject_rank": 1}
        ]),
        QueryKind::CompetencyJobs => json!([
            {"jo_name": "Illustrator", "jo_outline": "Draws", "jo_mainbusiness": "Illustration", "rank": 1}
        ]),
        QueryKind::CompetencyJobMajors => json!([
            {"jo_name": "Illustrator", "major": "Fine arts"}
        ]),
        QueryKind::Duties => json!([
            {"du_name": "UX research", "du_content": "Interviews users", "majors": "Psychology",
             "jf_name": "Design", "match_rate": 81}
        ]),
        QueryKind::ImagePreferenceStats => json!([
            {"total_image_count": 120, "response_count": 118, "response_rate": 98}
        ]),
        QueryKind::PreferenceData => json!([
            {"preference_name": "Nature", "question_count": 12, "response_rate": 75,
             "rank": 1, "description": "Prefers outdoor imagery"}
        ]),
        QueryKind::PreferenceJobs => json!([
            {"preference_name": "Nature", "preference_type": "rimg1", "jo_name": "Park ranger",
             "jo_outline": "Protects parks", "jo_mainbusiness": "Patrol", "majors": "Forestry"}
        ]),
    };
    rows(v)
}

/// Legacy source serving [`fixture_rows`]; selected queries can be made to fail
#[derive(Default)]
pub struct FixtureSource {
    pub failing: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FixtureSource {
    pub fn failing<I: IntoIterator<Item = S>, S: Into<String>>(names: I) -> Self {
        Self {
            failing: names.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LegacyDataSource for FixtureSource {
    async fn fetch(&self, query_name: &str, _test_sequence_id: i64) -> Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(query_name) {
            return Err(EtlError::query_execution(query_name, "connection reset"));
        }
        match QueryKind::from_name(query_name) {
            Some(kind) => Ok(fixture_rows(kind)),
            None if RESERVED_QUERIES.contains(&query_name) => Ok(Vec::new()),
            None => Err(EtlError::UnknownQuery(query_name.to_string())),
        }
    }
}

/// Embeds every document with a constant vector of `dimension`
pub struct FixedEmbedder {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingService for FixedEmbedder {
    async fn embed_batch(&self, documents: Vec<TransformedDocument>) -> Result<Vec<EmbeddedDocument>> {
        Ok(documents
            .into_iter()
            .map(|d| d.with_embedding(vec![0.25; self.dimension]))
            .collect())
    }
}

/// Embedding service that is always unavailable
pub struct DownEmbedder;

#[async_trait]
impl EmbeddingService for DownEmbedder {
    async fn embed_batch(&self, _documents: Vec<TransformedDocument>) -> Result<Vec<EmbeddedDocument>> {
        Err(EtlError::embedding("connection refused"))
    }
}

/// Document store whose transactions fail on the `fail_on`-th upsert
#[derive(Clone)]
pub struct FlakyDocumentStore {
    pub inner: InMemoryStore,
    pub fail_on: usize,
    pub upserts: Arc<AtomicUsize>,
    failures_left: Arc<AtomicUsize>,
}

impl FlakyDocumentStore {
    pub fn new(inner: InMemoryStore, fail_on: usize) -> Self {
        Self::failing_times(inner, fail_on, usize::MAX)
    }

    /// Only the first `times` transactions fail
    pub fn failing_times(inner: InMemoryStore, fail_on: usize, times: usize) -> Self {
        Self {
            inner,
            fail_on,
            upserts: Arc::new(AtomicUsize::new(0)),
            failures_left: Arc::new(AtomicUsize::new(times)),
        }
    }
}

struct FlakyTransaction {
    inner: Box<dyn DocumentTransaction>,
    fail_on: usize,
    seen: usize,
    upserts: Arc<AtomicUsize>,
    failures_left: Arc<AtomicUsize>,
}

#[async_trait]
impl DocumentTransaction for FlakyTransaction {
    async fn upsert(&mut self, doc: NewDocument) -> assessment_storage::Result<()> {
        self.seen += 1;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.seen == self.fail_on
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(StorageError::database("disk I/O error"));
        }
        self.inner.upsert(doc).await
    }

    async fn commit(self: Box<Self>) -> assessment_storage::Result<Vec<DocumentRef>> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> assessment_storage::Result<()> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl DocumentStore for FlakyDocumentStore {
    async fn begin(&self) -> assessment_storage::Result<Box<dyn DocumentTransaction>> {
        Ok(Box::new(FlakyTransaction {
            inner: self.inner.begin().await?,
            fail_on: self.fail_on,
            seen: 0,
            upserts: Arc::clone(&self.upserts),
            failures_left: Arc::clone(&self.failures_left),
        }))
    }

    async fn get(
        &self,
        user_id: Uuid,
        doc_type: DocumentType,
    ) -> assessment_storage::Result<Option<StoredDocument>> {
        self.inner.get(user_id, doc_type).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> assessment_storage::Result<Vec<StoredDocument>> {
        self.inner.list_for_user(user_id).await
    }

    async fn delete(&self, doc_id: DocumentId) -> assessment_storage::Result<()> {
        self.inner.delete(doc_id).await
    }
}

/// Tracker that refuses to mark jobs successful
#[derive(Clone, Default)]
pub struct NoSuccessTracker {
    pub inner: InMemoryJobTracker,
}

#[async_trait]
impl JobTracker for NoSuccessTracker {
    async fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<()> {
        if update.status == JobStatus::Success {
            return Err(EtlError::tracker("status service unavailable"));
        }
        self.inner.update_job(job_id, update).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.inner.get_job(job_id).await
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<CriticalFailure>>,
}

#[async_trait]
impl AdminNotifier for RecordingNotifier {
    async fn notify_critical_failure(&self, failure: &CriticalFailure) -> Result<()> {
        self.sent.lock().push(failure.clone());
        Ok(())
    }
}

/// Collaborators for one end-to-end run, with handles kept for assertions
pub struct Harness {
    pub store: InMemoryStore,
    pub tracker: InMemoryJobTracker,
    pub notifier: Arc<RecordingNotifier>,
    pub services: EtlServices,
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let tracker = InMemoryJobTracker::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let services = EtlServices {
            legacy: Arc::new(FixtureSource::default()),
            users: Arc::new(store.clone()),
            documents: Arc::new(store.clone()),
            transformer: Arc::new(AssessmentTransformer::new()),
            embedder: Arc::new(FixedEmbedder { dimension: 768 }),
            tracker: Arc::new(tracker.clone()),
            notifier: notifier.clone(),
        };
        Self {
            store,
            tracker,
            notifier,
            services,
        }
    }

    pub async fn job_status(&self, job_id: &str) -> Option<JobStatus> {
        self.tracker
            .get_job(job_id)
            .await
            .ok()
            .flatten()
            .map(|r| r.status)
    }
}

/// Defaults with millisecond query retry delays
pub fn fast_config() -> EtlConfig {
    let mut config = EtlConfig::default();
    config.executor.retry_delay_ms = 1;
    config.executor.retry_delay_cap_ms = 4;
    config
}

pub fn critical_names() -> Vec<&'static str> {
    QueryKind::ALL
        .iter()
        .map(|k| k.name())
        .filter(|n| is_critical(n))
        .collect()
}
