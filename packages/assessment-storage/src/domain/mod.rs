//! Domain layer for assessment document persistence
//!
//! # Domain Models
//!
//! - `UserRecord`: the person an assessment belongs to
//! - `DocumentType`: closed set of semantic document kinds
//! - `NewDocument`: a document ready to be written (content + vector)
//! - `StoredDocument`: a persisted document with its identity
//!
//! # Port Traits
//!
//! - `UserStore`: user lookup/creation/deletion
//! - `DocumentStore`: transactional document upserts keyed by `(user, doc_type)`
//! - `DocumentTransaction`: one unit of work, committed or rolled back atomically
//!
//! # Examples
//!
//! ```rust,ignore
//! use assessment_storage::domain::{DocumentStore, DocumentType, NewDocument};
//!
//! async fn example(store: &dyn DocumentStore, user_id: uuid::Uuid) -> Result<()> {
//!     let mut tx = store.begin().await?;
//!     tx.upsert(NewDocument::new(
//!         user_id,
//!         DocumentType::PersonalityProfile,
//!         serde_json::json!({"primary_tendency": {"name": "Creative"}}),
//!         "Primary tendency: Creative",
//!         vec![0.1; 768],
//!     ))
//!     .await?;
//!     let written = tx.commit().await?;
//!     assert_eq!(written.len(), 1);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════════

/// A user record owning one assessment's documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: Uuid,
    /// Sequence id of the assessment in the legacy schema
    pub test_sequence_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub test_completed_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(user_id: Uuid, test_sequence_id: i64) -> Self {
        Self {
            user_id,
            test_sequence_id,
            name: None,
            created_at: Utc::now(),
            test_completed_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.test_completed_at = Some(at);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Documents
// ═══════════════════════════════════════════════════════════════════════════

/// Kind of semantic document produced from one assessment
///
/// Persisted as SCREAMING_SNAKE strings (`"PERSONALITY_PROFILE"`, ...).
///
/// ```rust
/// use assessment_storage::domain::DocumentType;
///
/// let t: DocumentType = "THINKING_SKILLS".parse().unwrap();
/// assert_eq!(t, DocumentType::ThinkingSkills);
/// assert_eq!(t.as_str(), "THINKING_SKILLS");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    PersonalityProfile,
    ThinkingSkills,
    CareerRecommendations,
    LearningStyle,
    CompetencyAnalysis,
    PreferenceAnalysis,
}

impl DocumentType {
    /// All document types in generation order
    pub const ALL: [DocumentType; 6] = [
        DocumentType::PersonalityProfile,
        DocumentType::ThinkingSkills,
        DocumentType::CareerRecommendations,
        DocumentType::LearningStyle,
        DocumentType::CompetencyAnalysis,
        DocumentType::PreferenceAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::PersonalityProfile => "PERSONALITY_PROFILE",
            DocumentType::ThinkingSkills => "THINKING_SKILLS",
            DocumentType::CareerRecommendations => "CAREER_RECOMMENDATIONS",
            DocumentType::LearningStyle => "LEARNING_STYLE",
            DocumentType::CompetencyAnalysis => "COMPETENCY_ANALYSIS",
            DocumentType::PreferenceAnalysis => "PREFERENCE_ANALYSIS",
        }
    }
}

impl FromStr for DocumentType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        DocumentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StorageError::serialization(format!("Unknown document type: {}", s)))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable document identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document ready to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub user_id: Uuid,
    pub doc_type: DocumentType,
    pub content: serde_json::Value,
    pub summary_text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NewDocument {
    pub fn new(
        user_id: Uuid,
        doc_type: DocumentType,
        content: serde_json::Value,
        summary_text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            user_id,
            doc_type,
            content,
            summary_text: summary_text.into(),
            embedding,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub doc_id: DocumentId,
    pub user_id: Uuid,
    pub doc_type: DocumentType,
    pub content: serde_json::Value,
    pub summary_text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity of a committed upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub doc_id: DocumentId,
    pub user_id: Uuid,
    pub doc_type: DocumentType,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Traits
// ═══════════════════════════════════════════════════════════════════════════

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Lookup by id (`Ok(None)` when absent)
    async fn get_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>>;

    /// Create a user; fails with `AlreadyExists` on a duplicate id
    async fn create(&self, user: UserRecord) -> Result<()>;

    /// Delete a user; fails with `UserNotFound` when absent
    async fn delete(&self, user_id: Uuid) -> Result<()>;
}

/// Document persistence
///
/// All writes go through a [`DocumentTransaction`]. Reads and single deletes
/// are direct; `delete` is what compensation uses after a committed write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn DocumentTransaction>>;

    async fn get(&self, user_id: Uuid, doc_type: DocumentType) -> Result<Option<StoredDocument>>;

    /// All documents for a user ordered by document type
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<StoredDocument>>;

    /// Delete by id; fails with `DocumentNotFound` when absent
    async fn delete(&self, doc_id: DocumentId) -> Result<()>;
}

/// One atomic batch of upserts
///
/// Nothing written through `upsert` is visible before `commit`. Dropping a
/// transaction without committing discards it.
#[async_trait]
pub trait DocumentTransaction: Send {
    /// Stage an upsert keyed by `(user_id, doc_type)`
    async fn upsert(&mut self, doc: NewDocument) -> Result<()>;

    /// Apply every staged upsert atomically
    async fn commit(self: Box<Self>) -> Result<Vec<DocumentRef>>;

    /// Discard staged upserts
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_roundtrip() {
        for t in DocumentType::ALL {
            assert_eq!(DocumentType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(DocumentType::from_str("personality_profile").is_err());
    }

    #[test]
    fn test_document_type_serde_matches_as_str() {
        let json = serde_json::to_string(&DocumentType::CareerRecommendations).unwrap();
        assert_eq!(json, "\"CAREER_RECOMMENDATIONS\"");
    }

    #[test]
    fn test_user_record_builders() {
        let id = Uuid::new_v4();
        let user = UserRecord::new(id, 42).with_name("kim");
        assert_eq!(user.user_id, id);
        assert_eq!(user.test_sequence_id, 42);
        assert_eq!(user.name.as_deref(), Some("kim"));
        assert!(user.test_completed_at.is_none());
    }

    #[test]
    fn test_new_document_metadata_defaults_to_null() {
        let doc = NewDocument::new(
            Uuid::new_v4(),
            DocumentType::LearningStyle,
            serde_json::json!({"a": 1}),
            "summary",
            vec![],
        );
        assert!(doc.metadata.is_null());

        let doc = doc.with_metadata(serde_json::json!({"source": "etl"}));
        assert_eq!(doc.metadata["source"], "etl");
    }
}
