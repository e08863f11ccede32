//! Assessment document storage
//!
//! Persistence for the users and semantic documents produced by the
//! assessment ETL pipeline.
//!
//! ## Core Contract
//!
//! 1. **Keyed upsert**: at most one document per `(user_id, doc_type)`;
//!    re-running a job replaces content but keeps the document id.
//! 2. **Atomic batches**: documents are written through a
//!    [`DocumentTransaction`] and become visible only on commit.
//! 3. **Explicit compensation**: committed documents and created users are
//!    removed one by one through `delete`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assessment_storage::{DocumentStore, InMemoryStore, NewDocument, DocumentType};
//!
//! let store = InMemoryStore::new();
//! let mut tx = store.begin().await?;
//! tx.upsert(NewDocument::new(user_id, DocumentType::ThinkingSkills, content, summary, vector)).await?;
//! let refs = tx.commit().await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    DocumentId, DocumentRef, DocumentStore, DocumentTransaction, DocumentType, NewDocument,
    StoredDocument, UserRecord, UserStore,
};

pub use infrastructure::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteStore;
