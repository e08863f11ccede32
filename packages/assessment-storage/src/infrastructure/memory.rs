//! In-memory backend
//!
//! Used by tests and by the CLI when no database path is given. Upserts are
//! buffered inside the transaction and applied under one lock on commit, so a
//! transaction that never commits leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{
    DocumentId, DocumentRef, DocumentStore, DocumentTransaction, DocumentType, NewDocument,
    StoredDocument, UserRecord, UserStore,
};
use crate::{Result, StorageError};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    documents: HashMap<DocumentId, StoredDocument>,
    by_key: HashMap<(Uuid, DocumentType), DocumentId>,
}

/// In-memory user and document store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.state.lock().documents.len()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().users.len()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.state.lock().users.get(&user_id).cloned())
    }

    async fn create(&self, user: UserRecord) -> Result<()> {
        let mut state = self.state.lock();
        if state.users.contains_key(&user.user_id) {
            return Err(StorageError::already_exists(format!(
                "User already exists: {}",
                user.user_id
            )));
        }
        state.users.insert(user.user_id, user);
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        self.state
            .lock()
            .users
            .remove(&user_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::user_not_found(user_id))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn DocumentTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        }))
    }

    async fn get(&self, user_id: Uuid, doc_type: DocumentType) -> Result<Option<StoredDocument>> {
        let state = self.state.lock();
        Ok(state
            .by_key
            .get(&(user_id, doc_type))
            .and_then(|id| state.documents.get(id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<StoredDocument>> {
        let state = self.state.lock();
        let mut docs: Vec<StoredDocument> = state
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.doc_type);
        Ok(docs)
    }

    async fn delete(&self, doc_id: DocumentId) -> Result<()> {
        let mut state = self.state.lock();
        let doc = state
            .documents
            .remove(&doc_id)
            .ok_or_else(|| StorageError::document_not_found(doc_id))?;
        state.by_key.remove(&(doc.user_id, doc.doc_type));
        Ok(())
    }
}

struct InMemoryTransaction {
    state: Arc<Mutex<State>>,
    pending: Vec<NewDocument>,
}

#[async_trait]
impl DocumentTransaction for InMemoryTransaction {
    async fn upsert(&mut self, doc: NewDocument) -> Result<()> {
        self.pending.push(doc);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<Vec<DocumentRef>> {
        let mut state = self.state.lock();
        let now = Utc::now();
        let mut written = Vec::with_capacity(self.pending.len());

        for doc in self.pending {
            let key = (doc.user_id, doc.doc_type);
            let existing = state.by_key.get(&key).copied();
            let doc_id = existing.unwrap_or_default();
            let created_at = existing
                .and_then(|id| state.documents.get(&id))
                .map(|d| d.created_at)
                .unwrap_or(now);

            state.documents.insert(
                doc_id,
                StoredDocument {
                    doc_id,
                    user_id: doc.user_id,
                    doc_type: doc.doc_type,
                    content: doc.content,
                    summary_text: doc.summary_text,
                    embedding: doc.embedding,
                    metadata: doc.metadata,
                    created_at,
                    updated_at: now,
                },
            );
            state.by_key.insert(key, doc_id);
            written.push(DocumentRef {
                doc_id,
                user_id: key.0,
                doc_type: key.1,
            });
        }

        Ok(written)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
