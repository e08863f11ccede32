//! SQLite backend
//!
//! File-based persistent storage for users and documents. Documents are
//! unique per `(user_id, doc_type)`; a transaction buffers upserts and
//! applies them inside one SQLite transaction on commit.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::domain::{
    DocumentId, DocumentRef, DocumentStore, DocumentTransaction, DocumentType, NewDocument,
    StoredDocument, UserRecord, UserStore,
};
use crate::{ErrorKind, Result, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chat_users (
    user_id TEXT PRIMARY KEY,
    test_sequence_id INTEGER NOT NULL,
    name TEXT,
    created_at INTEGER NOT NULL,
    test_completed_at INTEGER
);

CREATE TABLE IF NOT EXISTS chat_documents (
    doc_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    content TEXT NOT NULL,
    summary_text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    metadata TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (user_id, doc_type)
);

CREATE INDEX IF NOT EXISTS idx_chat_documents_user ON chat_documents(user_id);
";

const DOCUMENT_COLUMNS: &str =
    "doc_id, user_id, doc_type, content, summary_text, embedding, metadata, created_at, updated_at";

/// SQLite-backed user and document store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// In-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::serialization(format!("Invalid timestamp: {}", ms)))
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(StorageError::serialization(format!(
            "Embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Raw column values; decoded outside the rusqlite row closure
struct DocumentRow {
    doc_id: String,
    user_id: String,
    doc_type: String,
    content: String,
    summary_text: String,
    embedding: Vec<u8>,
    metadata: String,
    created_at: i64,
    updated_at: i64,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            doc_id: row.get(0)?,
            user_id: row.get(1)?,
            doc_type: row.get(2)?,
            content: row.get(3)?,
            summary_text: row.get(4)?,
            embedding: row.get(5)?,
            metadata: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_document(self) -> Result<StoredDocument> {
        Ok(StoredDocument {
            doc_id: DocumentId(Uuid::parse_str(&self.doc_id)?),
            user_id: Uuid::parse_str(&self.user_id)?,
            doc_type: self.doc_type.parse()?,
            content: serde_json::from_str(&self.content)?,
            summary_text: self.summary_text,
            embedding: decode_embedding(&self.embedding)?,
            metadata: serde_json::from_str(&self.metadata)?,
            created_at: millis_to_datetime(self.created_at)?,
            updated_at: millis_to_datetime(self.updated_at)?,
        })
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn get_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT test_sequence_id, name, created_at, test_completed_at
                 FROM chat_users WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((test_sequence_id, name, created_at, completed_at)) = row else {
            return Ok(None);
        };

        Ok(Some(UserRecord {
            user_id,
            test_sequence_id,
            name,
            created_at: millis_to_datetime(created_at)?,
            test_completed_at: completed_at.map(millis_to_datetime).transpose()?,
        }))
    }

    async fn create(&self, user: UserRecord) -> Result<()> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO chat_users
                (user_id, test_sequence_id, name, created_at, test_completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.user_id.to_string(),
                user.test_sequence_id,
                user.name,
                user.created_at.timestamp_millis(),
                user.test_completed_at.map(|t| t.timestamp_millis()),
            ],
        )?;
        if inserted == 0 {
            return Err(StorageError::already_exists(format!(
                "User already exists: {}",
                user.user_id
            )));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM chat_users WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::user_not_found(user_id));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn DocumentTransaction>> {
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            pending: Vec::new(),
        }))
    }

    async fn get(&self, user_id: Uuid, doc_type: DocumentType) -> Result<Option<StoredDocument>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM chat_documents WHERE user_id = ?1 AND doc_type = ?2",
            DOCUMENT_COLUMNS
        );
        conn.query_row(
            &sql,
            params![user_id.to_string(), doc_type.as_str()],
            DocumentRow::from_row,
        )
        .optional()?
        .map(DocumentRow::into_document)
        .transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<StoredDocument>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM chat_documents WHERE user_id = ?1",
            DOCUMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id.to_string()], DocumentRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut docs = rows
            .into_iter()
            .map(DocumentRow::into_document)
            .collect::<Result<Vec<_>>>()?;
        docs.sort_by_key(|d| d.doc_type);
        Ok(docs)
    }

    async fn delete(&self, doc_id: DocumentId) -> Result<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM chat_documents WHERE doc_id = ?1",
            params![doc_id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::document_not_found(doc_id));
        }
        Ok(())
    }
}

struct SqliteTransaction {
    conn: Arc<Mutex<Connection>>,
    pending: Vec<NewDocument>,
}

#[async_trait]
impl DocumentTransaction for SqliteTransaction {
    async fn upsert(&mut self, doc: NewDocument) -> Result<()> {
        self.pending.push(doc);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<Vec<DocumentRef>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| {
            StorageError::new(ErrorKind::Transaction, format!("BEGIN failed: {}", e)).with_source(e)
        })?;

        let now = Utc::now().timestamp_millis();
        let mut written = Vec::with_capacity(self.pending.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chat_documents
                    (doc_id, user_id, doc_type, content, summary_text, embedding, metadata, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT(user_id, doc_type) DO UPDATE SET
                    content = excluded.content,
                    summary_text = excluded.summary_text,
                    embedding = excluded.embedding,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at
                 RETURNING doc_id",
            )?;

            for doc in &self.pending {
                let doc_id: String = stmt.query_row(
                    params![
                        DocumentId::new().to_string(),
                        doc.user_id.to_string(),
                        doc.doc_type.as_str(),
                        serde_json::to_string(&doc.content)?,
                        doc.summary_text,
                        encode_embedding(&doc.embedding),
                        serde_json::to_string(&doc.metadata)?,
                        now,
                    ],
                    |row| row.get(0),
                )?;
                written.push(DocumentRef {
                    doc_id: DocumentId(Uuid::parse_str(&doc_id)?),
                    user_id: doc.user_id,
                    doc_type: doc.doc_type,
                });
            }
        }

        tx.commit().map_err(|e| {
            StorageError::new(ErrorKind::Transaction, format!("COMMIT failed: {}", e)).with_source(e)
        })?;
        tracing::debug!(documents = written.len(), "Committed document transaction");
        Ok(written)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        tracing::debug!(
            discarded = self.pending.len(),
            "Rolled back document transaction"
        );
        Ok(())
    }
}
