//! Semantic documents built from assessment query data

pub mod transformer;

use assessment_storage::{DocumentType, NewDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::query::QueryData;

pub use transformer::AssessmentTransformer;

/// Document produced by a transformer, not yet embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedDocument {
    pub doc_type: DocumentType,
    pub content: Value,
    pub summary_text: String,
    pub metadata: Value,
}

impl TransformedDocument {
    pub fn new(doc_type: DocumentType, content: Value, summary_text: impl Into<String>) -> Self {
        Self {
            doc_type,
            content,
            summary_text: summary_text.into(),
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_embedding(self, embedding: Vec<f32>) -> EmbeddedDocument {
        EmbeddedDocument {
            document: self,
            embedding,
        }
    }
}

/// Transformed document paired with its vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDocument {
    pub document: TransformedDocument,
    pub embedding: Vec<f32>,
}

impl EmbeddedDocument {
    pub fn doc_type(&self) -> DocumentType {
        self.document.doc_type
    }

    /// All-zero vector substituted when embedding was unavailable
    pub fn is_dummy(&self) -> bool {
        self.embedding.iter().all(|x| *x == 0.0)
    }

    /// Storage payload for one user
    pub fn into_new_document(self, user_id: Uuid) -> NewDocument {
        let EmbeddedDocument { document, embedding } = self;
        NewDocument::new(
            user_id,
            document.doc_type,
            document.content,
            document.summary_text,
            embedding,
        )
        .with_metadata(document.metadata)
    }
}

/// Maps query data to semantic documents
#[async_trait]
pub trait DocumentTransformer: Send + Sync {
    /// Build every document the data supports; missing sources skip a type
    async fn transform_all(&self, data: &QueryData) -> Result<Vec<TransformedDocument>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_new_document_keeps_fields() {
        let user = Uuid::new_v4();
        let doc = TransformedDocument::new(
            DocumentType::ThinkingSkills,
            json!({"core_thinking_skills": [1]}),
            "thinking skills summary",
        )
        .with_metadata(json!({"v": "1.2"}))
        .with_embedding(vec![0.5, 0.0]);

        assert!(!doc.is_dummy());
        let new = doc.into_new_document(user);
        assert_eq!(new.user_id, user);
        assert_eq!(new.doc_type, DocumentType::ThinkingSkills);
        assert_eq!(new.metadata["v"], "1.2");
        assert_eq!(new.embedding, vec![0.5, 0.0]);
    }

    #[test]
    fn test_zero_vector_is_dummy() {
        let doc = TransformedDocument::new(DocumentType::LearningStyle, json!({"a": 1}), "summary text")
            .with_embedding(vec![0.0; 4]);
        assert!(doc.is_dummy());
    }
}
