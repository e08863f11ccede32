//! Embedding collaborators
//!
//! [`EmbeddingService`] is what the orchestrator calls. [`BatchingEmbedder`]
//! adapts any raw [`EmbeddingClient`] to it: chunked requests, per-chunk
//! retry with exponential backoff, and a length check on every response.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::documents::{EmbeddedDocument, TransformedDocument};
use crate::error::{EtlError, Result};

/// Embeds a batch of documents, preserving order
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed_batch(&self, documents: Vec<TransformedDocument>) -> Result<Vec<EmbeddedDocument>>;
}

/// Raw text-to-vector backend
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Fixed-dimension all-zero placeholder vector
pub fn zero_vector(dimension: usize) -> Vec<f32> {
    vec![0.0; dimension]
}

/// Chunking, retrying [`EmbeddingService`] over an [`EmbeddingClient`]
pub struct BatchingEmbedder<C> {
    client: C,
    config: EmbeddingConfig,
}

impl<C: EmbeddingClient> BatchingEmbedder<C> {
    pub fn new(client: C, config: EmbeddingConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            let outcome = self.client.embed_texts(texts).await.and_then(|vectors| {
                if vectors.len() == texts.len() {
                    Ok(vectors)
                } else {
                    Err(EtlError::embedding(format!(
                        "expected {} vectors, got {}",
                        texts.len(),
                        vectors.len()
                    )))
                }
            });

            match outcome {
                Ok(vectors) => return Ok(vectors),
                Err(e) if attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Embedding request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<C: EmbeddingClient> EmbeddingService for BatchingEmbedder<C> {
    async fn embed_batch(&self, documents: Vec<TransformedDocument>) -> Result<Vec<EmbeddedDocument>> {
        let mut embedded = Vec::with_capacity(documents.len());
        let batch_size = self.config.batch_size.max(1);

        let mut remaining = documents.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<TransformedDocument> = remaining.by_ref().take(batch_size).collect();
            let texts: Vec<String> = chunk.iter().map(|d| d.summary_text.clone()).collect();
            let vectors = self.embed_chunk(&texts).await?;
            debug!(chunk = chunk.len(), "Embedded chunk");
            embedded.extend(chunk.into_iter().zip(vectors).map(|(d, v)| d.with_embedding(v)));
        }

        Ok(embedded)
    }
}

/// Deterministic feature-hashing client for offline runs
///
/// Each lowercase whitespace token is hashed with SHA-256; the digest picks
/// a bucket and a sign. The result is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = zero_vector(self.dimension);
        for token in text.split_whitespace() {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessment_storage::DocumentType;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn doc(summary: &str) -> TransformedDocument {
        TransformedDocument::new(DocumentType::ThinkingSkills, json!({"k": 1}), summary)
    }

    struct FlakyClient {
        failures_left: AtomicU32,
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingClient for FlakyClient {
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().push(texts.len());
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(EtlError::embedding("service unavailable"));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn config(max_retries: u32) -> EmbeddingConfig {
        EmbeddingConfig {
            batch_size: 2,
            max_retries,
            retry_delay_ms: 10,
            retry_delay_cap_ms: 40,
            dimension: 2,
        }
    }

    #[test]
    fn test_hashing_is_deterministic_and_normalised() {
        let client = HashingEmbeddingClient::new(64);
        let a = client.embed_text("Creative analytic learner");
        let b = client.embed_text("creative ANALYTIC learner");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(client.embed_text("").iter().all(|x| *x == 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_and_retries() {
        let client = FlakyClient {
            failures_left: AtomicU32::new(1),
            calls: Mutex::new(Vec::new()),
        };
        let embedder = BatchingEmbedder::new(client, config(3));

        let docs = vec![doc("one"), doc("two"), doc("three")];
        let out = embedder.embed_batch(docs).await.unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[2].document.summary_text, "three");
        // first chunk fails once, then two chunks of 2 and 1
        assert_eq!(*embedder.client().calls.lock(), vec![2, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let client = FlakyClient {
            failures_left: AtomicU32::new(10),
            calls: Mutex::new(Vec::new()),
        };
        let embedder = BatchingEmbedder::new(client, config(2));
        let err = embedder.embed_batch(vec![doc("one")]).await.unwrap_err();
        assert!(matches!(err, EtlError::Embedding(_)));
        assert_eq!(embedder.client().calls.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_stop_growing_at_cap() {
        let client = FlakyClient {
            failures_left: AtomicU32::new(5),
            calls: Mutex::new(Vec::new()),
        };
        let embedder = BatchingEmbedder::new(client, config(5));
        let started = tokio::time::Instant::now();
        embedder.embed_batch(vec![doc("one")]).await.unwrap();
        // 10 + 20 + 40 + 40 + 40
        assert_eq!(started.elapsed(), Duration::from_millis(150));
    }
}
