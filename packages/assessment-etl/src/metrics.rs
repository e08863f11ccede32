//! Prometheus counters (feature `metrics`)
//!
//! Without the feature every recorder is an empty inline function.

#[cfg(feature = "metrics")]
mod imp {
    use std::sync::OnceLock;

    use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};

    pub struct EtlMetrics {
        pub registry: Registry,
        pub query_attempts: IntCounterVec,
        pub stage_attempts: IntCounterVec,
        pub embedding_fallbacks: IntCounterVec,
    }

    impl EtlMetrics {
        fn new() -> prometheus::Result<Self> {
            let registry = Registry::new();
            let query_attempts = IntCounterVec::new(
                Opts::new("etl_query_attempts_total", "Legacy query attempts"),
                &["query", "outcome"],
            )?;
            let stage_attempts = IntCounterVec::new(
                Opts::new("etl_stage_attempts_total", "Pipeline stage attempts"),
                &["stage", "outcome"],
            )?;
            let embedding_fallbacks = IntCounterVec::new(
                Opts::new(
                    "etl_embedding_fallbacks_total",
                    "Documents given a zero-vector embedding",
                ),
                &["reason"],
            )?;
            registry.register(Box::new(query_attempts.clone()))?;
            registry.register(Box::new(stage_attempts.clone()))?;
            registry.register(Box::new(embedding_fallbacks.clone()))?;
            Ok(Self {
                registry,
                query_attempts,
                stage_attempts,
                embedding_fallbacks,
            })
        }
    }

    static METRICS: OnceLock<Option<EtlMetrics>> = OnceLock::new();

    pub fn metrics() -> Option<&'static EtlMetrics> {
        METRICS
            .get_or_init(|| match EtlMetrics::new() {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!(error = %e, "Metrics registration failed; metrics disabled");
                    None
                }
            })
            .as_ref()
    }

    pub fn outcome(ok: bool) -> &'static str {
        if ok {
            "success"
        } else {
            "failure"
        }
    }

    /// Text exposition of every registered counter
    pub fn render() -> String {
        let Some(m) = metrics() else {
            return String::new();
        };
        TextEncoder::new()
            .encode_to_string(&m.registry.gather())
            .unwrap_or_default()
    }
}

#[cfg(feature = "metrics")]
pub use imp::render;

#[cfg(feature = "metrics")]
pub fn record_query_attempt(query: &str, ok: bool) {
    if let Some(m) = imp::metrics() {
        m.query_attempts.with_label_values(&[query, imp::outcome(ok)]).inc();
    }
}

#[cfg(feature = "metrics")]
pub fn record_stage_attempt(stage: &str, ok: bool) {
    if let Some(m) = imp::metrics() {
        m.stage_attempts.with_label_values(&[stage, imp::outcome(ok)]).inc();
    }
}

#[cfg(feature = "metrics")]
pub fn record_embedding_fallback(reason: &str, documents: usize) {
    if let Some(m) = imp::metrics() {
        m.embedding_fallbacks
            .with_label_values(&[reason])
            .inc_by(documents as u64);
    }
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_query_attempt(_query: &str, _ok: bool) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_stage_attempt(_stage: &str, _ok: bool) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_embedding_fallback(_reason: &str, _documents: usize) {}
