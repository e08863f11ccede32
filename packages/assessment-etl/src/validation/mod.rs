//! Batch validation
//!
//! Three entry points share one pass/fail policy:
//!
//! - [`queries::validate_query_results`] over named query results
//! - [`documents::validate_documents`] over transformed documents
//! - [`embeddings::validate_embeddings`] over embedded documents
//!
//! | Level    | Passes when                                                      |
//! |----------|------------------------------------------------------------------|
//! | STRICT   | no item failed and every critical item succeeded                 |
//! | STANDARD | every critical item succeeded and success ratio >= 0.80          |
//! | BASIC    | any critical item succeeded (any item, if there is no critical set) |
//!
//! An empty batch or a batch-level hard error fails at every level.

pub mod documents;
pub mod embeddings;
pub mod queries;

use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

pub use documents::{validate_documents, REQUIRED_DOCUMENT_TYPES};
pub use embeddings::validate_embeddings;
pub use queries::validate_query_results;

/// How strict a verdict is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Basic,
    #[default]
    Standard,
    Strict,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Basic => "basic",
            ValidationLevel::Standard => "standard",
            ValidationLevel::Strict => "strict",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(ValidationLevel::Basic),
            "standard" => Ok(ValidationLevel::Standard),
            "strict" => Ok(ValidationLevel::Strict),
            _ => Err(EtlError::parse(format!("Invalid validation level: {}", s))),
        }
    }

    /// Whether data-quality sub-checks run
    pub fn checks_data_quality(&self) -> bool {
        matches!(self, ValidationLevel::Standard | ValidationLevel::Strict)
    }
}

impl std::fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of validating one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub level: ValidationLevel,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Critical items that did not succeed
    pub critical_missing: Vec<String>,
    pub passed: bool,
}

impl ValidationVerdict {
    /// Verdict with a precomputed pass flag
    pub fn from_counts(
        total: usize,
        successful: usize,
        errors: Vec<String>,
        warnings: Vec<String>,
        passed: bool,
    ) -> Self {
        Self {
            level: ValidationLevel::default(),
            total,
            successful,
            failed: total.saturating_sub(successful),
            errors,
            warnings,
            critical_missing: Vec::new(),
            passed,
        }
    }

    pub fn success_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }

    /// One-line description for logs and error messages
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{}/{} items valid at {} level, {} errors, {} warnings",
            self.successful,
            self.total,
            self.level,
            self.errors.len(),
            self.warnings.len()
        );
        if !self.critical_missing.is_empty() {
            s.push_str(&format!(
                ", critical missing: {}",
                self.critical_missing.join(", ")
            ));
        }
        s
    }
}

/// Accumulates item outcomes and applies the shared policy
#[derive(Debug)]
pub(crate) struct VerdictBuilder {
    level: ValidationLevel,
    total: usize,
    successful: usize,
    errors: Vec<String>,
    warnings: Vec<String>,
    critical: Vec<(String, bool)>,
    hard_error: bool,
}

impl VerdictBuilder {
    pub(crate) fn new(level: ValidationLevel) -> Self {
        Self {
            level,
            total: 0,
            successful: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            critical: Vec::new(),
            hard_error: false,
        }
    }

    pub(crate) fn item(&mut self, ok: bool) {
        self.total += 1;
        if ok {
            self.successful += 1;
        }
    }

    /// Record whether a named critical item succeeded
    pub(crate) fn critical(&mut self, name: impl Into<String>, ok: bool) {
        self.critical.push((name.into(), ok));
    }

    pub(crate) fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub(crate) fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Batch-level error that fails the verdict at every level
    pub(crate) fn hard_error(&mut self, msg: impl Into<String>) {
        self.hard_error = true;
        self.error(msg);
    }

    pub(crate) fn finish(self) -> ValidationVerdict {
        let failed = self.total - self.successful;
        let all_critical_ok = self.critical.iter().all(|(_, ok)| *ok);

        let passed = !self.hard_error
            && self.total > 0
            && match self.level {
                ValidationLevel::Strict => failed == 0 && all_critical_ok,
                ValidationLevel::Standard => {
                    all_critical_ok && self.successful * 5 >= self.total * 4
                }
                ValidationLevel::Basic => {
                    if self.critical.is_empty() {
                        self.successful > 0
                    } else {
                        self.critical.iter().any(|(_, ok)| *ok)
                    }
                }
            };

        ValidationVerdict {
            level: self.level,
            total: self.total,
            successful: self.successful,
            failed,
            errors: self.errors,
            warnings: self.warnings,
            critical_missing: self
                .critical
                .into_iter()
                .filter(|(_, ok)| !ok)
                .map(|(name, _)| name)
                .collect(),
            passed,
        }
    }
}
