//! Pass/fail policy of the result validator at each level

mod common;

use std::time::Duration;

use assessment_etl::query::QueryKind;
use assessment_etl::{
    validate_embeddings, validate_query_results, EmbeddedDocument, NamedQueryResult, QueryResults,
    Row, TransformedDocument, ValidationLevel,
};
use assessment_storage::DocumentType;
use common::{critical_names, fixture_rows, rows};
use proptest::prelude::*;
use serde_json::{json, Value};

/// `total` results, the four critical ones always succeeding, `successful` overall
fn results_with(total: usize, successful: usize) -> QueryResults {
    assert!(total >= 4 && successful >= 4 && successful <= total);
    let mut results = QueryResults::new();
    for name in critical_names() {
        let kind = QueryKind::from_name(name).unwrap();
        results.insert(
            name.to_string(),
            NamedQueryResult::success(name, fixture_rows(kind), Duration::ZERO, 1),
        );
    }
    for i in 0..total - 4 {
        let name = format!("extraQuery{:03}", i);
        let result = if i < successful - 4 {
            NamedQueryResult::success(&name, rows(json!([{"k": 1}])), Duration::ZERO, 1)
        } else {
            NamedQueryResult::failure(&name, "connection reset", Duration::ZERO, 3)
        };
        results.insert(name, result);
    }
    results
}

fn embedded(doc_type: DocumentType, vector: Vec<f32>) -> EmbeddedDocument {
    TransformedDocument::new(doc_type, json!({"k": 1}), "A summary long enough").with_embedding(vector)
}

#[test]
fn test_standard_threshold_is_eighty_percent() {
    let at_threshold = validate_query_results(&results_with(100, 80), ValidationLevel::Standard);
    assert!(at_threshold.passed, "{}", at_threshold.summary());
    assert_eq!(at_threshold.failed, 20);

    let below = validate_query_results(&results_with(100, 79), ValidationLevel::Standard);
    assert!(!below.passed);
    assert_eq!(below.errors.len(), 21);
}

#[test]
fn test_basic_passes_what_strict_rejects() {
    let results = results_with(20, 5);
    assert!(validate_query_results(&results, ValidationLevel::Basic).passed);
    assert!(!validate_query_results(&results, ValidationLevel::Standard).passed);
    assert!(!validate_query_results(&results, ValidationLevel::Strict).passed);

    let clean = results_with(20, 20);
    assert!(validate_query_results(&clean, ValidationLevel::Strict).passed);
}

#[test]
fn test_missing_critical_query_fails_standard() {
    let mut results = results_with(10, 10);
    results.remove("thinkingSkillsQuery");
    let verdict = validate_query_results(&results, ValidationLevel::Standard);
    assert!(!verdict.passed);
    assert_eq!(verdict.critical_missing, vec!["thinkingSkillsQuery".to_string()]);
}

#[test]
fn test_high_null_density_warns_without_failing() {
    let mut results = results_with(4, 4);
    let mut sparse: Row = (0..60).map(|i| (format!("f{}", i), Value::Null)).collect();
    sparse.insert("id".to_string(), json!(1));
    results.insert(
        "sparseQuery".to_string(),
        NamedQueryResult::success("sparseQuery", vec![sparse], Duration::ZERO, 1),
    );

    let standard = validate_query_results(&results, ValidationLevel::Standard);
    assert!(standard.passed);
    assert!(standard
        .warnings
        .iter()
        .any(|w| w.starts_with("High null density")));

    let basic = validate_query_results(&results, ValidationLevel::Basic);
    assert!(basic.warnings.is_empty());
}

#[test]
fn test_mixed_embedding_dimensions_fail_at_every_level() {
    let docs = vec![
        embedded(DocumentType::PersonalityProfile, vec![0.1; 768]),
        embedded(DocumentType::ThinkingSkills, vec![0.1; 512]),
    ];
    for level in [ValidationLevel::Basic, ValidationLevel::Standard, ValidationLevel::Strict] {
        let verdict = validate_embeddings(&docs, level);
        assert!(!verdict.passed, "mixed dimensions passed at {}", level);
        assert!(verdict
            .errors
            .iter()
            .any(|e| e.starts_with("Inconsistent embedding dimensions")));
    }
}

#[test]
fn test_zero_vectors_only_warn() {
    let docs = vec![
        embedded(DocumentType::PersonalityProfile, vec![0.0; 768]),
        embedded(DocumentType::ThinkingSkills, vec![0.3; 768]),
    ];
    let verdict = validate_embeddings(&docs, ValidationLevel::Strict);
    assert!(verdict.passed);
    assert_eq!(verdict.warnings.len(), 1);
    assert!(verdict.warnings[0].contains("dummy embedding"));
}

proptest! {
    #[test]
    fn prop_standard_passes_iff_eighty_percent(total in 4usize..150, extra in 0usize..150) {
        let successful = 4 + extra % (total - 3);
        let verdict = validate_query_results(&results_with(total, successful), ValidationLevel::Standard);
        prop_assert_eq!(verdict.passed, successful * 5 >= total * 4);
        prop_assert_eq!(verdict.successful + verdict.failed, verdict.total);
    }
}
