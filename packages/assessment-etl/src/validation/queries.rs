use serde_json::Value;

use super::{ValidationLevel, ValidationVerdict, VerdictBuilder};
use crate::query::catalog::is_reserved;
use crate::query::validators::is_truthy;
use crate::query::{QueryResults, Row, CRITICAL_QUERIES};

/// Null share above which a batch is flagged
const NULL_DENSITY_THRESHOLD: f64 = 0.5;

/// Score a batch of named query results
///
/// Every critical query must be present in `results`; a missing one counts
/// as a failed critical item.
pub fn validate_query_results(results: &QueryResults, level: ValidationLevel) -> ValidationVerdict {
    let mut verdict = VerdictBuilder::new(level);

    for (name, result) in results {
        verdict.item(result.succeeded);
        if result.succeeded {
            if result.rows.is_empty() {
                if !is_reserved(name) {
                    verdict.warning(format!("Query {} succeeded but returned no data", name));
                }
            } else {
                for issue in data_quality_issues(name, &result.rows) {
                    verdict.warning(format!("{}: {}", name, issue));
                }
            }
        } else {
            verdict.error(format!(
                "{}: {}",
                name,
                result.error_description.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    for critical in CRITICAL_QUERIES {
        let ok = results.get(critical).map(|r| r.succeeded).unwrap_or(false);
        verdict.critical(critical, ok);
    }

    if level.checks_data_quality() {
        let mut total_fields = 0usize;
        let mut null_fields = 0usize;

        for (name, result) in results.iter().filter(|(_, r)| r.succeeded) {
            for (idx, row) in result.rows.iter().enumerate() {
                if row.is_empty() || row.values().all(Value::is_null) {
                    verdict.warning(format!("{}: row {} is empty", name, idx));
                }
                total_fields += row.len();
                null_fields += row.values().filter(|v| v.is_null()).count();
            }
        }

        if total_fields > 0 {
            let density = null_fields as f64 / total_fields as f64;
            if density > NULL_DENSITY_THRESHOLD {
                verdict.warning(format!(
                    "High null density: {:.1}% of {} fields are null",
                    density * 100.0,
                    total_fields
                ));
            }
        }
    }

    let verdict = verdict.finish();
    tracing::debug!(summary = %verdict.summary(), passed = verdict.passed, "Query validation");
    verdict
}

/// Query-specific content checks, reported as warnings
fn data_quality_issues(name: &str, rows: &[Row]) -> Vec<String> {
    match name {
        "tendencyQuery" => tendency_issues(rows),
        "thinkingSkillsQuery" => thinking_skills_issues(rows),
        "careerRecommendationQuery" => career_issues(rows),
        _ => Vec::new(),
    }
}

fn tendency_issues(rows: &[Row]) -> Vec<String> {
    let Some(first) = rows.first() else {
        return vec!["No tendency data".to_string()];
    };
    ["Tnd1", "Tnd2"]
        .iter()
        .filter(|field| !first.get(**field).is_some_and(is_truthy))
        .map(|field| format!("Missing or empty tendency field: {}", field))
        .collect()
}

fn percent_issue(row: &Row, field: &str, idx: usize) -> Option<String> {
    let value = row.get(field)?;
    match value.as_f64() {
        Some(v) if (0.0..=100.0).contains(&v) => None,
        _ => Some(format!("Invalid {} in row {}: {}", field, idx, value)),
    }
}

fn thinking_skills_issues(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .enumerate()
        .flat_map(|(i, row)| {
            [percent_issue(row, "score", i), percent_issue(row, "percentile", i)]
        })
        .flatten()
        .collect()
}

fn career_issues(rows: &[Row]) -> Vec<String> {
    let mut issues = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        for field in ["job_code", "job_name"] {
            if !row.get(field).is_some_and(is_truthy) {
                issues.push(format!("Missing {} in career row {}", field, i));
            }
        }
        issues.extend(percent_issue(row, "match_score", i));
    }
    issues
}
