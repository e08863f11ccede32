use assessment_storage::DocumentType;
use serde_json::Value;

use super::{ValidationLevel, ValidationVerdict, VerdictBuilder};
use crate::documents::TransformedDocument;

/// Types that must be present and valid
pub const REQUIRED_DOCUMENT_TYPES: [DocumentType; 3] = [
    DocumentType::PersonalityProfile,
    DocumentType::ThinkingSkills,
    DocumentType::CareerRecommendations,
];

const MIN_SUMMARY_CHARS: usize = 10;

/// Score a batch of transformed documents
pub fn validate_documents(
    documents: &[TransformedDocument],
    level: ValidationLevel,
) -> ValidationVerdict {
    let mut verdict = VerdictBuilder::new(level);
    let mut valid_types = Vec::new();

    for doc in documents {
        let issues = document_issues(doc, level);
        verdict.item(issues.is_empty());
        if issues.is_empty() {
            valid_types.push(doc.doc_type);
        }
        for issue in issues {
            verdict.error(format!("{}: {}", doc.doc_type, issue));
        }
    }

    for required in REQUIRED_DOCUMENT_TYPES {
        if !documents.iter().any(|d| d.doc_type == required) {
            verdict.error(format!("Missing required document type: {}", required));
        }
        verdict.critical(required.as_str(), valid_types.contains(&required));
    }

    verdict.finish()
}

fn document_issues(doc: &TransformedDocument, level: ValidationLevel) -> Vec<String> {
    let mut issues = Vec::new();

    if is_empty_content(&doc.content) {
        issues.push("Empty content".to_string());
    }
    if doc.summary_text.trim().chars().count() < MIN_SUMMARY_CHARS {
        issues.push("Missing or too short summary text".to_string());
    }

    if level.checks_data_quality() {
        match doc.doc_type {
            DocumentType::PersonalityProfile => {
                for field in ["primary_tendency", "secondary_tendency"] {
                    match doc.content.get(field) {
                        None => issues.push(format!("Missing {}", field)),
                        Some(v) if !has_text(v.get("name")) => {
                            issues.push(format!("Missing name in {}", field))
                        }
                        Some(_) => {}
                    }
                }
            }
            DocumentType::ThinkingSkills => {
                issues.extend(non_empty_list(&doc.content, "core_thinking_skills"))
            }
            DocumentType::CareerRecommendations => {
                issues.extend(non_empty_list(&doc.content, "recommended_careers"))
            }
            DocumentType::LearningStyle
            | DocumentType::CompetencyAnalysis
            | DocumentType::PreferenceAnalysis => {}
        }
    }

    issues
}

fn is_empty_content(content: &Value) -> bool {
    match content {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn has_text(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::String(s)) if !s.trim().is_empty())
}

fn non_empty_list(content: &Value, field: &str) -> Option<String> {
    match content.get(field) {
        None => Some(format!("Missing {}", field)),
        Some(Value::Array(items)) if items.is_empty() => Some(format!("{} is empty", field)),
        Some(Value::Array(_)) => None,
        Some(_) => Some(format!("{} must be a list", field)),
    }
}
