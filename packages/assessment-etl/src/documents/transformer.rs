//! Reference transformer from legacy query rows to documents
//!
//! One builder per [`DocumentType`]. A builder whose source queries returned
//! nothing reports a transformation error, which `transform_all` logs and
//! skips so the remaining types are still produced.

use std::collections::HashMap;

use assessment_storage::DocumentType;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{DocumentTransformer, TransformedDocument};
use crate::error::{EtlError, Result};
use crate::query::{QueryData, Row};

const DOCUMENT_VERSION: &str = "1.2";

/// Builds every [`DocumentType`] from assessment query data
#[derive(Debug, Clone, Default)]
pub struct AssessmentTransformer;

impl AssessmentTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Build a single document type
    pub fn build(&self, doc_type: DocumentType, data: &QueryData) -> Result<TransformedDocument> {
        let sources = Sources(data);
        match doc_type {
            DocumentType::PersonalityProfile => personality_profile(&sources),
            DocumentType::ThinkingSkills => thinking_skills(&sources),
            DocumentType::CareerRecommendations => career_recommendations(&sources),
            DocumentType::LearningStyle => learning_style(&sources),
            DocumentType::CompetencyAnalysis => competency_analysis(&sources),
            DocumentType::PreferenceAnalysis => preference_analysis(&sources),
        }
    }
}

#[async_trait]
impl DocumentTransformer for AssessmentTransformer {
    async fn transform_all(&self, data: &QueryData) -> Result<Vec<TransformedDocument>> {
        let mut documents = Vec::with_capacity(DocumentType::ALL.len());

        for doc_type in DocumentType::ALL {
            match self.build(doc_type, data) {
                Ok(doc) => {
                    debug!(doc_type = %doc_type, "Transformed document");
                    documents.push(doc);
                }
                Err(EtlError::Transformation { message, .. }) => {
                    warn!(doc_type = %doc_type, reason = %message, "Skipping document type");
                }
                Err(e) => return Err(e),
            }
        }

        info!(documents = documents.len(), "Document transformation completed");
        Ok(documents)
    }
}

/// Percentile band label
pub fn skill_level(percentile: f64) -> &'static str {
    if percentile >= 90.0 {
        "Excellent (top 10%)"
    } else if percentile >= 75.0 {
        "Very good (top 25%)"
    } else if percentile >= 50.0 {
        "Average (top 50%)"
    } else if percentile >= 25.0 {
        "Needs improvement"
    } else {
        "Needs significant improvement"
    }
}

struct Sources<'a>(&'a QueryData);

impl<'a> Sources<'a> {
    fn rows(&self, query: &str) -> &'a [Row] {
        self.0.get(query).map(Vec::as_slice).unwrap_or(&[])
    }

    fn first(&self, query: &str) -> Option<&'a Row> {
        self.rows(query).first()
    }
}

fn missing(doc_type: DocumentType, message: impl Into<String>) -> EtlError {
    EtlError::Transformation {
        doc_type: doc_type.as_str().to_string(),
        message: message.into(),
    }
}

fn text<'a>(row: &'a Row, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or("")
}

fn number(row: &Row, key: &str) -> f64 {
    row.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn rows_value(rows: &[Row]) -> Value {
    Value::Array(rows.iter().cloned().map(Value::Object).collect())
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn metadata(sources: &[&str], extra: Value) -> Value {
    let mut meta = json!({
        "document_version": DOCUMENT_VERSION,
        "created_at": chrono::Utc::now().to_rfc3339(),
        "data_sources": sources,
    });
    if let (Value::Object(base), Value::Object(extra)) = (&mut meta, extra) {
        base.extend(extra);
    }
    meta
}

fn join_names<'a>(rows: impl Iterator<Item = &'a Row>, key: &str) -> String {
    rows.map(|r| text(r, key))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn personality_profile(src: &Sources<'_>) -> Result<TransformedDocument> {
    let tendency = src
        .first("tendencyQuery")
        .ok_or_else(|| missing(DocumentType::PersonalityProfile, "tendencyQuery returned no data"))?;
    let top = src.rows("topTendencyQuery");
    let bottom = src.rows("bottomTendencyQuery");

    let tendency_entry = |name: &str, default_rank: i64| {
        let matched = top
            .iter()
            .find(|t| !name.is_empty() && text(t, "tendency_name").starts_with(name));
        match matched {
            Some(t) => json!({
                "name": text(t, "tendency_name"),
                "code": text(t, "code"),
                "rank": t.get("rank").cloned().unwrap_or(json!(default_rank)),
                "score": t.get("score").cloned().unwrap_or(json!(0)),
            }),
            None => json!({ "name": name, "code": "", "rank": default_rank, "score": 0 }),
        }
    };

    let primary = tendency_entry(text(tendency, "Tnd1"), 1);
    let secondary = tendency_entry(text(tendency, "Tnd2"), 2);

    let summary = format!(
        "The primary tendency is {} and the secondary tendency is {}. \
         The strongest tendencies are {}. Tendencies that need support include {}.",
        primary["name"].as_str().unwrap_or_default(),
        secondary["name"].as_str().unwrap_or_default(),
        join_names(top.iter().take(3), "tendency_name"),
        join_names(bottom.iter(), "tendency_name"),
    );

    let meta = metadata(
        &[
            "tendencyQuery",
            "topTendencyQuery",
            "bottomTendencyQuery",
            "personalityDetailQuery",
            "strengthsWeaknessesQuery",
        ],
        json!({ "primary_tendency_code": primary["code"].clone() }),
    );

    let content = json!({
        "primary_tendency": primary,
        "secondary_tendency": secondary,
        "top_tendencies": rows_value(top),
        "bottom_tendencies": rows_value(bottom),
        "personality_details": rows_value(src.rows("personalityDetailQuery")),
        "strengths_weaknesses": rows_value(src.rows("strengthsWeaknessesQuery")),
    });

    Ok(TransformedDocument::new(DocumentType::PersonalityProfile, content, summary).with_metadata(meta))
}

fn thinking_skills(src: &Sources<'_>) -> Result<TransformedDocument> {
    let mut skills = src.rows("thinkingSkillsQuery").to_vec();
    if skills.is_empty() {
        return Err(missing(DocumentType::ThinkingSkills, "thinkingSkillsQuery returned no data"));
    }
    skills.sort_by(|a, b| number(b, "score").total_cmp(&number(a, "score")));

    let average = round_to(
        skills.iter().map(|s| number(s, "score")).sum::<f64>() / skills.len() as f64,
        2,
    );
    let level = skill_level(average);
    let top: Vec<Row> = skills.iter().take(3).cloned().collect();
    let bottom: Vec<Row> = skills.iter().skip(skills.len().saturating_sub(3)).cloned().collect();

    let summary = format!(
        "Overall thinking ability averages {:.1} points, rated '{}'. Strongest skills: {}.",
        average,
        level,
        join_names(top.iter(), "skill_name"),
    );

    let meta = metadata(
        &["thinkingSkillsQuery"],
        json!({ "skills_analyzed": skills.len(), "average_score": average }),
    );

    let content = json!({
        "core_thinking_skills": rows_value(&skills),
        "top_skills": rows_value(&top),
        "bottom_skills": rows_value(&bottom),
        "overall_analysis": { "average_score": average, "overall_level": level },
    });

    Ok(TransformedDocument::new(DocumentType::ThinkingSkills, content, summary).with_metadata(meta))
}

fn career_recommendations(src: &Sources<'_>) -> Result<TransformedDocument> {
    let careers = src.rows("careerRecommendationQuery");
    let competency_jobs = src.rows("competencyJobsQuery");
    let duties = src.rows("dutiesQuery");

    if careers.is_empty() && competency_jobs.is_empty() && duties.is_empty() {
        return Err(missing(
            DocumentType::CareerRecommendations,
            "no career recommendation data found",
        ));
    }

    let mut parts = Vec::new();
    if let Some(first) = careers.first() {
        parts.push(format!(
            "Based on tendency, {} careers are recommended, led by '{}'.",
            careers.len(),
            text(first, "job_name")
        ));
    }
    if let Some(first) = competency_jobs.first() {
        parts.push(format!(
            "Based on competencies, {} careers fit, including '{}'.",
            competency_jobs.len(),
            text(first, "jo_name")
        ));
    }
    if let Some(first) = duties.first() {
        parts.push(format!("Recommended duties include '{}'.", text(first, "du_name")));
    }

    let meta = metadata(
        &["careerRecommendationQuery", "competencyJobsQuery", "dutiesQuery"],
        json!({
            "tendency_jobs_count": careers.len(),
            "competency_jobs_count": competency_jobs.len(),
            "duties_count": duties.len(),
        }),
    );

    let content = json!({
        "recommended_careers": rows_value(careers),
        "competency_based_jobs": rows_value(competency_jobs),
        "recommended_duties": rows_value(duties),
        "competency_job_majors": rows_value(src.rows("competencyJobMajorsQuery")),
    });

    Ok(TransformedDocument::new(DocumentType::CareerRecommendations, content, parts.join(" "))
        .with_metadata(meta))
}

fn learning_style(src: &Sources<'_>) -> Result<TransformedDocument> {
    let style = src
        .first("learningStyleQuery")
        .ok_or_else(|| missing(DocumentType::LearningStyle, "learningStyleQuery returned no data"))?;
    let chart = src.rows("learningStyleChartQuery");

    let by_type = |t: &str| -> Vec<Row> {
        chart
            .iter()
            .filter(|r| text(r, "item_type") == t)
            .cloned()
            .collect()
    };

    let style_block = |prefix: &str| {
        json!({
            "name": text(style, &format!("{prefix}_name")),
            "study_tendency_description": text(style, &format!("{prefix}_study_tendency")),
            "study_way_description": text(style, &format!("{prefix}_study_way")),
        })
    };

    let primary = style_block("tnd1");
    let secondary = style_block("tnd2");

    let summary = format!(
        "The primary learning style is '{}' and the secondary is '{}'. {} Recommended study method: {}",
        text(style, "tnd1_name"),
        text(style, "tnd2_name"),
        text(style, "tnd1_study_tendency"),
        text(style, "tnd1_study_way"),
    );

    let meta = metadata(
        &["learningStyleQuery", "learningStyleChartQuery"],
        json!({ "primary_style_name": text(style, "tnd1_name") }),
    );

    let content = json!({
        "primary_tendency_style": primary,
        "secondary_tendency_style": secondary,
        "style_chart_data": rows_value(&by_type("S")),
        "method_chart_data": rows_value(&by_type("W")),
        "chart_coordinates": {
            "row": style.get("tnd_row").cloned().unwrap_or(Value::Null),
            "col": style.get("tnd_col").cloned().unwrap_or(Value::Null),
        },
    });

    Ok(TransformedDocument::new(DocumentType::LearningStyle, content, summary).with_metadata(meta))
}

fn competency_analysis(src: &Sources<'_>) -> Result<TransformedDocument> {
    let competencies = src.rows("competencyAnalysisQuery");
    if competencies.is_empty() {
        return Err(missing(
            DocumentType::CompetencyAnalysis,
            "competencyAnalysisQuery returned no data",
        ));
    }

    let mut subjects: HashMap<&str, Vec<Value>> = HashMap::new();
    for sub in src.rows("competencySubjectsQuery") {
        subjects.entry(text(sub, "competency_name")).or_default().push(json!({
            "group": text(sub, "subject_group"),
            "area": text(sub, "subject_area"),
            "name": text(sub, "subject_name"),
            "explain": text(sub, "subject_explain"),
        }));
    }

    let top: Vec<Value> = competencies
        .iter()
        .map(|c| {
            let name = text(c, "competency_name");
            json!({
                "name": name,
                "score": c.get("score").cloned().unwrap_or(Value::Null),
                "rank": c.get("rank").cloned().unwrap_or(Value::Null),
                "percentile": c.get("percentile").cloned().unwrap_or(Value::Null),
                "level": skill_level(number(c, "percentile")),
                "description": text(c, "description"),
                "recommended_subjects": subjects.get(name).cloned().unwrap_or_default(),
            })
        })
        .collect();

    let strongest = &competencies[0];
    let strongest_name = text(strongest, "competency_name");
    let average_percentile = round_to(
        competencies.iter().map(|c| number(c, "percentile")).sum::<f64>() / competencies.len() as f64,
        1,
    );

    let mut parts = vec![format!(
        "The strongest competency is '{}', at the {} percentile.",
        strongest_name,
        number(strongest, "percentile")
    )];
    if competencies.len() > 1 {
        parts.push(format!(
            "{} are also strong.",
            join_names(competencies.iter().skip(1).take(2), "competency_name")
        ));
    }
    if let Some(subject) = subjects.get(strongest_name).and_then(|s| s.first()) {
        parts.push(format!(
            "To build on '{}', studying '{}' is recommended.",
            strongest_name,
            subject["name"].as_str().unwrap_or_default()
        ));
    }

    let meta = metadata(
        &["competencyAnalysisQuery", "competencySubjectsQuery"],
        json!({
            "competencies_analyzed": competencies.len(),
            "strongest_competency_name": strongest_name,
        }),
    );

    let content = json!({
        "top_competencies": top,
        "competency_summary": {
            "strongest_competency": strongest_name,
            "average_percentile": average_percentile,
        },
    });

    Ok(TransformedDocument::new(DocumentType::CompetencyAnalysis, content, parts.join(" "))
        .with_metadata(meta))
}

fn preference_analysis(src: &Sources<'_>) -> Result<TransformedDocument> {
    let preferences = src.rows("preferenceDataQuery");
    let jobs = src.rows("preferenceJobsQuery");
    if preferences.is_empty() && jobs.is_empty() {
        return Err(missing(DocumentType::PreferenceAnalysis, "no image preference data found"));
    }

    let stats = src.first("imagePreferenceStatsQuery").map(|s| {
        json!({
            "total_image_count": s.get("total_image_count").cloned().unwrap_or(Value::Null),
            "response_count": s.get("response_count").cloned().unwrap_or(Value::Null),
            "response_rate": s.get("response_rate").cloned().unwrap_or(Value::Null),
        })
    });

    let jobs_for = |pref_type: &str| -> Vec<Row> {
        jobs.iter()
            .filter(|j| text(j, "preference_type") == pref_type)
            .cloned()
            .collect()
    };

    let mut parts = Vec::new();
    if !preferences.is_empty() {
        parts.push(format!(
            "The most preferred image categories are {}.",
            join_names(preferences.iter().take(3), "preference_name")
        ));
    }
    if let Some(first) = jobs.first() {
        parts.push(format!(
            "{} jobs match these preferences, including '{}'.",
            jobs.len(),
            text(first, "jo_name")
        ));
    }

    let meta = metadata(
        &["imagePreferenceStatsQuery", "preferenceDataQuery", "preferenceJobsQuery"],
        json!({ "preferences_analyzed": preferences.len(), "preference_jobs_count": jobs.len() }),
    );

    let content = json!({
        "image_preference_stats": stats.unwrap_or(Value::Null),
        "preferences": rows_value(preferences),
        "preference_jobs": {
            "rimg1": rows_value(&jobs_for("rimg1")),
            "rimg2": rows_value(&jobs_for("rimg2")),
            "rimg3": rows_value(&jobs_for("rimg3")),
        },
    });

    Ok(TransformedDocument::new(DocumentType::PreferenceAnalysis, content, parts.join(" "))
        .with_metadata(meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(entries: Value) -> QueryData {
        entries
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| {
                let rows = v
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|r| r.as_object().cloned().unwrap())
                    .collect();
                (k.clone(), rows)
            })
            .collect()
    }

    #[test]
    fn test_skill_level_bands() {
        assert_eq!(skill_level(90.0), "Excellent (top 10%)");
        assert_eq!(skill_level(75.0), "Very good (top 25%)");
        assert_eq!(skill_level(50.0), "Average (top 50%)");
        assert_eq!(skill_level(25.0), "Needs improvement");
        assert_eq!(skill_level(24.9), "Needs significant improvement");
    }

    #[test]
    fn test_personality_matches_top_tendency_by_prefix() {
        let d = data(json!({
            "tendencyQuery": [{"Tnd1": "Creative", "Tnd2": "Analytic"}],
            "topTendencyQuery": [
                {"rank": 1, "tendency_name": "Creative type", "code": "T01", "score": 91},
                {"rank": 2, "tendency_name": "Analytic type", "code": "T02", "score": 80}
            ]
        }));
        let doc = AssessmentTransformer::new()
            .build(DocumentType::PersonalityProfile, &d)
            .unwrap();
        assert_eq!(doc.content["primary_tendency"]["code"], "T01");
        assert_eq!(doc.content["secondary_tendency"]["name"], "Analytic type");
        assert_eq!(doc.metadata["primary_tendency_code"], "T01");
        assert!(doc.summary_text.contains("Creative"));
    }

    #[test]
    fn test_thinking_skills_sorted_and_averaged() {
        let d = data(json!({
            "thinkingSkillsQuery": [
                {"skill_name": "Memory", "score": 60, "percentile": 55},
                {"skill_name": "Logic", "score": 90, "percentile": 95}
            ]
        }));
        let doc = AssessmentTransformer::new().build(DocumentType::ThinkingSkills, &d).unwrap();
        assert_eq!(doc.content["core_thinking_skills"][0]["skill_name"], "Logic");
        assert_eq!(doc.content["overall_analysis"]["average_score"], 75.0);
        assert_eq!(doc.content["overall_analysis"]["overall_level"], "Very good (top 25%)");
    }

    #[tokio::test]
    async fn test_transform_all_skips_missing_sources() {
        let d = data(json!({
            "tendencyQuery": [{"Tnd1": "Creative", "Tnd2": "Analytic"}],
            "careerRecommendationQuery": [{"job_code": "J1", "job_name": "Designer", "match_score": 88}]
        }));
        let docs = AssessmentTransformer::new().transform_all(&d).await.unwrap();
        let types: Vec<_> = docs.iter().map(|d| d.doc_type).collect();
        assert_eq!(
            types,
            vec![DocumentType::PersonalityProfile, DocumentType::CareerRecommendations]
        );
        assert_eq!(docs[1].content["recommended_careers"][0]["job_name"], "Designer");
    }

    #[test]
    fn test_preference_jobs_grouped_by_type() {
        let d = data(json!({
            "preferenceDataQuery": [{"preference_name": "Nature", "question_count": 5,
                "response_rate": 60, "rank": 1, "description": "d"}],
            "preferenceJobsQuery": [
                {"preference_name": "Nature", "preference_type": "rimg1", "jo_name": "Ranger"},
                {"preference_name": "City", "preference_type": "rimg2", "jo_name": "Planner"}
            ]
        }));
        let doc = AssessmentTransformer::new()
            .build(DocumentType::PreferenceAnalysis, &d)
            .unwrap();
        assert_eq!(doc.content["preference_jobs"]["rimg1"][0]["jo_name"], "Ranger");
        assert_eq!(doc.content["preference_jobs"]["rimg3"], json!([]));
        assert!(doc.content["image_preference_stats"].is_null());
    }
}
