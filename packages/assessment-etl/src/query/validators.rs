//! Per-query shape rules applied to cleaned rows
//!
//! Every rule returns `Err(message)` describing the first violation. Names
//! outside the implemented set only need to be a row list, which any cleaned
//! result already is.

use serde_json::Value;

use super::catalog::QueryKind;
use super::result::Row;

type Check = std::result::Result<(), String>;

/// Validate cleaned rows for `query_name`
pub fn validate_query_rows(query_name: &str, rows: &[Row]) -> Check {
    let Some(kind) = QueryKind::from_name(query_name) else {
        return Ok(());
    };

    match kind {
        QueryKind::Tendency => tendency(rows),
        QueryKind::TopTendency | QueryKind::BottomTendency => ranked_tendency(rows),
        QueryKind::ThinkingSkills => thinking_skills(rows),
        QueryKind::CareerRecommendation => career_recommendation(rows),
        QueryKind::PersonalityDetail => {
            each_has(rows, &["detail_description", "rank", "weight", "code"])
        }
        QueryKind::StrengthsWeaknesses => strengths_weaknesses(rows),
        QueryKind::LearningStyle => learning_style(rows),
        QueryKind::LearningStyleChart => learning_style_chart(rows),
        QueryKind::CompetencyAnalysis => competency_analysis(rows),
        QueryKind::CompetencySubjects => each_has(
            rows,
            &[
                "competency_rank",
                "competency_name",
                "subject_group",
                "subject_area",
                "subject_name",
                "subject_explain",
                "subject_rank",
            ],
        ),
        QueryKind::CompetencyJobs => {
            each_has(rows, &["jo_name", "jo_outline", "jo_mainbusiness", "rank"])
        }
        QueryKind::CompetencyJobMajors => each_has(rows, &["jo_name", "major"]),
        QueryKind::Duties => each_has(
            rows,
            &["du_name", "du_content", "majors", "jf_name", "match_rate"],
        ),
        QueryKind::ImagePreferenceStats => image_preference_stats(rows),
        QueryKind::PreferenceData => each_has(
            rows,
            &[
                "preference_name",
                "question_count",
                "response_rate",
                "rank",
                "description",
            ],
        ),
        QueryKind::PreferenceJobs => preference_jobs(rows),
    }
}

/// Python-style truthiness: null, false, 0, "" and empty containers are falsy
pub(crate) fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn is_int(v: Option<&Value>) -> bool {
    v.map(|v| v.is_i64() || v.is_u64()).unwrap_or(false)
}

fn in_percent_range(v: Option<&Value>) -> bool {
    v.and_then(Value::as_f64)
        .map(|f| (0.0..=100.0).contains(&f))
        .unwrap_or(false)
}

fn has_fields(row: &Row, fields: &[&str]) -> Check {
    match fields.iter().find(|f| !row.contains_key(**f)) {
        Some(missing) => Err(format!("missing required field '{}'", missing)),
        None => Ok(()),
    }
}

fn has_truthy_fields(row: &Row, fields: &[&str]) -> Check {
    match fields
        .iter()
        .find(|f| !row.get(**f).map(is_truthy).unwrap_or(false))
    {
        Some(missing) => Err(format!("missing or empty required field '{}'", missing)),
        None => Ok(()),
    }
}

fn each_has(rows: &[Row], fields: &[&str]) -> Check {
    rows.iter().try_for_each(|row| has_fields(row, fields))
}

fn tendency(rows: &[Row]) -> Check {
    let first = rows.first().ok_or("expected at least one row")?;
    has_truthy_fields(first, &["Tnd1", "Tnd2"])
}

fn ranked_tendency(rows: &[Row]) -> Check {
    for row in rows {
        has_fields(row, &["rank", "tendency_name", "code", "score"])?;
        if !is_int(row.get("rank")) || !row.get("score").map(Value::is_number).unwrap_or(false) {
            return Err("rank must be an integer and score numeric".to_string());
        }
    }
    Ok(())
}

fn thinking_skills(rows: &[Row]) -> Check {
    for row in rows {
        has_fields(row, &["skill_name", "score", "percentile"])?;
        if !in_percent_range(row.get("score")) {
            return Err(format!("invalid score value: {}", row["score"]));
        }
        if !in_percent_range(row.get("percentile")) {
            return Err(format!("invalid percentile value: {}", row["percentile"]));
        }
    }
    Ok(())
}

fn career_recommendation(rows: &[Row]) -> Check {
    if rows.is_empty() {
        return Err("expected at least one recommendation".to_string());
    }
    for row in rows {
        has_truthy_fields(row, &["job_code", "job_name", "match_score"])?;
        if !in_percent_range(row.get("match_score")) {
            return Err(format!("invalid match_score value: {}", row["match_score"]));
        }
    }
    Ok(())
}

fn strengths_weaknesses(rows: &[Row]) -> Check {
    for row in rows {
        has_fields(row, &["description", "type", "weight"])?;
        match row.get("type").and_then(Value::as_str) {
            Some("strength") | Some("weakness") => {}
            other => return Err(format!("invalid type value: {:?}", other)),
        }
    }
    Ok(())
}

fn learning_style(rows: &[Row]) -> Check {
    if rows.len() != 1 {
        return Err(format!("expected exactly one row, got {}", rows.len()));
    }
    let row = &rows[0];
    has_fields(
        row,
        &[
            "tnd1_name",
            "tnd1_study_tendency",
            "tnd1_study_way",
            "tnd2_name",
            "tnd2_study_tendency",
            "tnd2_study_way",
            "tnd_row",
            "tnd_col",
        ],
    )?;
    if !is_int(row.get("tnd_row")) || !is_int(row.get("tnd_col")) {
        return Err("tnd_row and tnd_col must be integers".to_string());
    }
    Ok(())
}

fn learning_style_chart(rows: &[Row]) -> Check {
    for row in rows {
        has_fields(row, &["item_name", "item_rate", "item_color", "item_type"])?;
        if !is_int(row.get("item_rate")) || !in_percent_range(row.get("item_rate")) {
            return Err(format!("invalid item_rate value: {}", row["item_rate"]));
        }
        match row.get("item_type").and_then(Value::as_str) {
            Some("S") | Some("W") => {}
            other => return Err(format!("invalid item_type value: {:?}", other)),
        }
    }
    Ok(())
}

fn competency_analysis(rows: &[Row]) -> Check {
    for row in rows {
        has_fields(
            row,
            &["competency_name", "score", "rank", "description", "percentile"],
        )?;
        if !["score", "rank", "percentile"]
            .iter()
            .all(|f| is_int(row.get(*f)))
        {
            return Err("score, rank and percentile must be integers".to_string());
        }
    }
    Ok(())
}

fn image_preference_stats(rows: &[Row]) -> Check {
    match rows {
        [] => Ok(()),
        [row] => has_fields(row, &["total_image_count", "response_count", "response_rate"]),
        _ => Err(format!("expected at most one row, got {}", rows.len())),
    }
}

fn preference_jobs(rows: &[Row]) -> Check {
    for row in rows {
        has_fields(
            row,
            &[
                "preference_name",
                "preference_type",
                "jo_name",
                "jo_outline",
                "jo_mainbusiness",
                "majors",
            ],
        )?;
        match row.get("preference_type").and_then(Value::as_str) {
            Some("rimg1") | Some("rimg2") | Some("rimg3") => {}
            other => return Err(format!("invalid preference_type value: {:?}", other)),
        }
    }
    Ok(())
}
