//! Statements against the legacy `mwd_*` schema
//!
//! `$1` is the assessment sequence id in every statement.

use super::catalog::QueryKind;

pub fn statement(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Tendency => TENDENCY,
        QueryKind::TopTendency => TOP_TENDENCY,
        QueryKind::ThinkingSkills => THINKING_SKILLS,
        QueryKind::CareerRecommendation => CAREER_RECOMMENDATION,
        QueryKind::BottomTendency => BOTTOM_TENDENCY,
        QueryKind::PersonalityDetail => PERSONALITY_DETAIL,
        QueryKind::StrengthsWeaknesses => STRENGTHS_WEAKNESSES,
        QueryKind::LearningStyle => LEARNING_STYLE,
        QueryKind::LearningStyleChart => LEARNING_STYLE_CHART,
        QueryKind::CompetencyAnalysis => COMPETENCY_ANALYSIS,
        QueryKind::CompetencySubjects => COMPETENCY_SUBJECTS,
        QueryKind::CompetencyJobs => COMPETENCY_JOBS,
        QueryKind::CompetencyJobMajors => COMPETENCY_JOB_MAJORS,
        QueryKind::Duties => DUTIES,
        QueryKind::ImagePreferenceStats => IMAGE_PREFERENCE_STATS,
        QueryKind::PreferenceData => PREFERENCE_DATA,
        QueryKind::PreferenceJobs => PREFERENCE_JOBS,
    }
}

const TENDENCY: &str = r#"
SELECT max(CASE WHEN rk = 1 THEN tnd END) AS "Tnd1",
       max(CASE WHEN rk = 2 THEN tnd END) AS "Tnd2"
FROM (
  SELECT replace(qa.qua_name, '형', '') AS tnd, 1 AS rk
  FROM mwd_resval rv JOIN mwd_question_attr qa ON qa.qua_code = rv.rv_tnd1
  WHERE rv.anp_seq = $1
  UNION
  SELECT replace(qa.qua_name, '형', '') AS tnd, 2 AS rk
  FROM mwd_resval rv JOIN mwd_question_attr qa ON qa.qua_code = rv.rv_tnd2
  WHERE rv.anp_seq = $1
) t
"#;

const TOP_TENDENCY: &str = r#"
SELECT qa.qua_name AS tendency_name,
       sc1.sc1_rank AS rank,
       sc1.qua_code AS code,
       (round(sc1.sc1_rate * 100))::int AS score
FROM mwd_score1 sc1 JOIN mwd_question_attr qa ON qa.qua_code = sc1.qua_code
WHERE sc1.anp_seq = $1 AND sc1.sc1_step = 'tnd' AND sc1.sc1_rank <= 3
ORDER BY sc1.sc1_rank
"#;

const THINKING_SKILLS: &str = r#"
SELECT qa.qua_name AS skill_name,
       coalesce(round(sc1.sc1_rate * 100), 0)::int AS score,
       coalesce(round(sc1.sc1_rate * 100), 0)::int AS percentile
FROM mwd_score1 sc1 JOIN mwd_question_attr qa ON qa.qua_code = sc1.qua_code
WHERE sc1.anp_seq = $1 AND sc1.sc1_step = 'thk'
ORDER BY qa.qua_name
"#;

const CAREER_RECOMMENDATION: &str = r#"
SELECT jo.jo_code AS job_code,
       jo.jo_name AS job_name,
       coalesce(jo.jo_outline, '') AS job_outline,
       coalesce(jo.jo_mainbusiness, '') AS main_business,
       80::int AS match_score
FROM mwd_resjob rj JOIN mwd_job jo ON jo.jo_code = rj.rej_code
WHERE rj.anp_seq = $1 AND rj.rej_kind = 'rtnd' AND rj.rej_rank <= 7
ORDER BY rj.rej_rank
"#;

const BOTTOM_TENDENCY: &str = r#"
SELECT qa.qua_name AS tendency_name,
       sc1.sc1_rank AS rank,
       sc1.qua_code AS code,
       (round(sc1.sc1_rate * 100))::int AS score
FROM mwd_score1 sc1 JOIN mwd_question_attr qa ON qa.qua_code = sc1.qua_code
WHERE sc1.anp_seq = $1 AND sc1.sc1_step = 'tnd'
  AND sc1.sc1_rank > (SELECT count(*) FROM mwd_score1 WHERE anp_seq = $1 AND sc1_step = 'tnd') - 3
ORDER BY sc1.sc1_rank DESC
"#;

const PERSONALITY_DETAIL: &str = r#"
SELECT qu.qu_explain AS detail_description,
       sc1.sc1_rank AS rank,
       an.an_wei AS weight,
       sc1.qua_code AS code
FROM mwd_answer an
JOIN mwd_question qu ON qu.qu_code = an.qu_code
JOIN (SELECT qua_code, sc1_rank FROM mwd_score1
      WHERE anp_seq = $1 AND sc1_step = 'tnd' AND sc1_rank <= 3) sc1
  ON qu.qu_kind2 = sc1.qua_code
WHERE an.anp_seq = $1
  AND qu.qu_use = 'Y' AND qu.qu_qusyn = 'Y' AND qu.qu_kind1 = 'tnd'
  AND an.an_wei >= 4
ORDER BY sc1.sc1_rank, an.an_wei DESC
"#;

const STRENGTHS_WEAKNESSES: &str = r#"
(
  SELECT qu.qu_explain AS description, 'strength' AS type, an.an_wei AS weight
  FROM mwd_answer an
  JOIN mwd_question qu ON an.qu_code = qu.qu_code
  JOIN (SELECT qua_code FROM mwd_score1
        WHERE anp_seq = $1 AND sc1_step = 'tnd' AND sc1_rank <= 3) top_tnd
    ON qu.qu_kind2 = top_tnd.qua_code
  WHERE an.anp_seq = $1 AND qu.qu_kind1 = 'tnd' AND an.an_wei >= 4
  ORDER BY an.an_wei DESC
  LIMIT 5
)
UNION ALL
(
  SELECT qu.qu_explain AS description, 'weakness' AS type, an.an_wei AS weight
  FROM mwd_answer an
  JOIN mwd_question qu ON an.qu_code = qu.qu_code
  JOIN (SELECT qua_code FROM mwd_score1
        WHERE anp_seq = $1 AND sc1_step = 'tnd'
          AND sc1_rank > (SELECT count(*) FROM mwd_score1 WHERE anp_seq = $1 AND sc1_step = 'tnd') - 3) bottom_tnd
    ON qu.qu_kind2 = bottom_tnd.qua_code
  WHERE an.anp_seq = $1 AND qu.qu_kind1 = 'tnd' AND an.an_wei <= 2
  ORDER BY an.an_wei ASC
  LIMIT 5
)
"#;

const LEARNING_STYLE: &str = r#"
SELECT
  (SELECT replace(qa.qua_name, '형', '') FROM mwd_question_attr qa WHERE qa.qua_code = rv.rv_tnd1) AS tnd1_name,
  replace(ts1.tes_study_tendency, 'OOO', pe.pe_name || '님') AS tnd1_study_tendency,
  replace(ts1.tes_study_way, 'OOO', pe.pe_name || '님') AS tnd1_study_way,
  (SELECT replace(qa.qua_name, '형', '') FROM mwd_question_attr qa WHERE qa.qua_code = rv.rv_tnd2) AS tnd2_name,
  replace(ts2.tes_study_tendency, 'OOO', pe.pe_name || '님') AS tnd2_study_tendency,
  replace(ts2.tes_study_way, 'OOO', pe.pe_name || '님') AS tnd2_study_way,
  CAST(substring(rv.rv_tnd1, 4, 2) AS INT) - 10 AS tnd_row,
  CAST(substring(rv.rv_tnd2, 4, 2) AS INT) - 10 AS tnd_col
FROM mwd_resval rv
JOIN mwd_tendency_study ts1 ON ts1.qua_code = rv.rv_tnd1
JOIN mwd_tendency_study ts2 ON ts2.qua_code = rv.rv_tnd2
JOIN mwd_answer_progress ap ON ap.anp_seq = rv.anp_seq
JOIN mwd_account ac ON ac.ac_gid = ap.ac_gid
JOIN mwd_person pe ON pe.pe_seq = ac.pe_seq
WHERE rv.anp_seq = $1
"#;

const LEARNING_STYLE_CHART: &str = r#"
SELECT
  sr.sw_kindname AS item_name,
  CAST(sr.sw_rate * 100 AS INT) AS item_rate,
  CASE
    WHEN sr.sw_color LIKE '#%' THEN sr.sw_color
    ELSE replace(replace(sr.sw_color, 'rgb(', 'rgba('), ')', ', 0.8)')
  END AS item_color,
  sr.sw_type AS item_type
FROM mwd_resval rv
JOIN mwd_studyway_rate sr ON sr.qua_code = rv.rv_tnd1
WHERE rv.anp_seq = $1
ORDER BY sr.sw_type, sr.sw_kind
"#;

const COMPETENCY_ANALYSIS: &str = r#"
WITH ranked_scores AS (
  SELECT anp_seq, qua_code, sc1_rate,
         percent_rank() OVER (PARTITION BY qua_code ORDER BY sc1_rate) AS percentile_rank
  FROM mwd_score1
  WHERE sc1_step = 'tal'
)
SELECT
  qa.qua_name AS competency_name,
  (round(sc1.sc1_rate * 100))::int AS score,
  sc1.sc1_rank AS rank,
  replace(qe.que_explain, 'OOO', pe.pe_name || '님') AS description,
  (round(rs.percentile_rank * 100))::int AS percentile
FROM mwd_score1 sc1
JOIN mwd_question_attr qa ON qa.qua_code = sc1.qua_code
JOIN mwd_question_explain qe ON qe.qua_code = sc1.qua_code
JOIN mwd_answer_progress ap ON ap.anp_seq = sc1.anp_seq
JOIN mwd_account ac ON ac.ac_gid = ap.ac_gid
JOIN mwd_person pe ON pe.pe_seq = ac.pe_seq
JOIN ranked_scores rs ON rs.anp_seq = sc1.anp_seq AND rs.qua_code = sc1.qua_code
WHERE sc1.anp_seq = $1 AND sc1.sc1_step = 'tal' AND sc1.sc1_rank <= 5
ORDER BY sc1.sc1_rank
"#;

const COMPETENCY_SUBJECTS: &str = r#"
WITH top5 AS (
  SELECT sc1.sc1_rank, sc1.qua_code, qa.qua_name
  FROM mwd_score1 sc1 JOIN mwd_question_attr qa ON sc1.qua_code = qa.qua_code
  WHERE sc1.anp_seq = $1 AND sc1.sc1_step = 'tal' AND sc1.sc1_rank <= 5
)
SELECT
  t.sc1_rank AS competency_rank, t.qua_name AS competency_name,
  t.qua_code AS competency_code, mcs.mcs_group AS subject_group,
  mcs.mcs_area AS subject_area, mcs.mcs_name AS subject_name,
  mcs.mcs_explain AS subject_explain, mcs.mcs_rank AS subject_rank
FROM mwd_competency_subject_map mcs
JOIN top5 t ON mcs.tal_code = t.qua_code
WHERE mcs.mcs_use = 'Y'
ORDER BY t.sc1_rank, mcs.mcs_rank
"#;

const COMPETENCY_JOBS: &str = r#"
SELECT jo.jo_name, jo.jo_outline, jo.jo_mainbusiness, rj.rej_rank AS rank
FROM mwd_resjob rj JOIN mwd_job jo ON jo.jo_code = rj.rej_code
WHERE rj.anp_seq = $1 AND rj.rej_kind = 'rtal' AND rj.rej_rank <= 7
ORDER BY rj.rej_rank
"#;

const COMPETENCY_JOB_MAJORS: &str = r#"
SELECT jo.jo_name, string_agg(ma.ma_name, ', ' ORDER BY ma.ma_name) AS major
FROM mwd_resjob rj
JOIN mwd_job jo ON jo.jo_code = rj.rej_code
JOIN mwd_job_major_map jmm ON jmm.jo_code = rj.rej_code
JOIN mwd_major ma ON ma.ma_code = jmm.ma_code
WHERE rj.anp_seq = $1 AND rj.rej_kind = 'rtal' AND rj.rej_rank <= 7
GROUP BY jo.jo_code, jo.jo_name, rj.rej_rank
ORDER BY rj.rej_rank
"#;

const DUTIES: &str = r#"
SELECT du.du_name, du.du_outline AS du_content,
       du.du_department AS majors, 'IT 계열' AS jf_name,
       (100 - (rd.red_rank * 10)) AS match_rate
FROM mwd_resduty rd JOIN mwd_duty du ON du.du_code = rd.red_code
WHERE rd.anp_seq = $1 AND rd.red_kind = 'rtnd' AND rd.red_rank <= 5
ORDER BY rd.red_rank
"#;

const IMAGE_PREFERENCE_STATS: &str = r#"
SELECT rv.rv_imgtcnt AS total_image_count,
       rv.rv_imgrcnt AS response_count,
       (rv.rv_imgresrate * 100)::int AS response_rate
FROM mwd_resval rv
WHERE rv.anp_seq = $1
"#;

const PREFERENCE_DATA: &str = r#"
SELECT qa.qua_name AS preference_name,
       sc1.sc1_qcnt AS question_count,
       (round(sc1.sc1_resrate * 100))::int AS response_rate,
       sc1.sc1_rank AS rank,
       qe.que_explain AS description
FROM mwd_score1 sc1
JOIN mwd_question_attr qa ON qa.qua_code = sc1.qua_code
JOIN mwd_question_explain qe ON qe.qua_code = qa.qua_code AND qe.que_switch = 1
WHERE sc1.anp_seq = $1 AND sc1.sc1_step = 'img' AND sc1.sc1_rank <= 3
ORDER BY sc1.sc1_rank
"#;

const PREFERENCE_JOBS: &str = r#"
SELECT qa.qua_name AS preference_name,
       rj.rej_kind AS preference_type,
       jo.jo_name,
       jo.jo_outline,
       jo.jo_mainbusiness,
       string_agg(ma.ma_name, ', ' ORDER BY ma.ma_name) AS majors
FROM mwd_resjob rj
JOIN mwd_job jo ON jo.jo_code = rj.rej_code
JOIN mwd_job_major_map jmm ON jmm.jo_code = jo.jo_code
JOIN mwd_major ma ON ma.ma_code = jmm.ma_code
LEFT OUTER JOIN mwd_question_attr qa ON qa.qua_code = rj.rej_quacode
WHERE rj.anp_seq = $1
  AND rj.rej_kind IN ('rimg1', 'rimg2', 'rimg3')
  AND rj.rej_rank <= 5
GROUP BY rj.rej_kind, qa.qua_name, jo.jo_code, rj.rej_rank
ORDER BY rj.rej_kind, rj.rej_rank
"#;
