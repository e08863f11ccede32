use serde_json::Value;

use super::result::Row;

/// Normalise raw rows: drop null and empty-string fields, trim the remaining
/// strings, and drop rows left without fields.
///
/// Emptiness is checked before trimming, so a whitespace-only value survives
/// as an empty string.
pub fn clean_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .filter_map(|row| {
            let cleaned: Row = row
                .into_iter()
                .filter(|(_, v)| !is_blank(v))
                .map(|(k, v)| match v {
                    Value::String(s) => (k, Value::String(s.trim().to_string())),
                    other => (k, other),
                })
                .collect();
            (!cleaned.is_empty()).then_some(cleaned)
        })
        .collect()
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
