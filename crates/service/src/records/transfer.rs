//! JSON export/import encoding for record sets.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::errors::ServiceError;
use crate::records::domain::{Record, IMPORT_MARKER};

pub const EXPORT_FILE_NAME: &str = "ids_export.json";

/// Rows accepted from an upload, plus the number of rows without a usable id.
#[derive(Debug, Default)]
pub struct ParsedImport {
    pub records: Vec<Record>,
    pub skipped: usize,
}

/// Pretty-printed JSON array, the same shape `parse_import` accepts.
pub fn encode_export(records: &[Record]) -> Result<Vec<u8>, ServiceError> {
    Ok(serde_json::to_vec_pretty(records)?)
}

/// Accepts a bare array, or an object wrapping it in `entries`, `items` or
/// `ids`. Rows may be objects `{id, added_by?, note?, created_at?}` or bare
/// id strings.
pub fn parse_import(bytes: &[u8], now: DateTime<Utc>) -> Result<ParsedImport, ServiceError> {
    let doc: Value = serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::validation(format!("import file is not valid JSON: {e}")))?;
    let rows = match doc {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => ["entries", "items", "ids"]
            .iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(rows)) => Some(rows),
                _ => None,
            })
            .ok_or_else(|| ServiceError::validation("import file has no entries array"))?,
        _ => return Err(ServiceError::validation("import file must be a JSON array")),
    };

    let mut parsed = ParsedImport::default();
    for row in rows {
        match row_to_record(&row, now) {
            Some(r) => parsed.records.push(r),
            None => parsed.skipped += 1,
        }
    }
    Ok(parsed)
}

fn row_to_record(row: &Value, now: DateTime<Utc>) -> Option<Record> {
    let (id, obj) = match row {
        Value::Object(obj) => (obj.get("id").and_then(text)?, Some(obj)),
        other => (text(other)?, None),
    };
    let field = |name: &str| obj.and_then(|o| o.get(name)).and_then(text);
    Some(Record {
        id,
        added_by: field("added_by").unwrap_or_else(|| IMPORT_MARKER.to_string()),
        note: obj.and_then(|o| o.get("note")).and_then(Value::as_str).unwrap_or_default().to_string(),
        created_at: field("created_at").and_then(|s| parse_timestamp(&s)).unwrap_or(now),
    })
}

/// Non-blank string (trimmed) or number rendered as text.
fn text(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap_or_else(Utc::now)
    }

    #[test]
    fn defaults_and_skips() -> Result<(), ServiceError> {
        let body = br#"[
            {"id": "A1", "added_by": "alice", "note": "n", "created_at": "2023-06-01T10:00:00Z"},
            {"id": "A2"},
            {"id": "   "},
            {"note": "orphan"},
            {"id": 42, "added_by": null}
        ]"#;
        let parsed = parse_import(body, now())?;
        assert_eq!(parsed.skipped, 2);
        let ids: Vec<_> = parsed.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["A1", "A2", "42"]);

        let a1 = &parsed.records[0];
        assert_eq!(a1.added_by, "alice");
        assert_eq!(a1.note, "n");
        assert_eq!(a1.created_at, Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap());

        let a2 = &parsed.records[1];
        assert_eq!(a2.added_by, IMPORT_MARKER);
        assert_eq!(a2.note, "");
        assert_eq!(a2.created_at, now());
        Ok(())
    }

    #[test]
    fn wrapped_documents_and_bare_ids() -> Result<(), ServiceError> {
        let parsed = parse_import(br#"{"entries": [{"id": "E1"}]}"#, now())?;
        assert_eq!(parsed.records[0].id, "E1");

        let parsed = parse_import(br#"{"ids": ["X1", "", "X2"]}"#, now())?;
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped, 1);
        Ok(())
    }

    #[test]
    fn naive_postgres_timestamps_are_utc() {
        let ts = parse_timestamp("2024-03-04 05:06:07.123").expect("parsed");
        assert_eq!(ts.timestamp(), Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap().timestamp());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn malformed_upload_is_validation_error() {
        assert!(matches!(parse_import(b"nope", now()), Err(ServiceError::Validation(_))));
        assert!(matches!(parse_import(b"\"str\"", now()), Err(ServiceError::Validation(_))));
        assert!(matches!(parse_import(br#"{"other": 1}"#, now()), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn export_parses_back_to_the_same_records() -> Result<(), ServiceError> {
        let mut r = Record::new("ABC123", "alice");
        r.note = "flagged".into();
        let bytes = encode_export(std::slice::from_ref(&r))?;
        let parsed = parse_import(&bytes, now())?;
        assert_eq!(parsed.records, vec![r]);
        Ok(())
    }
}
