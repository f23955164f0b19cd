//! Line codec for the append-only URL log.
//!
//! Each record is one JSON object on its own line:
//!
//! ```text
//! {"uuid":"u1","short_url":"abc123","original_url":"https://example.com"}
//! {"uuid":"u1","short_url":"abc123","original_url":"https://example.com","is_deleted":true}
//! ```
//!
//! `uuid` is omitted for anonymous records and `is_deleted` only appears on
//! tombstone lines.

use serde::{Deserialize, Serialize};

use crate::domain::entities::UrlRecord;
use crate::error::StoreError;

#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    #[serde(rename = "uuid", default, skip_serializing_if = "String::is_empty")]
    owner_id: String,
    #[serde(rename = "short_url")]
    short_key: String,
    original_url: String,
    #[serde(rename = "is_deleted", default, skip_serializing_if = "is_false")]
    deleted: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Encodes a record as a single line, including the trailing newline.
pub fn encode_line(record: &UrlRecord) -> Result<String, StoreError> {
    let entry = LogEntry {
        owner_id: record.owner_id.clone(),
        short_key: record.short_key.clone(),
        original_url: record.original_url.clone(),
        deleted: record.deleted,
    };

    let mut line = serde_json::to_string(&entry)
        .map_err(|e| StoreError::invalid(format!("failed to encode record: {e}")))?;
    line.push('\n');
    Ok(line)
}

/// Decodes one log line (with or without its trailing newline).
pub fn decode_line(line: &str) -> Result<UrlRecord, StoreError> {
    let entry: LogEntry = serde_json::from_str(line.trim_end())
        .map_err(|e| StoreError::invalid(format!("malformed log line: {e}")))?;

    Ok(UrlRecord {
        owner_id: entry.owner_id,
        short_key: entry.short_key,
        original_url: entry.original_url,
        deleted: entry.deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_active_record() {
        let record = UrlRecord::new("u1", "abc123", "https://example.com");

        let line = encode_line(&record).unwrap();

        assert_eq!(
            line,
            "{\"uuid\":\"u1\",\"short_url\":\"abc123\",\"original_url\":\"https://example.com\"}\n"
        );
    }

    #[test]
    fn test_encode_omits_empty_owner() {
        let record = UrlRecord::new("", "abc123", "https://example.com");

        let line = encode_line(&record).unwrap();

        assert!(!line.contains("uuid"));
    }

    #[test]
    fn test_encode_tombstone() {
        let mut record = UrlRecord::new("u1", "abc123", "https://example.com");
        record.deleted = true;

        let line = encode_line(&record).unwrap();

        assert!(line.contains("\"is_deleted\":true"));
        assert!(decode_line(&line).unwrap().is_deleted());
    }

    #[test]
    fn test_decode_line_without_owner() {
        let record =
            decode_line(r#"{"short_url":"xyz","original_url":"https://rust-lang.org"}"#).unwrap();

        assert_eq!(record.owner_id, "");
        assert_eq!(record.short_key, "xyz");
        assert_eq!(record.original_url, "https://rust-lang.org");
        assert!(!record.deleted);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let record = decode_line(
            r#"{"uuid":"u","short_url":"k","original_url":"https://a.b","created":"yesterday"}"#,
        )
        .unwrap();

        assert_eq!(record.short_key, "k");
    }

    #[test]
    fn test_decode_malformed_line() {
        let err = decode_line("{not json").unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        let err = decode_line(r#"{"uuid":"u1"}"#).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
