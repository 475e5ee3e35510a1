//! Logical content of a backup
//!
//! A [`Snapshot`] maps every table discovered at backup time to either its
//! ordered rows or an error marker recording why the table could not be
//! read. The JSON shape is part of the artifact format:
//!
//! ```json
//! {
//!   "exported_at": "2024-01-01T00:00:00Z",
//!   "data": {
//!     "widgets": [{"id": 1, "name": "A"}],
//!     "broken":  {"__error": "no such table"}
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{BackupError, BackupResult};

/// Key of the marker object recorded for a table that failed to dump.
pub const ERROR_MARKER_KEY: &str = "__error";

/// One row: column name to scalar value, in column order.
pub type Row = serde_json::Map<String, Value>;

/// The content recorded for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableData {
    Rows(Vec<Row>),
    Failed {
        #[serde(rename = "__error")]
        error: String,
    },
}

impl TableData {
    pub fn failed(error: impl Into<String>) -> Self {
        TableData::Failed {
            error: error.into(),
        }
    }

    /// Rows of the table, or `None` for an error marker.
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            TableData::Rows(rows) => Some(rows),
            TableData::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TableData::Rows(_) => None,
            TableData::Failed { error } => Some(error),
        }
    }

    /// Column list for inserts, taken from the first row.
    pub fn columns(&self) -> Vec<String> {
        self.rows()
            .and_then(|rows| rows.first())
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// A full database snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub exported_at: DateTime<Utc>,
    pub data: BTreeMap<String, TableData>,
}

impl Snapshot {
    pub fn new(exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            data: BTreeMap::new(),
        }
    }

    pub fn insert_table(&mut self, name: impl Into<String>, table: TableData) {
        self.data.insert(name.into(), table);
    }

    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.data.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Number of tables recorded with an error marker.
    pub fn failed_tables(&self) -> usize {
        self.data
            .values()
            .filter(|table| table.error().is_some())
            .count()
    }

    pub fn to_json_bytes(&self) -> BackupResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| BackupError::Serialization(e.to_string()))
    }

    /// Parse and validate a decrypted payload.
    ///
    /// Validation is strict so that every restore path can rely on the
    /// shape: `data` must be an object whose values are arrays of row
    /// objects or an error marker, and every row of a table must carry the
    /// same set of columns as its first row.
    pub fn from_json_bytes(bytes: &[u8]) -> BackupResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| BackupError::invalid_payload(format!("not valid JSON ({})", e)))?;

        validate_shape(&value)?;

        serde_json::from_value(value).map_err(|e| BackupError::invalid_payload(e.to_string()))
    }
}

fn validate_shape(value: &Value) -> BackupResult<()> {
    let root = value
        .as_object()
        .ok_or_else(|| BackupError::invalid_payload("top level is not an object"))?;

    match root.get("exported_at").and_then(Value::as_str) {
        Some(raw) => {
            DateTime::parse_from_rfc3339(raw).map_err(|e| {
                BackupError::invalid_payload(format!("exported_at is not RFC 3339 ({})", e))
            })?;
        }
        None => return Err(BackupError::invalid_payload("missing exported_at timestamp")),
    }

    let data = root
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| BackupError::invalid_payload("missing data object"))?;

    for (table, content) in data {
        match content {
            Value::Array(rows) => validate_rows(table, rows)?,
            Value::Object(marker)
                if marker.len() == 1
                    && marker.get(ERROR_MARKER_KEY).is_some_and(Value::is_string) => {}
            _ => {
                return Err(BackupError::invalid_payload(format!(
                    "table '{}' is neither a row array nor an error marker",
                    table
                )));
            }
        }
    }

    Ok(())
}

fn validate_rows(table: &str, rows: &[Value]) -> BackupResult<()> {
    let mut expected: Option<&serde_json::Map<String, Value>> = None;

    for (index, row) in rows.iter().enumerate() {
        let row = row.as_object().ok_or_else(|| {
            BackupError::invalid_payload(format!(
                "table '{}' row {} is not an object",
                table, index
            ))
        })?;

        match expected {
            None => expected = Some(row),
            Some(first) => {
                let same_columns =
                    first.len() == row.len() && row.keys().all(|key| first.contains_key(key));
                if !same_columns {
                    return Err(BackupError::invalid_payload(format!(
                        "table '{}' row {} has columns that differ from row 0",
                        table, index
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> BackupResult<Snapshot> {
        Snapshot::from_json_bytes(value.to_string().as_bytes())
    }

    #[test]
    fn test_widgets_snapshot_roundtrip() {
        let raw = r#"{"exported_at":"2024-01-01T00:00:00Z","data":{"widgets":[{"id":1,"name":"A"}]}}"#;
        let snapshot = Snapshot::from_json_bytes(raw.as_bytes()).unwrap();

        let rows = snapshot.table("widgets").and_then(TableData::rows).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[0]["name"], json!("A"));

        let reparsed = Snapshot::from_json_bytes(&snapshot.to_json_bytes().unwrap()).unwrap();
        assert_eq!(reparsed, snapshot);
    }

    #[test]
    fn test_error_marker_survives_roundtrip() {
        let mut snapshot = Snapshot::new(Utc::now());
        snapshot.insert_table("broken", TableData::failed("no such table: broken"));
        snapshot.insert_table("empty", TableData::Rows(Vec::new()));

        let json: Value = serde_json::from_slice(&snapshot.to_json_bytes().unwrap()).unwrap();
        assert_eq!(json["data"]["broken"], json!({"__error": "no such table: broken"}));
        assert_eq!(json["data"]["empty"], json!([]));

        let reparsed = Snapshot::from_json_bytes(&snapshot.to_json_bytes().unwrap()).unwrap();
        assert_eq!(reparsed.failed_tables(), 1);
        assert_eq!(reparsed.table("broken").unwrap().error(), Some("no such table: broken"));
    }

    #[test]
    fn test_column_order_follows_first_row() {
        let snapshot = parse(json!({
            "exported_at": "2024-01-01T00:00:00Z",
            "data": {"t": [{"z": 1, "a": 2, "m": 3}]}
        }))
        .unwrap();
        assert_eq!(snapshot.table("t").unwrap().columns(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_missing_data_is_invalid_payload() {
        let result = parse(json!({"exported_at": "2024-01-01T00:00:00Z"}));
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));
    }

    #[test]
    fn test_data_of_wrong_type_is_invalid_payload() {
        let result = parse(json!({"exported_at": "2024-01-01T00:00:00Z", "data": [1, 2]}));
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));

        let result = parse(json!({"exported_at": "2024-01-01T00:00:00Z", "data": {"t": "rows"}}));
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));

        let result = parse(json!({"exported_at": "2024-01-01T00:00:00Z", "data": {"t": [1]}}));
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));
    }

    #[test]
    fn test_heterogeneous_columns_rejected() {
        let result = parse(json!({
            "exported_at": "2024-01-01T00:00:00Z",
            "data": {"widgets": [{"id": 1, "name": "A"}, {"id": 2, "label": "B"}]}
        }));
        match result {
            Err(BackupError::InvalidPayload { reason }) => {
                assert!(reason.contains("widgets"));
                assert!(reason.contains("row 1"));
            }
            other => panic!("expected InvalidPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_same_columns_in_different_order_accepted() {
        let result = parse(json!({
            "exported_at": "2024-01-01T00:00:00Z",
            "data": {"widgets": [{"id": 1, "name": "A"}, {"name": "B", "id": 2}]}
        }));
        assert!(result.is_ok());
    }

    #[test]
    fn test_bad_timestamp_and_garbage_rejected() {
        let result = parse(json!({"exported_at": "yesterday", "data": {}}));
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));

        let result = Snapshot::from_json_bytes(b"\x00\x01not json");
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));
    }

    #[test]
    fn test_marker_with_extra_keys_rejected() {
        let result = parse(json!({
            "exported_at": "2024-01-01T00:00:00Z",
            "data": {"t": {"__error": "boom", "rows": []}}
        }));
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));
    }
}
