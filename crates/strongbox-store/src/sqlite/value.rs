//! Mapping between SQLite storage classes and snapshot values
//!
//! | SQLite  | JSON                             |
//! |---------|----------------------------------|
//! | NULL    | `null`                           |
//! | INTEGER | number                           |
//! | REAL    | number                           |
//! | TEXT    | string                           |
//! | TEXT    | `{"__text_bytes": "<base64>"}`   |
//! | BLOB    | `{"__blob": "<base64>"}`         |
//!
//! TEXT that is not valid UTF-8 is carried as raw bytes and bound back as
//! TEXT. On the way back booleans become 0/1 and any other array or object
//! is stored as its JSON text.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// Key of the wrapper object used for BLOB values.
pub const BLOB_KEY: &str = "__blob";

/// Key of the wrapper object used for TEXT values that are not UTF-8.
pub const TEXT_BYTES_KEY: &str = "__text_bytes";

/// A value ready to bind as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlCell {
    Value(SqlValue),
    /// TEXT storage class with bytes that are not valid UTF-8
    RawText(Vec<u8>),
}

impl ToSql for SqlCell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlCell::Value(value) => ToSqlOutput::Borrowed(value.into()),
            SqlCell::RawText(bytes) => ToSqlOutput::Borrowed(ValueRef::Text(bytes)),
        })
    }
}

fn wrapped(key: &str, bytes: &[u8]) -> Value {
    let mut wrapper = serde_json::Map::new();
    wrapper.insert(key.to_string(), Value::String(BASE64.encode(bytes)));
    Value::Object(wrapper)
}

pub(crate) fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        // NaN and infinities have no JSON form
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => wrapped(TEXT_BYTES_KEY, bytes),
        },
        ValueRef::Blob(bytes) => wrapped(BLOB_KEY, bytes),
    }
}

pub(crate) fn to_sql(value: &Value) -> SqlCell {
    if let Value::Object(map) = value {
        if let Some(bytes) = wrapped_payload(map, BLOB_KEY) {
            return SqlCell::Value(SqlValue::Blob(bytes));
        }
        if let Some(bytes) = wrapped_payload(map, TEXT_BYTES_KEY) {
            return SqlCell::RawText(bytes);
        }
    }
    SqlCell::Value(scalar_to_sql(value))
}

fn scalar_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or_else(|| SqlValue::Text(n.to_string())),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Object(_) | Value::Array(_) => SqlValue::Text(value.to_string()),
    }
}

fn wrapped_payload(map: &serde_json::Map<String, Value>, key: &str) -> Option<Vec<u8>> {
    if map.len() != 1 {
        return None;
    }
    map.get(key)
        .and_then(Value::as_str)
        .and_then(|encoded| BASE64.decode(encoded).ok())
}
