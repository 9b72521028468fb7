//! Driver-level scalars and their normalization into [`Value`]

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::Value;

/// Scalar as decoded from the wire, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bytes(Vec<u8>),
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

/// Map a raw scalar onto the closed [`Value`] set
///
/// Timestamps become RFC 3339 text in UTC with up to nine fractional digits,
/// trailing zeros dropped.
/// Unsigned integers that do not fit `i64` are kept exact as decimal text.
pub fn normalize(raw: RawValue) -> Value {
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        },
        RawValue::Text(text) => Value::Text(text),
        RawValue::Int(i) => Value::Integer(i),
        RawValue::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        RawValue::Float(f) => Value::Float(f),
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Timestamp(ts) => Value::Text(format_timestamp(&ts)),
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    let full = ts.to_rfc3339_opts(SecondsFormat::Nanos, true);
    match full.strip_suffix('Z').and_then(|s| s.split_once('.')) {
        Some((seconds, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}Z", seconds)
            } else {
                format!("{}.{}Z", seconds, fraction)
            }
        }
        None => full,
    }
}
