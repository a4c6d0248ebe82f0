//! Filter expressions for the record store's query language.

use crate::model::PeriodKey;
use serde_json::Value;

/// Builds the filter for a period-scoped collection.
///
/// The field names here must match the collection schema exactly: the remote
/// query language answers a filter naming unknown fields with zero rows
/// rather than an error, so a typo here turns into a silently empty month.
pub fn period_filter(key: PeriodKey) -> String {
    format!("year = {} && month = {}", key.year, key.month)
}

/// One `field = value` clause of a parsed filter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Clause {
    pub(crate) field: String,
    pub(crate) value: String,
}

/// Parses the `field = value && ...` subset of the filter language used by
/// this app. Returns `None` for anything malformed; the memory store maps
/// that to zero rows, matching the remote store's policy.
pub(crate) fn parse_clauses(filter: &str) -> Option<Vec<Clause>> {
    let mut clauses = Vec::new();
    for part in filter.split("&&") {
        let (field, value) = part.split_once('=')?;
        let field = field.trim();
        let value = value.trim();
        if field.is_empty() || value.is_empty() || !is_identifier(field) {
            return None;
        }
        clauses.push(Clause {
            field: field.to_string(),
            value: unquote(value).to_string(),
        });
    }
    Some(clauses)
}

/// True when every clause matches the record. A clause naming a field the
/// record does not have matches nothing.
pub(crate) fn record_matches(clauses: &[Clause], record: &Value) -> bool {
    clauses.iter().all(|clause| {
        let Some(field) = record.get(&clause.field) else {
            return false;
        };
        match field {
            Value::String(s) => s == &clause.value,
            Value::Number(n) => clause
                .value
                .parse::<f64>()
                .is_ok_and(|v| n.as_f64() == Some(v)),
            Value::Bool(b) => clause.value.parse::<bool>().is_ok_and(|v| *b == v),
            _ => false,
        }
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
            || (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"'))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
