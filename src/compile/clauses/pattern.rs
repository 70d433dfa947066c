//! Pattern clauses: wildcard containment and regular expressions

use crate::compile::escape::contains_pattern;
use serde_json::{json, Value};

/// Containment match: the operand is escaped and wrapped in wildcards
pub fn wildcard_clause(field: &str, operand: &str) -> Value {
    json!({ "wildcard": { field: contains_pattern(operand) } })
}

/// Regular-expression match; the operand is a pattern by contract and is
/// passed verbatim
pub fn regexp_clause(field: &str, pattern: &str) -> Value {
    json!({ "regexp": { field: pattern } })
}
