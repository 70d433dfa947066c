//! Term-level clauses: exact match, set membership, existence

use serde_json::{json, Value};

/// Untokenized single-term match
///
/// The field name arrives already resolved to its exact-capable variant.
pub fn term_clause(field: &str, value: &Value) -> Value {
    json!({ "term": { field: value } })
}

/// Untokenized set membership
pub fn terms_clause(field: &str, values: &[Value]) -> Value {
    json!({ "terms": { field: values } })
}

/// Field presence test
pub fn exists_clause(field: &str) -> Value {
    json!({ "exists": { "field": field } })
}
