//! Nested-object query clause
//!
//! The inner query arrives already compiled and path-scoped; this builder
//! only assembles the wrapper.

use crate::condition::NestedOptions;
use serde_json::{json, Map, Value};

/// Wrap a compiled inner query in a nested scope
pub fn nested_clause(
    path: &str,
    inner: Value,
    opts: &NestedOptions,
    with_inner_hits: bool,
) -> Value {
    let mut spec = Map::new();
    spec.insert("path".to_string(), json!(path));
    spec.insert("query".to_string(), inner);
    if let Some(score_mode) = opts.score_mode {
        spec.insert("score_mode".to_string(), json!(score_mode.as_str()));
    }
    if opts.ignore_unmapped {
        spec.insert("ignore_unmapped".to_string(), json!(true));
    }
    if with_inner_hits {
        let mut inner_hits = Map::new();
        if let Some(ref name) = opts.inner_hits_name {
            inner_hits.insert("name".to_string(), json!(name));
        }
        if let Some(size) = opts.inner_hits_size {
            inner_hits.insert("size".to_string(), json!(size));
        }
        spec.insert("inner_hits".to_string(), Value::Object(inner_hits));
    }
    json!({ "nested": spec })
}
