//! Script predicate clause

use crate::condition::ScriptOptions;
use serde_json::{json, Map, Value};

/// Script-based predicate; source and parameters pass through opaquely
pub fn script_clause(source: &str, opts: &ScriptOptions) -> Value {
    let mut script = Map::new();
    script.insert("source".to_string(), json!(source));
    if let Some(ref lang) = opts.lang {
        script.insert("lang".to_string(), json!(lang));
    }
    if let Some(ref params) = opts.params {
        script.insert("params".to_string(), params.clone());
    }
    json!({ "script": { "script": script } })
}
