//! Full-text clauses: match, phrase, fuzzy, multi-field, query-string

use crate::condition::{
    FuzzyOptions, MatchOptions, MultiMatchOptions, Operator, QueryStringOptions,
};
use crate::error::{CuttleError, Result};
use serde_json::{json, Map, Value};

/// Analyzed equality match
///
/// Compiles to the compact form when no options are set, and to the
/// object form (`{"query": ..., ...}`) otherwise.
pub fn match_clause(field: &str, value: &Value, opts: &MatchOptions) -> Value {
    if opts == &MatchOptions::default() {
        return json!({ "match": { field: value } });
    }

    let mut spec = Map::new();
    spec.insert("query".to_string(), value.clone());
    if let Some(operator) = opts.operator {
        spec.insert("operator".to_string(), json!(operator.as_str()));
    }
    if let Some(ref msm) = opts.minimum_should_match {
        spec.insert("minimum_should_match".to_string(), json!(msm));
    }
    if let Some(boost) = opts.boost {
        spec.insert("boost".to_string(), json!(boost));
    }
    json!({ "match": { field: spec } })
}

/// Exact in-order token match
pub fn phrase_clause(field: &str, text: &str, opts: &MatchOptions) -> Value {
    if opts.slop.is_none() && opts.boost.is_none() {
        return json!({ "match_phrase": { field: text } });
    }

    let mut spec = Map::new();
    spec.insert("query".to_string(), json!(text));
    if let Some(slop) = opts.slop {
        spec.insert("slop".to_string(), json!(slop));
    }
    if let Some(boost) = opts.boost {
        spec.insert("boost".to_string(), json!(boost));
    }
    json!({ "match_phrase": { field: spec } })
}

/// Edit-distance match; distance stays engine-chosen unless overridden
pub fn fuzzy_clause(field: &str, text: &str, opts: &FuzzyOptions) -> Value {
    if opts == &FuzzyOptions::default() {
        return json!({ "fuzzy": { field: text } });
    }

    let mut spec = Map::new();
    spec.insert("value".to_string(), json!(text));
    if let Some(fuzziness) = opts.fuzziness {
        spec.insert("fuzziness".to_string(), fuzziness.to_value());
    }
    if let Some(prefix_length) = opts.prefix_length {
        spec.insert("prefix_length".to_string(), json!(prefix_length));
    }
    if let Some(max_expansions) = opts.max_expansions {
        spec.insert("max_expansions".to_string(), json!(max_expansions));
    }
    if let Some(boost) = opts.boost {
        spec.insert("boost".to_string(), json!(boost));
    }
    json!({ "fuzzy": { field: spec } })
}

/// Multi-field search with a type variant
///
/// Field entries pass through verbatim, including `^boost` suffixes.
pub fn multi_match_clause(text: &str, opts: &MultiMatchOptions) -> Result<Value> {
    if opts.fields.is_empty() {
        return Err(CuttleError::parameter(format!(
            "operator '{}' requires at least one field",
            Operator::MultiMatch.name()
        )));
    }

    let mut spec = Map::new();
    spec.insert("query".to_string(), json!(text));
    spec.insert("fields".to_string(), json!(opts.fields));
    spec.insert("type".to_string(), json!(opts.kind.as_str()));
    if let Some(operator) = opts.operator {
        spec.insert("operator".to_string(), json!(operator.as_str()));
    }
    if let Some(tie_breaker) = opts.tie_breaker {
        spec.insert("tie_breaker".to_string(), json!(tie_breaker));
    }
    if let Some(boost) = opts.boost {
        spec.insert("boost".to_string(), json!(boost));
    }
    Ok(json!({ "multi_match": spec }))
}

/// Free-text search in the engine's query-string mini-language
///
/// The operand is deliberately not escaped here; query-string text is
/// syntax by contract, unlike `like` operands.
pub fn query_string_clause(text: &str, opts: &QueryStringOptions) -> Value {
    let mut spec = Map::new();
    spec.insert("query".to_string(), json!(text));
    if !opts.fields.is_empty() {
        spec.insert("fields".to_string(), json!(opts.fields));
    }
    if let Some(operator) = opts.default_operator {
        spec.insert("default_operator".to_string(), json!(operator.as_str()));
    }
    if let Some(fuzziness) = opts.fuzziness {
        spec.insert("fuzziness".to_string(), fuzziness.to_value());
    }
    if let Some(ref msm) = opts.minimum_should_match {
        spec.insert("minimum_should_match".to_string(), json!(msm));
    }
    if let Some(phrase_slop) = opts.phrase_slop {
        spec.insert("phrase_slop".to_string(), json!(phrase_slop));
    }
    if let Some(allow) = opts.allow_leading_wildcard {
        spec.insert("allow_leading_wildcard".to_string(), json!(allow));
    }
    if let Some(lenient) = opts.lenient {
        spec.insert("lenient".to_string(), json!(lenient));
    }
    if let Some(boost) = opts.boost {
        spec.insert("boost".to_string(), json!(boost));
    }
    json!({ "query_string": spec })
}
