//! Condition compiler
//!
//! Walks a [`ConditionTree`] and emits the engine's native boolean query
//! document. The compiler is a stateless transformation: all bookkeeping
//! (inner-hits path registrations, nested path scoping) lives in a
//! per-call state value, so compiling the same tree twice always produces
//! the same document.

pub mod clauses;
pub mod escape;

use crate::condition::{Condition, ConditionTree, Connective, Operator};
use crate::config::CompilerConfig;
use crate::error::{CuttleError, Result};
use crate::fields::FieldCaps;
use clauses::{geo, nested, pattern, range, script, term, text};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Compiles condition trees into native boolean query documents
pub struct QueryCompiler<'a> {
    config: &'a CompilerConfig,
    caps: &'a dyn FieldCaps,
}

/// Per-call compilation state
#[derive(Default)]
struct CompileState {
    inner_hit_paths: HashSet<String>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(config: &'a CompilerConfig, caps: &'a dyn FieldCaps) -> Self {
        Self { config, caps }
    }

    /// Compile a tree into a query document
    ///
    /// Returns `None` for an empty tree; the select compiler omits the
    /// `query` key entirely in that case rather than emitting an empty
    /// object the engine would have to disambiguate.
    pub fn compile(&self, tree: &ConditionTree) -> Result<Option<Value>> {
        let mut state = CompileState::default();
        let query = self.compile_scoped(tree, None, &mut state)?;
        debug!(
            conditions = tree.conditions.len(),
            filters = tree.filters.len(),
            "compiled condition tree"
        );
        Ok(query)
    }

    /// Compile a tree, substituting match-everything for the empty tree
    pub fn compile_or_match_all(&self, tree: &ConditionTree) -> Result<Value> {
        Ok(self.compile(tree)?.unwrap_or_else(match_all))
    }

    fn compile_scoped(
        &self,
        tree: &ConditionTree,
        prefix: Option<&str>,
        state: &mut CompileState,
    ) -> Result<Option<Value>> {
        if tree.is_empty() {
            return Ok(None);
        }

        let scored = self.compile_conditions(&tree.conditions, prefix, state)?;
        let (filter_clauses, filter_negations) =
            self.compile_filter_channel(&tree.filters, prefix, state)?;

        if filter_clauses.is_empty() && filter_negations.is_empty() {
            return Ok(scored);
        }

        // Merge the scored query with the non-scoring channel: the original
        // query becomes the must branch, filters become the filter branch.
        let mut bool_body = Map::new();
        if let Some(query) = scored {
            bool_body.insert("must".to_string(), json!([query]));
        }
        if !filter_clauses.is_empty() {
            bool_body.insert("filter".to_string(), Value::Array(filter_clauses));
        }
        if !filter_negations.is_empty() {
            bool_body.insert("must_not".to_string(), Value::Array(filter_negations));
        }
        Ok(Some(json!({ "bool": bool_body })))
    }

    /// Compile the scored conditions into a single query value
    ///
    /// Conditions are partitioned into AND buckets at OR boundaries; a
    /// single bucket compiles directly, multiple buckets become the
    /// alternatives of a `should` list (the trailing bucket included).
    fn compile_conditions(
        &self,
        conditions: &[Condition],
        prefix: Option<&str>,
        state: &mut CompileState,
    ) -> Result<Option<Value>> {
        let Some(first) = conditions.first() else {
            return Ok(None);
        };
        if first.connective == Connective::Or {
            return Err(CuttleError::parameter(
                "a query cannot open with an OR condition".to_string(),
            ));
        }

        let mut buckets: Vec<Vec<&Condition>> = Vec::new();
        for condition in conditions {
            match buckets.last_mut() {
                Some(bucket) if condition.connective == Connective::And => {
                    bucket.push(condition);
                }
                _ => buckets.push(vec![condition]),
            }
        }

        if buckets.len() == 1 {
            return Ok(Some(self.compile_bucket(&buckets[0], prefix, state)?));
        }

        let alternatives = buckets
            .iter()
            .map(|bucket| self.compile_bucket(bucket, prefix, state))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(json!({ "bool": { "should": alternatives } })))
    }

    /// Compile one AND bucket
    ///
    /// A bucket of exactly one positive condition compiles to the bare
    /// clause; anything else gets a `bool` wrapper with `must`/`must_not`.
    fn compile_bucket(
        &self,
        conditions: &[&Condition],
        prefix: Option<&str>,
        state: &mut CompileState,
    ) -> Result<Value> {
        let mut must = Vec::new();
        let mut must_not = Vec::new();
        for condition in conditions {
            let clause = self.compile_condition(condition, prefix, state)?;
            if condition.is_negative() {
                must_not.push(clause);
            } else {
                must.push(clause);
            }
        }

        if must_not.is_empty() && must.len() == 1 {
            return Ok(must.remove(0));
        }

        let mut bool_body = Map::new();
        if !must.is_empty() {
            bool_body.insert("must".to_string(), Value::Array(must));
        }
        if !must_not.is_empty() {
            bool_body.insert("must_not".to_string(), Value::Array(must_not));
        }
        Ok(json!({ "bool": bool_body }))
    }

    fn compile_filter_channel(
        &self,
        filters: &[Condition],
        prefix: Option<&str>,
        state: &mut CompileState,
    ) -> Result<(Vec<Value>, Vec<Value>)> {
        let mut clauses = Vec::new();
        let mut negations = Vec::new();
        for condition in filters {
            let clause = self.compile_condition(condition, prefix, state)?;
            if condition.is_negative() {
                negations.push(clause);
            } else {
                clauses.push(clause);
            }
        }
        Ok((clauses, negations))
    }

    /// Compile one condition's positive core clause
    ///
    /// Negative operators compile their positive form; the caller places
    /// the clause in `must_not`.
    fn compile_condition(
        &self,
        condition: &Condition,
        prefix: Option<&str>,
        state: &mut CompileState,
    ) -> Result<Value> {
        let operator = condition.operator;
        let name = operator.name();
        let field = qualify(prefix, &condition.field);
        let operand = &condition.operand;

        match operator.positive_form() {
            Operator::Eq => {
                let opts = condition.options.expect_match(operator)?;
                Ok(text::match_clause(&field, operand.scalar(name)?, &opts))
            }
            op @ (Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte) => {
                range::single_bound(&field, op, operand.scalar(name)?)
            }
            Operator::Between => {
                let (from, to) = operand.pair(name)?;
                Ok(range::between(&field, from, to))
            }
            Operator::In => {
                let resolved = self.caps.resolve_exact(&field)?;
                Ok(term::terms_clause(&resolved, operand.list(name)?))
            }
            Operator::Exists => Ok(term::exists_clause(&field)),
            Operator::Like => Ok(pattern::wildcard_clause(&field, operand.text(name)?)),
            Operator::Regex => Ok(pattern::regexp_clause(&field, operand.text(name)?)),
            Operator::Phrase => {
                let opts = condition.options.expect_match(operator)?;
                Ok(text::phrase_clause(&field, operand.text(name)?, &opts))
            }
            Operator::Exact => {
                let resolved = self.caps.resolve_exact(&field)?;
                Ok(term::term_clause(&resolved, operand.scalar(name)?))
            }
            Operator::Fuzzy => {
                let opts = condition.options.expect_fuzzy(operator)?;
                Ok(text::fuzzy_clause(&field, operand.text(name)?, &opts))
            }
            Operator::Nested => {
                let opts = condition.options.expect_nested(operator)?;
                let inner = self.compile_inner(operand.tree(name)?, &field, state)?;
                Ok(nested::nested_clause(&field, inner, &opts, false))
            }
            Operator::InnerNested => {
                if !state.inner_hit_paths.insert(field.clone()) {
                    return Err(CuttleError::parameter(format!(
                        "duplicate inner-hits registration for nested path '{field}'"
                    )));
                }
                let opts = condition.options.expect_nested(operator)?;
                let inner = self.compile_inner(operand.tree(name)?, &field, state)?;
                Ok(nested::nested_clause(&field, inner, &opts, true))
            }
            Operator::Group => {
                // Parenthesization: the inner tree keeps the outer scope
                let tree = operand.tree(name)?;
                Ok(self
                    .compile_scoped(tree, prefix, state)?
                    .unwrap_or_else(match_all))
            }
            Operator::Script => {
                let opts = condition.options.expect_script(operator)?;
                Ok(script::script_clause(operand.text(name)?, &opts))
            }
            Operator::GeoDistance => {
                let opts = condition.options.expect_geo(operator)?;
                geo::geo_distance_clause(&field, operand.scalar(name)?, &opts)
            }
            Operator::GeoBoundingBox => {
                let opts = condition.options.expect_geo(operator)?;
                geo::geo_bounding_box_clause(&field, operand.scalar(name)?, &opts)
            }
            Operator::MultiMatch => {
                let opts = condition.options.expect_multi_match(operator)?;
                text::multi_match_clause(operand.text(name)?, &opts)
            }
            Operator::QueryString => {
                let opts = condition.options.expect_query_string(operator)?;
                Ok(text::query_string_clause(operand.text(name)?, &opts))
            }
            // positive_form never returns a negative operator
            _ => unreachable!("negative operator after positive_form"),
        }
    }

    fn compile_inner(
        &self,
        tree: &ConditionTree,
        path: &str,
        state: &mut CompileState,
    ) -> Result<Value> {
        Ok(self
            .compile_scoped(tree, Some(path), state)?
            .unwrap_or_else(match_all))
    }

    /// The configuration this compiler was built with
    pub fn config(&self) -> &CompilerConfig {
        self.config
    }
}

/// Match-everything query
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

/// Prefix a field with its nested path unless it already carries it
fn qualify(prefix: Option<&str>, field: &str) -> String {
    match prefix {
        Some(path) if field != path && !field.starts_with(&format!("{path}.")) => {
            format!("{path}.{field}")
        }
        _ => field.to_string(),
    }
}
