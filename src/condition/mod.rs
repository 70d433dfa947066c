//! Condition model - predicates and the boolean tree that combines them
//!
//! This module defines the in-memory representation of query intent: a
//! single [`Condition`] (field, operator, operand, options) and the
//! [`ConditionTree`] that combines conditions with AND/OR connectives plus
//! an explicit non-scoring filter channel. The model is pure data; all
//! behavior lives in the compiler.

pub mod operator;
pub mod value;

pub use operator::{
    Fuzziness, FuzzyOptions, GeoOptions, MatchOperator, MatchOptions, MultiMatchKind,
    MultiMatchOptions, NestedOptions, Operator, OperatorOptions, QueryStringOptions, ScoreMode,
    ScriptOptions, ValidationMethod,
};
pub use value::Operand;

use serde_json::Value;

/// Boolean connective attaching a condition to the conditions before it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connective {
    /// Condition joins the current AND bucket
    #[default]
    And,
    /// Condition opens a new OR alternative
    Or,
}

/// A single predicate: field, operator, operand, and operator options
///
/// Negation is carried both by explicit negative operators (`not-in`,
/// `not-between`, ...) and by the `negated` flag; the two compose by XOR,
/// so negating a `not-in` condition yields plain set membership.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    /// Dotted field path. For `nested` conditions this is the nested
    /// object path; for `group`, `multi_match` and `query_string` it is
    /// unused and left empty.
    pub field: String,
    pub operator: Operator,
    pub operand: Operand,
    pub connective: Connective,
    pub negated: bool,
    pub options: OperatorOptions,
}

impl Condition {
    /// Create a condition with AND connective and default options
    pub fn new(field: impl Into<String>, operator: Operator, operand: Operand) -> Self {
        Self {
            field: field.into(),
            operator,
            operand,
            connective: Connective::And,
            negated: false,
            options: OperatorOptions::None,
        }
    }

    /// Equality on a field (the default operator)
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, Operand::Value(value.into()))
    }

    /// Single-bound comparison
    pub fn compare(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(field, operator, Operand::Value(value.into()))
    }

    /// Inclusive range over both bounds
    pub fn between(
        field: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::new(
            field,
            Operator::Between,
            Operand::Pair(from.into(), to.into()),
        )
    }

    /// Set membership
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, Operator::In, Operand::List(values))
    }

    /// Field presence test; the operand is irrelevant
    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Exists, Operand::None)
    }

    /// Untokenized exact match; requires a keyword-capable field
    pub fn exact(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Exact, Operand::Value(value.into()))
    }

    /// Wildcard containment; the operand is escaped before compilation
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, Operator::Like, Operand::Value(Value::String(pattern.into())))
    }

    /// Full-text phrase match
    pub fn phrase(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(field, Operator::Phrase, Operand::Value(Value::String(text.into())))
    }

    /// Fuzzy match with engine-chosen edit distance unless overridden
    pub fn fuzzy(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(field, Operator::Fuzzy, Operand::Value(Value::String(text.into())))
    }

    /// Predicate scoped to elements of a nested-object field
    pub fn nested(path: impl Into<String>, tree: ConditionTree) -> Self {
        Self::new(path, Operator::Nested, Operand::Tree(Box::new(tree)))
    }

    /// Nested predicate that also returns the matched inner documents
    ///
    /// Only one inner-nested condition per path is allowed in a compiled
    /// query; a duplicate path registration is a parameter error.
    pub fn inner_nested(path: impl Into<String>, tree: ConditionTree) -> Self {
        Self::new(path, Operator::InnerNested, Operand::Tree(Box::new(tree)))
    }

    /// Explicit parenthesization around a fully built sub-tree
    pub fn group(tree: ConditionTree) -> Self {
        Self::new("", Operator::Group, Operand::Tree(Box::new(tree)))
    }

    /// Script-based predicate; the source is passed to the engine opaquely
    pub fn script(source: impl Into<String>) -> Self {
        Self::new("", Operator::Script, Operand::Value(Value::String(source.into())))
    }

    /// Multi-field full-text search; fields and variant go in the options
    pub fn multi_match(text: impl Into<String>, options: MultiMatchOptions) -> Self {
        Self::new("", Operator::MultiMatch, Operand::Value(Value::String(text.into())))
            .with_options(OperatorOptions::MultiMatch(options))
    }

    /// Free-text query-string search
    pub fn query_string(text: impl Into<String>) -> Self {
        Self::new("", Operator::QueryString, Operand::Value(Value::String(text.into())))
    }

    /// Attach this condition with an OR connective
    pub fn or(mut self) -> Self {
        self.connective = Connective::Or;
        self
    }

    /// Toggle negation
    pub fn negated(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Attach operator options
    pub fn with_options(mut self, options: OperatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether this condition compiles into a `must_not` clause
    ///
    /// The explicit negative operator and the `negated` flag compose by XOR.
    pub fn is_negative(&self) -> bool {
        self.operator.is_negative() != self.negated
    }
}

/// An ordered sequence of conditions plus an explicit filter channel
///
/// Conditions are stored in call order; the compiler partitions them into
/// AND buckets at OR boundaries (a DNF-like `OR[AND[..], AND[..]]` shape).
/// The filter channel holds non-scoring predicates and is part of the
/// tree's value - it is never shared or ambient state, so compiling the
/// same tree twice always yields the same document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionTree {
    pub conditions: Vec<Condition>,
    pub filters: Vec<Condition>,
}

impl ConditionTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition to the current AND bucket
    pub fn and(mut self, condition: Condition) -> Self {
        self.push(condition);
        self
    }

    /// Append a condition that opens a new OR alternative
    pub fn or(mut self, condition: Condition) -> Self {
        self.push(condition.or());
        self
    }

    /// Append a non-scoring predicate to the filter channel
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filters.push(condition);
        self
    }

    /// Push a condition preserving its own connective
    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Check whether the tree holds no conditions at all
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.filters.is_empty()
    }

    /// Total number of conditions including the filter channel
    pub fn len(&self) -> usize {
        self.conditions.len() + self.filters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_constructors() {
        let cond = Condition::eq("status", "published");
        assert_eq!(cond.operator, Operator::Eq);
        assert_eq!(cond.connective, Connective::And);
        assert!(!cond.negated);

        let cond = Condition::between("price", 10, 20);
        assert_eq!(cond.operand, Operand::Pair(json!(10), json!(20)));
    }

    #[test]
    fn test_or_connective() {
        let cond = Condition::eq("status", "draft").or();
        assert_eq!(cond.connective, Connective::Or);
    }

    #[test]
    fn test_negation_composes_by_xor() {
        let cond = Condition::is_in("tag", vec![json!("a")]);
        assert!(!cond.is_negative());
        assert!(cond.clone().negated().is_negative());

        let cond = Condition::new("tag", Operator::NotIn, Operand::List(vec![json!("a")]));
        assert!(cond.is_negative());
        assert!(!cond.negated().is_negative());
    }

    #[test]
    fn test_tree_accumulation() {
        let tree = ConditionTree::new()
            .and(Condition::eq("category", "tools"))
            .or(Condition::eq("category", "garden"))
            .filter(Condition::exists("price"));
        assert_eq!(tree.conditions.len(), 2);
        assert_eq!(tree.filters.len(), 1);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.conditions[1].connective, Connective::Or);
    }

    #[test]
    fn test_empty_tree() {
        assert!(ConditionTree::new().is_empty());
        assert!(!ConditionTree::new().filter(Condition::exists("x")).is_empty());
    }
}
