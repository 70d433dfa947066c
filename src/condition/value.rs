//! Condition operands

use super::ConditionTree;
use crate::error::{CuttleError, Result};
use serde_json::Value;

/// The right-hand side of a condition
///
/// Operands are JSON-typed throughout; nothing is re-parsed from strings.
/// Sub-trees are exclusively owned by their parent condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// No operand (existence tests)
    None,
    /// A single scalar value
    Value(Value),
    /// A list of values (set membership)
    List(Vec<Value>),
    /// Two inclusive bounds (range tests)
    Pair(Value, Value),
    /// A nested condition tree (grouping, nested-object scopes)
    Tree(Box<ConditionTree>),
}

impl Operand {
    /// Extract the scalar value, or fail naming the operator
    pub fn scalar(&self, operator: &str) -> Result<&Value> {
        match self {
            Operand::Value(v) => Ok(v),
            _ => Err(CuttleError::parameter(format!(
                "operator '{operator}' requires a scalar operand"
            ))),
        }
    }

    /// Extract the scalar as text, or fail naming the operator
    pub fn text(&self, operator: &str) -> Result<&str> {
        self.scalar(operator)?.as_str().ok_or_else(|| {
            CuttleError::parameter(format!("operator '{operator}' requires a string operand"))
        })
    }

    /// Extract the value list, or fail naming the operator
    pub fn list(&self, operator: &str) -> Result<&[Value]> {
        match self {
            Operand::List(values) => Ok(values),
            _ => Err(CuttleError::parameter(format!(
                "operator '{operator}' requires a list operand"
            ))),
        }
    }

    /// Extract both bounds, or fail naming the operator
    pub fn pair(&self, operator: &str) -> Result<(&Value, &Value)> {
        match self {
            Operand::Pair(from, to) => Ok((from, to)),
            _ => Err(CuttleError::parameter(format!(
                "operator '{operator}' requires a [from, to] operand"
            ))),
        }
    }

    /// Extract the sub-tree, or fail naming the operator
    pub fn tree(&self, operator: &str) -> Result<&ConditionTree> {
        match self {
            Operand::Tree(tree) => Ok(tree),
            _ => Err(CuttleError::parameter(format!(
                "operator '{operator}' requires a condition sub-tree operand"
            ))),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Operand::List(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_extraction() {
        let operand = Operand::Value(json!(42));
        assert_eq!(operand.scalar("eq").unwrap(), &json!(42));
        assert!(operand.list("eq").is_err());
    }

    #[test]
    fn test_pair_extraction() {
        let operand = Operand::Pair(json!(1), json!(10));
        let (from, to) = operand.pair("between").unwrap();
        assert_eq!(from, &json!(1));
        assert_eq!(to, &json!(10));
    }

    #[test]
    fn test_error_names_operator() {
        let err = Operand::None.scalar("like").unwrap_err();
        assert!(err.to_string().contains("like"));
    }
}
