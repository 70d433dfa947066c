//! Range clauses: single-bound comparisons and two-bound ranges

use crate::condition::Operator;
use crate::error::{CuttleError, Result};
use serde_json::{json, Value};

/// Single-bound comparison (`<`, `<=`, `>`, `>=`)
pub fn single_bound(field: &str, operator: Operator, value: &Value) -> Result<Value> {
    let bound = match operator {
        Operator::Lt => "lt",
        Operator::Lte => "lte",
        Operator::Gt => "gt",
        Operator::Gte => "gte",
        other => {
            return Err(CuttleError::parameter(format!(
                "operator '{}' is not a range comparison",
                other.name()
            )))
        }
    };
    Ok(json!({ "range": { field: { bound: value } } }))
}

/// Inclusive two-bound range
///
/// `between(f, [a, b])` and an explicit `gte`/`lte` range pass through this
/// same builder, so the two spellings produce identical documents.
pub fn between(field: &str, from: &Value, to: &Value) -> Value {
    json!({ "range": { field: { "gte": from, "lte": to } } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_bound() {
        let clause = single_bound("price", Operator::Gt, &json!(100)).unwrap();
        assert_eq!(clause, json!({ "range": { "price": { "gt": 100 } } }));
    }

    #[test]
    fn test_single_bound_rejects_non_range_operator() {
        assert!(single_bound("price", Operator::Eq, &json!(1)).is_err());
    }

    #[test]
    fn test_between_inclusive() {
        let clause = between("price", &json!(10), &json!(20));
        assert_eq!(clause, json!({ "range": { "price": { "gte": 10, "lte": 20 } } }));
    }

    #[test]
    fn test_between_accepts_date_strings() {
        let clause = between("created_at", &json!("2024-01-01"), &json!("2024-12-31"));
        assert_eq!(
            clause,
            json!({ "range": { "created_at": { "gte": "2024-01-01", "lte": "2024-12-31" } } })
        );
    }
}
