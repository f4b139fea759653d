//! Condition evaluation over joined rows.

use std::cmp::Ordering;

use critq_model::{like_match, CompareOp, Condition, Order, OrderDirection, PathExpr, Record, Source, Value};

/// One joined row: the root record plus one slot per join clause.
///
/// A `None` slot is a left join that found no match; its fields read as null.
#[derive(Debug, Clone)]
pub struct Tuple<'r> {
    pub root: &'r Record,
    pub joined: Vec<Option<&'r Record>>,
}

impl<'r> Tuple<'r> {
    pub fn new(root: &'r Record) -> Self {
        Self {
            root,
            joined: Vec::new(),
        }
    }

    /// Record behind a path source, if present in this row.
    pub fn source(&self, source: Source) -> Option<&'r Record> {
        match source {
            Source::Root => Some(self.root),
            Source::Join(id) => self.joined.get(id.0).copied().flatten(),
        }
    }

    /// Value at a path; absent sources and fields read as null.
    pub fn resolve(&self, path: &PathExpr) -> &'r Value {
        const NULL: &Value = &Value::Null;
        self.source(path.source)
            .and_then(|record| record.get(&path.field))
            .unwrap_or(NULL)
    }
}

/// Evaluates conditions against joined rows.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Whether a row satisfies the condition.
    ///
    /// Comparisons involving null are false, as in SQL.
    pub fn evaluate(condition: &Condition, row: &Tuple<'_>) -> bool {
        match condition {
            Condition::Compare { path, op, value } => {
                Self::compare(row.resolve(path), *op, value)
            }
            Condition::In { path, values } => {
                let field = row.resolve(path);
                !field.is_null() && values.iter().any(|v| field.loose_eq(v))
            }
            Condition::IsNull { path } => row.resolve(path).is_null(),
            Condition::IsNotNull { path } => !row.resolve(path).is_null(),
            Condition::Like {
                path,
                pattern,
                negated,
            } => match row.resolve(path).as_str() {
                Some(s) => like_match(s, pattern) != *negated,
                None => false,
            },
            Condition::And(conditions) => conditions.iter().all(|c| Self::evaluate(c, row)),
            Condition::Or(conditions) => conditions.iter().any(|c| Self::evaluate(c, row)),
            Condition::Not(inner) => !Self::evaluate(inner, row),
        }
    }

    fn compare(field: &Value, op: CompareOp, value: &Value) -> bool {
        if field.is_null() || value.is_null() {
            return false;
        }
        match op {
            CompareOp::Eq => field.loose_eq(value),
            CompareOp::Ne => !field.loose_eq(value),
            CompareOp::Lt => field.compare(value) == Some(Ordering::Less),
            CompareOp::Le => matches!(field.compare(value), Some(Ordering::Less | Ordering::Equal)),
            CompareOp::Gt => field.compare(value) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(
                field.compare(value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    /// Compare two rows by a list of sort keys.
    pub fn order(orders: &[Order], a: &Tuple<'_>, b: &Tuple<'_>) -> Ordering {
        for order in orders {
            let ord = a.resolve(&order.path).sort_cmp(b.resolve(&order.path));
            let ord = match order.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use critq_model::JoinId;

    fn car() -> Record {
        Record::new()
            .with_field("id", 1i64)
            .with_field("color", "green")
            .with_field("plate", Value::Null)
    }

    fn cmp(field: &str, op: CompareOp, value: impl Into<Value>) -> Condition {
        Condition::Compare {
            path: PathExpr::root(field),
            op,
            value: value.into(),
        }
    }

    #[test]
    fn test_compare_ops() {
        let record = car();
        let row = Tuple::new(&record);
        assert!(ConditionEvaluator::evaluate(&cmp("color", CompareOp::Eq, "green"), &row));
        assert!(ConditionEvaluator::evaluate(&cmp("color", CompareOp::Ne, "red"), &row));
        assert!(ConditionEvaluator::evaluate(&cmp("id", CompareOp::Ge, 1i32), &row));
        assert!(!ConditionEvaluator::evaluate(&cmp("id", CompareOp::Lt, 1i64), &row));
    }

    #[test]
    fn test_null_semantics() {
        let record = car();
        let row = Tuple::new(&record);
        assert!(!ConditionEvaluator::evaluate(&cmp("plate", CompareOp::Eq, "X"), &row));
        assert!(!ConditionEvaluator::evaluate(&cmp("plate", CompareOp::Ne, "X"), &row));
        assert!(ConditionEvaluator::evaluate(
            &Condition::IsNull {
                path: PathExpr::root("plate")
            },
            &row
        ));
        assert!(ConditionEvaluator::evaluate(
            &Condition::IsNull {
                path: PathExpr::root("missing")
            },
            &row
        ));
    }

    #[test]
    fn test_unmatched_join_reads_null() {
        let record = car();
        let mut row = Tuple::new(&record);
        row.joined.push(None);
        let path = PathExpr::new(Source::Join(JoinId(0)), "name");
        assert!(row.resolve(&path).is_null());
        assert!(!ConditionEvaluator::evaluate(
            &Condition::Like {
                path,
                pattern: "%".into(),
                negated: true
            },
            &row
        ));
    }

    #[test]
    fn test_boolean_composition() {
        let record = car();
        let row = Tuple::new(&record);
        let green = cmp("color", CompareOp::Eq, "green");
        let red = cmp("color", CompareOp::Eq, "red");
        assert!(ConditionEvaluator::evaluate(&green.clone().or(red.clone()), &row));
        assert!(!ConditionEvaluator::evaluate(&green.clone().and(red.clone()), &row));
        assert!(ConditionEvaluator::evaluate(&red.not(), &row));
        assert!(ConditionEvaluator::evaluate(&Condition::always(), &row));
        assert!(!ConditionEvaluator::evaluate(&Condition::never(), &row));
    }

    #[test]
    fn test_order_nulls_first() {
        let a = Record::new().with_field("name", "b");
        let b = Record::new().with_field("name", Value::Null);
        let (ra, rb) = (Tuple::new(&a), Tuple::new(&b));
        let asc = [Order::asc("name")];
        let desc = [Order::desc("name")];
        assert_eq!(ConditionEvaluator::order(&asc, &ra, &rb), Ordering::Greater);
        assert_eq!(ConditionEvaluator::order(&desc, &ra, &rb), Ordering::Less);
    }
}
