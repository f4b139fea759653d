//! Boolean conditions over entity attributes.

use serde::{Deserialize, Serialize};

use crate::metamodel::PathExpr;
use crate::value::Value;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// SQL-ish symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean condition, the predicate of a criteria query.
///
/// An empty [`Condition::And`] is always true and an empty
/// [`Condition::Or`] is always false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Compare an attribute to a value.
    Compare {
        path: PathExpr,
        op: CompareOp,
        value: Value,
    },
    /// Attribute is one of a list of values.
    In { path: PathExpr, values: Vec<Value> },
    /// Attribute is null.
    IsNull { path: PathExpr },
    /// Attribute is not null.
    IsNotNull { path: PathExpr },
    /// Attribute matches a LIKE pattern (`%`, `_`, `\` escapes).
    Like {
        path: PathExpr,
        pattern: String,
        negated: bool,
    },
    /// All conditions hold.
    And(Vec<Condition>),
    /// At least one condition holds.
    Or(Vec<Condition>),
    /// The condition does not hold.
    Not(Box<Condition>),
}

impl Condition {
    /// Condition that always holds.
    pub fn always() -> Self {
        Condition::And(Vec::new())
    }

    /// Condition that never holds.
    pub fn never() -> Self {
        Condition::Or(Vec::new())
    }

    /// Conjunction of all given conditions.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And(conditions.into_iter().collect())
    }

    /// Disjunction of all given conditions.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or(conditions.into_iter().collect())
    }

    /// `self AND other`, flattening nested conjunctions.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut parts) => {
                parts.push(other);
                Condition::And(parts)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    /// `self OR other`, flattening nested disjunctions.
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut parts) => {
                parts.push(other);
                Condition::Or(parts)
            }
            first => Condition::Or(vec![first, other]),
        }
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Visit every attribute path referenced by this condition.
    pub fn for_each_path(&self, f: &mut impl FnMut(&PathExpr)) {
        match self {
            Condition::Compare { path, .. }
            | Condition::In { path, .. }
            | Condition::IsNull { path }
            | Condition::IsNotNull { path }
            | Condition::Like { path, .. } => f(path),
            Condition::And(parts) | Condition::Or(parts) => {
                for part in parts {
                    part.for_each_path(f);
                }
            }
            Condition::Not(inner) => inner.for_each_path(f),
        }
    }
}

/// Match a string against a LIKE pattern.
///
/// `%` matches any run of characters, `_` exactly one, and `\` makes the
/// next pattern character literal.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_from(&value, &pattern)
}

fn like_from(value: &[char], pattern: &[char]) -> bool {
    let Some((&head, rest)) = pattern.split_first() else {
        return value.is_empty();
    };
    match head {
        '%' => {
            if rest.is_empty() {
                return true;
            }
            (0..=value.len()).any(|skip| like_from(&value[skip..], rest))
        }
        '_' => !value.is_empty() && like_from(&value[1..], rest),
        '\\' => match (rest.split_first(), value.split_first()) {
            (Some((&literal, rest)), Some((&c, tail))) if literal == c => like_from(tail, rest),
            _ => false,
        },
        literal => match value.split_first() {
            Some((&c, tail)) if c == literal => like_from(tail, rest),
            _ => false,
        },
    }
}
