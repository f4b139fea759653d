//! Runtime values carried by conditions, records and primary keys.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A runtime value.
///
/// This enum represents every scalar that can appear in a condition, an
/// ordering key, a primary key or a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
}

/// Hashable, totally ordered form of an identity value.
///
/// Floats and nulls cannot identify an entity, so they have no key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Uuid([u8; 16]),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(i) => Some(*i),
            Value::Int64(i) => i32::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Int32(i) => Some(*i as f64),
            Value::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as UUID.
    pub fn as_uuid(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Identity key for this value, if it can identify an entity.
    pub fn key(&self) -> Option<KeyValue> {
        match self {
            Value::Bool(b) => Some(KeyValue::Bool(*b)),
            Value::Int32(i) => Some(KeyValue::Int(*i as i64)),
            Value::Int64(i) => Some(KeyValue::Int(*i)),
            Value::String(s) => Some(KeyValue::Str(s.clone())),
            Value::Uuid(u) => Some(KeyValue::Uuid(*u)),
            Value::Null | Value::Float64(_) => None,
        }
    }

    /// Equality with numeric widening (`Int32(1) == Int64(1)`).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Int32(a), Value::Int64(b)) => (*a as i64) == *b,
            (Value::Int64(a), Value::Int32(b)) => *a == (*b as i64),
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Float64(a), Value::Int32(b)) => *a == (*b as f64),
            (Value::Float64(a), Value::Int64(b)) => *a == (*b as f64),
            (Value::Int32(a), Value::Float64(b)) => (*a as f64) == *b,
            (Value::Int64(a), Value::Float64(b)) => (*a as f64) == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            _ => false,
        }
    }

    /// Compare two values, returning their ordering if comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Int32(a), Value::Int64(b)) => Some((*a as i64).cmp(b)),
            (Value::Int64(a), Value::Int32(b)) => Some(a.cmp(&(*b as i64))),
            (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
            (Value::Float64(a), Value::Int32(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float64(a), Value::Int64(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Int32(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
            (Value::Int64(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total ordering used for sorting.
    ///
    /// Values group by kind: nulls first, then booleans, numbers, strings
    /// and uuids. Numbers of any width compare by exact value; NaN sorts
    /// after every other number.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int64(b)) => i64::from(*a).cmp(b),
            (Value::Int64(a), Value::Int32(b)) => a.cmp(&i64::from(*b)),
            (Value::Float64(a), Value::Float64(b)) => float_cmp(*a, *b),
            (Value::Int32(a), Value::Float64(b)) => int_float_cmp(i64::from(*a), *b),
            (Value::Int64(a), Value::Float64(b)) => int_float_cmp(*a, *b),
            (Value::Float64(a), Value::Int32(b)) => int_float_cmp(i64::from(*b), *a).reverse(),
            (Value::Float64(a), Value::Int64(b)) => int_float_cmp(*b, *a).reverse(),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            _ => self.sort_rank().cmp(&other.sort_rank()),
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int32(_) | Value::Int64(_) | Value::Float64(_) => 2,
            Value::String(_) => 3,
            Value::Uuid(_) => 4,
        }
    }
}

/// Floats by value, NaN last. Signed zeros are equal.
fn float_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a float, NaN last.
fn int_float_cmp(int: i64, float: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() || float >= TWO_POW_63 {
        return Ordering::Less;
    }
    if float < -TWO_POW_63 {
        return Ordering::Greater;
    }
    // In range, so the truncation is exact.
    let whole = float.trunc() as i64;
    int.cmp(&whole)
        .then_with(|| 0.0_f64.partial_cmp(&float.fract()).unwrap_or(Ordering::Equal))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(i) => write!(f, "{i}"),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Uuid(u) => {
                for byte in u {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<KeyValue> for Value {
    fn from(key: KeyValue) -> Self {
        match key {
            KeyValue::Bool(b) => Value::Bool(b),
            KeyValue::Int(i) => Value::Int64(i),
            KeyValue::Str(s) => Value::String(s),
            KeyValue::Uuid(u) => Value::Uuid(u),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i32(), Some(42));
        assert_eq!(Value::Int64(100).as_i64(), Some(100));
        assert_eq!(Value::Int32(42).as_i64(), Some(42)); // Widening conversion
        assert_eq!(Value::Int64(i64::MAX).as_i32(), None);

        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
    }

    #[test]
    fn test_value_conversions() {
        let v: Value = true.into();
        assert_eq!(v, Value::Bool(true));

        let v: Value = 42i32.into();
        assert_eq!(v, Value::Int32(42));

        let v: Value = "hello".into();
        assert_eq!(v, Value::String("hello".into()));

        let v: Value = None::<i32>.into();
        assert_eq!(v, Value::Null);

        let v: Value = Some(42i64).into();
        assert_eq!(v, Value::Int64(42));
    }

    #[test]
    fn test_loose_equality_widens_integers() {
        assert!(Value::Int32(7).loose_eq(&Value::Int64(7)));
        assert!(Value::Int64(7).loose_eq(&Value::Float64(7.0)));
        assert!(!Value::Int32(7).loose_eq(&Value::String("7".into())));
        assert!(Value::Null.loose_eq(&Value::Null));
    }

    #[test]
    fn test_sort_cmp_puts_nulls_first() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int32(1)), Ordering::Less);
        assert_eq!(Value::Int32(1).sort_cmp(&Value::Null), Ordering::Greater);
        assert_eq!(
            Value::String("a".into()).sort_cmp(&Value::String("b".into())),
            Ordering::Less
        );
        assert_eq!(
            Value::Bool(true).sort_cmp(&Value::String("b".into())),
            Ordering::Less
        );
    }

    #[test]
    fn test_sort_cmp_is_total_across_kinds() {
        let mut values = vec![
            Value::String("b".into()),
            Value::Float64(f64::NAN),
            Value::Int64(1),
            Value::Null,
            Value::String("a".into()),
            Value::Float64(1.5),
            Value::Bool(false),
            Value::Int32(2),
            Value::Float64(-0.5),
        ];
        values.sort_by(Value::sort_cmp);
        assert!(values[0].is_null());
        assert_eq!(values[1], Value::Bool(false));
        assert_eq!(values[2], Value::Float64(-0.5));
        assert_eq!(values[3], Value::Int64(1));
        assert_eq!(values[4], Value::Float64(1.5));
        assert_eq!(values[5], Value::Int32(2));
        assert!(matches!(values[6], Value::Float64(f) if f.is_nan()));
        assert_eq!(values[7], Value::String("a".into()));
        assert_eq!(values[8], Value::String("b".into()));

        // Every pair agrees with its reverse.
        for a in &values {
            for b in &values {
                assert_eq!(a.sort_cmp(b), b.sort_cmp(a).reverse());
            }
        }
    }

    #[test]
    fn test_sort_cmp_mixed_numbers_are_exact() {
        let big = i64::MAX - 1;
        assert_eq!(Value::Int64(big).sort_cmp(&Value::Int64(i64::MAX)), Ordering::Less);
        assert_eq!(
            Value::Int64(i64::MAX).sort_cmp(&Value::Float64(9.3e18)),
            Ordering::Less
        );
        assert_eq!(Value::Int32(0).sort_cmp(&Value::Float64(-0.0)), Ordering::Equal);
        assert_eq!(Value::Float64(-0.0).sort_cmp(&Value::Float64(0.0)), Ordering::Equal);
        assert_eq!(Value::Int64(-3).sort_cmp(&Value::Float64(-2.5)), Ordering::Less);
    }

    #[test]
    fn test_identity_keys() {
        assert_eq!(Value::Int32(5).key(), Value::Int64(5).key());
        assert_eq!(Value::Float64(1.5).key(), None);
        assert_eq!(Value::Null.key(), None);
        assert_eq!(
            Value::from(KeyValue::Str("x".into())),
            Value::String("x".into())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::String("green".into()).to_string(), "'green'");
        assert_eq!(Value::Int64(3).to_string(), "3");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
