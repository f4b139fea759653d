//! Typed metamodel handles and path expressions.
//!
//! Entities describe their attributes and relations as constants:
//!
//! ```ignore
//! impl Vendor {
//!     pub const NAME: Attribute<Vendor, String> = Attribute::new("name");
//!     pub const MODELS: RelationAttr<Vendor, CarModel> = RelationAttr::new("models");
//! }
//! ```
//!
//! Fragments turn those constants into [`Path`]s through a [`Root`] or a
//! [`Join`], and paths into [`Condition`]s and [`Order`]s.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::condition::{CompareOp, Condition};
use crate::order::{Order, OrderDirection};
use crate::value::Value;

/// Reference to a singular attribute of entity `E` holding values of type `V`.
pub struct Attribute<E, V> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, V)>,
}

impl<E, V> Attribute<E, V> {
    /// Declare an attribute by field name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Field name of the attribute.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, V> Clone for Attribute<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for Attribute<E, V> {}

impl<E, V> fmt::Debug for Attribute<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Attribute").field(&self.name).finish()
    }
}

/// Reference to a relation from entity `E` to entity `T`.
pub struct RelationAttr<E, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> RelationAttr<E, T> {
    /// Declare a relation by name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Relation name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, T> Clone for RelationAttr<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for RelationAttr<E, T> {}

impl<E, T> fmt::Debug for RelationAttr<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RelationAttr").field(&self.name).finish()
    }
}

/// Index of a join clause within a criteria query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinId(pub usize);

/// Where a path starts: the query root or one of its joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The root entity of the query.
    Root,
    /// A joined entity.
    Join(JoinId),
}

/// Untyped attribute path, as stored in the query IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathExpr {
    /// Entity the attribute is read from.
    pub source: Source,
    /// Attribute name.
    pub field: String,
}

impl PathExpr {
    /// Create a path expression.
    pub fn new(source: Source, field: impl Into<String>) -> Self {
        Self {
            source,
            field: field.into(),
        }
    }

    /// Path to an attribute of the root entity.
    pub fn root(field: impl Into<String>) -> Self {
        Self::new(Source::Root, field)
    }
}

/// Root-entity reference handed to fragments.
pub struct Root<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> Root<E> {
    /// Create the root reference for a fresh query.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Path to an attribute of the root entity.
    pub fn get<V>(&self, attribute: Attribute<E, V>) -> Path<V> {
        Path::new(PathExpr::root(attribute.name()))
    }
}

impl<E> Default for Root<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Root<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Root")
    }
}

/// Reference to a joined entity of type `T`.
pub struct Join<T> {
    id: JoinId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Join<T> {
    pub(crate) fn new(id: JoinId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Index of the join clause this reference points at.
    pub fn id(&self) -> JoinId {
        self.id
    }

    /// Path to an attribute of the joined entity.
    pub fn get<V>(&self, attribute: Attribute<T, V>) -> Path<V> {
        Path::new(PathExpr::new(Source::Join(self.id), attribute.name()))
    }
}

impl<T> Clone for Join<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Join<T> {}

impl<T> fmt::Debug for Join<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Join").field(&self.id.0).finish()
    }
}

/// Anything a relation can be joined from.
pub trait JoinSource<E> {
    /// Source of paths read through this reference.
    fn source(&self) -> Source;
}

impl<E> JoinSource<E> for Root<E> {
    fn source(&self) -> Source {
        Source::Root
    }
}

impl<E> JoinSource<E> for Join<E> {
    fn source(&self) -> Source {
        Source::Join(self.id)
    }
}

/// Typed path to an attribute; the building block of conditions and orders.
pub struct Path<V> {
    expr: PathExpr,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Path<V> {
    fn new(expr: PathExpr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    /// The untyped path expression.
    pub fn expr(&self) -> &PathExpr {
        &self.expr
    }

    /// Attribute is null.
    pub fn is_null(&self) -> Condition {
        Condition::IsNull {
            path: self.expr.clone(),
        }
    }

    /// Attribute is not null.
    pub fn is_not_null(&self) -> Condition {
        Condition::IsNotNull {
            path: self.expr.clone(),
        }
    }

    /// Ascending order on this attribute.
    pub fn asc(&self) -> Order {
        Order::new(self.expr.clone(), OrderDirection::Asc)
    }

    /// Descending order on this attribute.
    pub fn desc(&self) -> Order {
        Order::new(self.expr.clone(), OrderDirection::Desc)
    }
}

impl<V: Into<Value>> Path<V> {
    fn compare(&self, op: CompareOp, value: impl Into<V>) -> Condition {
        let value: V = value.into();
        Condition::Compare {
            path: self.expr.clone(),
            op,
            value: value.into(),
        }
    }

    /// Attribute equals value.
    pub fn eq(&self, value: impl Into<V>) -> Condition {
        self.compare(CompareOp::Eq, value)
    }

    /// Attribute does not equal value.
    pub fn ne(&self, value: impl Into<V>) -> Condition {
        self.compare(CompareOp::Ne, value)
    }

    /// Attribute is less than value.
    pub fn lt(&self, value: impl Into<V>) -> Condition {
        self.compare(CompareOp::Lt, value)
    }

    /// Attribute is less than or equal to value.
    pub fn le(&self, value: impl Into<V>) -> Condition {
        self.compare(CompareOp::Le, value)
    }

    /// Attribute is greater than value.
    pub fn gt(&self, value: impl Into<V>) -> Condition {
        self.compare(CompareOp::Gt, value)
    }

    /// Attribute is greater than or equal to value.
    pub fn ge(&self, value: impl Into<V>) -> Condition {
        self.compare(CompareOp::Ge, value)
    }

    /// Attribute is one of the given values.
    pub fn in_values<I, X>(&self, values: I) -> Condition
    where
        I: IntoIterator<Item = X>,
        X: Into<V>,
    {
        Condition::In {
            path: self.expr.clone(),
            values: values
                .into_iter()
                .map(|value| {
                    let value: V = value.into();
                    value.into()
                })
                .collect(),
        }
    }
}

impl Path<String> {
    /// Attribute matches a LIKE pattern.
    pub fn like(&self, pattern: impl Into<String>) -> Condition {
        Condition::Like {
            path: self.expr.clone(),
            pattern: pattern.into(),
            negated: false,
        }
    }

    /// Attribute does not match a LIKE pattern.
    pub fn not_like(&self, pattern: impl Into<String>) -> Condition {
        Condition::Like {
            path: self.expr.clone(),
            pattern: pattern.into(),
            negated: true,
        }
    }
}

impl<V> fmt::Debug for Path<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Path").field(&self.expr).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vendor;
    struct Model;

    const NAME: Attribute<Vendor, String> = Attribute::new("name");
    const VERSION: Attribute<Vendor, i64> = Attribute::new("version");
    const MODEL_NAME: Attribute<Model, String> = Attribute::new("name");

    #[test]
    fn test_root_paths() {
        let root = Root::<Vendor>::new();
        let cond = root.get(NAME).eq("Renault");
        assert_eq!(
            cond,
            Condition::Compare {
                path: PathExpr::root("name"),
                op: CompareOp::Eq,
                value: Value::String("Renault".into()),
            }
        );
    }

    #[test]
    fn test_join_paths_carry_join_source() {
        let join = Join::<Model>::new(JoinId(2));
        let cond = join.get(MODEL_NAME).like("%a%");
        match cond {
            Condition::Like { path, negated, .. } => {
                assert_eq!(path.source, Source::Join(JoinId(2)));
                assert!(!negated);
            }
            other => panic!("expected Like, got {other:?}"),
        }
    }

    #[test]
    fn test_typed_values_are_widened() {
        let root = Root::<Vendor>::new();
        let cond = root.get(VERSION).in_values([1i64, 2, 3]);
        if let Condition::In { values, .. } = cond {
            assert_eq!(values.len(), 3);
            assert_eq!(values[0], Value::Int64(1));
        } else {
            panic!("expected In condition");
        }
    }

    #[test]
    fn test_orders_from_paths() {
        let root = Root::<Vendor>::new();
        let order = root.get(NAME).desc();
        assert_eq!(order.direction, OrderDirection::Desc);
        assert_eq!(order.path.field, "name");
    }
}
