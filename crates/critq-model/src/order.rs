//! Sort specifications.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::metamodel::{Attribute, PathExpr, Root};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// A sort key inside a criteria query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Attribute to sort by.
    pub path: PathExpr,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl Order {
    /// Create a sort key.
    pub fn new(path: PathExpr, direction: OrderDirection) -> Self {
        Self { path, direction }
    }

    /// Ascending sort on a root attribute.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(PathExpr::root(field), OrderDirection::Asc)
    }

    /// Descending sort on a root attribute.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(PathExpr::root(field), OrderDirection::Desc)
    }
}

/// Sort key expressed directly on a root attribute of `E`.
///
/// Unlike [`Order`], which is produced by fragments inside a query, an
/// `OrderAttr` can be built ahead of time and carried in a descriptor.
pub struct OrderAttr<E> {
    field: &'static str,
    direction: OrderDirection,
    _marker: PhantomData<fn() -> E>,
}

impl<E> OrderAttr<E> {
    /// Sort key with the given direction.
    pub fn of<V>(attribute: Attribute<E, V>, direction: OrderDirection) -> Self {
        Self {
            field: attribute.name(),
            direction,
            _marker: PhantomData,
        }
    }

    /// Ascending sort key.
    pub fn asc<V>(attribute: Attribute<E, V>) -> Self {
        Self::of(attribute, OrderDirection::Asc)
    }

    /// Descending sort key.
    pub fn desc<V>(attribute: Attribute<E, V>) -> Self {
        Self::of(attribute, OrderDirection::Desc)
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }

    /// Bind this key to the root of a query.
    pub fn to_order(&self, _root: &Root<E>) -> Order {
        Order::new(PathExpr::root(self.field), self.direction)
    }
}

impl<E> Clone for OrderAttr<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for OrderAttr<E> {}

impl<E> PartialEq for OrderAttr<E> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.direction == other.direction
    }
}

impl<E> fmt::Debug for OrderAttr<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderAttr")
            .field("field", &self.field)
            .field("direction", &self.direction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Car;
    const COLOR: Attribute<Car, String> = Attribute::new("color");

    #[test]
    fn test_order_attr_binds_to_root() {
        let attr = OrderAttr::desc(COLOR);
        let order = attr.to_order(&Root::<Car>::new());
        assert_eq!(order, Order::desc("color"));
        assert_eq!(attr.field(), "color");
    }

    #[test]
    fn test_default_direction_is_ascending() {
        assert_eq!(OrderDirection::default(), OrderDirection::Asc);
    }
}
