//! Reusable query fragments.
//!
//! A fragment is a closure over a [`QueryContext`] and the query [`Root`].
//! Fragments may run more than once per call (a page runs the predicate for
//! the row query and again for the count), so they are `Fn`, not `FnOnce`.

use critq_model::{Condition, Order, QueryContext, Root};

/// Produces the filter condition.
pub type PredicateFn<'a, E> = Box<dyn Fn(&mut QueryContext<'_>, &Root<E>) -> Condition + 'a>;

/// Produces the sort keys.
pub type OrderFn<'a, E> = Box<dyn Fn(&mut QueryContext<'_>, &Root<E>) -> Vec<Order> + 'a>;

/// Produces a condition and its ordering as one unit.
pub type PredicateAndOrderFn<'a, E> =
    Box<dyn Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder + 'a>;

/// Shapes the query directly: predicate, ordering, joins and distinct.
pub type QueryShapeFn<'a, E> = Box<dyn Fn(&mut QueryContext<'_>, &Root<E>) + 'a>;

/// Adds fetch joins before the query is finalized.
pub type Fetcher<'a, E> = Box<dyn Fn(&mut QueryContext<'_>, &Root<E>) + 'a>;

/// A condition paired with its ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateAndOrder {
    pub predicate: Option<Condition>,
    pub orders: Option<Vec<Order>>,
}

impl PredicateAndOrder {
    pub fn new(predicate: Condition, orders: Vec<Order>) -> Self {
        Self {
            predicate: Some(predicate),
            orders: Some(orders),
        }
    }

    /// Condition without ordering.
    pub fn predicate_only(predicate: Condition) -> Self {
        Self {
            predicate: Some(predicate),
            orders: None,
        }
    }

    /// Whether this unit carries at least one sort key.
    pub fn has_orders(&self) -> bool {
        self.orders.as_ref().is_some_and(|orders| !orders.is_empty())
    }

    /// Apply both parts to a query context.
    pub fn apply(self, ctx: &mut QueryContext<'_>) {
        if let Some(predicate) = self.predicate {
            ctx.apply_predicate(predicate);
        }
        if let Some(orders) = self.orders {
            ctx.apply_ordering(orders);
        }
    }
}

/// Box a predicate closure.
pub fn predicate<'a, E, F>(f: F) -> PredicateFn<'a, E>
where
    F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition + 'a,
{
    Box::new(f)
}

/// Box an order closure.
pub fn order<'a, E, F>(f: F) -> OrderFn<'a, E>
where
    F: Fn(&mut QueryContext<'_>, &Root<E>) -> Vec<Order> + 'a,
{
    Box::new(f)
}

/// Box a predicate-and-order closure.
pub fn predicate_and_order<'a, E, F>(f: F) -> PredicateAndOrderFn<'a, E>
where
    F: Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder + 'a,
{
    Box::new(f)
}

/// Box a query-shape closure.
pub fn query_shape<'a, E, F>(f: F) -> QueryShapeFn<'a, E>
where
    F: Fn(&mut QueryContext<'_>, &Root<E>) + 'a,
{
    Box::new(f)
}

/// Lift a predicate into a predicate-and-order unit with no ordering.
pub fn predicate_and_order_of<'a, E: 'a>(predicate: PredicateFn<'a, E>) -> PredicateAndOrderFn<'a, E> {
    Box::new(move |ctx, root| PredicateAndOrder::predicate_only(predicate(ctx, root)))
}

/// Combine a predicate and an order fragment into one unit.
pub fn combine<'a, E: 'a>(predicate: PredicateFn<'a, E>, order: OrderFn<'a, E>) -> PredicateAndOrderFn<'a, E> {
    Box::new(move |ctx, root| {
        let condition = predicate(ctx, root);
        let orders = order(ctx, root);
        PredicateAndOrder::new(condition, orders)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use critq_model::{Attribute, CriteriaQuery};

    struct Car;
    const COLOR: Attribute<Car, String> = Attribute::new("color");

    fn run(f: &PredicateAndOrderFn<'_, Car>) -> CriteriaQuery {
        let mut query = CriteriaQuery::new("Car");
        let root = Root::new();
        let mut ctx = QueryContext::new(&mut query);
        f(&mut ctx, &root).apply(&mut ctx);
        query
    }

    #[test]
    fn test_lifted_predicate_has_no_ordering() {
        let lifted = predicate_and_order_of(predicate(|_, root: &Root<Car>| {
            root.get(COLOR).eq("green")
        }));
        let query = run(&lifted);
        assert!(query.predicate.is_some());
        assert!(query.order_by.is_empty());
    }

    #[test]
    fn test_combined_fragment_applies_both() {
        let color = String::from("red");
        let combined = combine(
            predicate(move |_, root: &Root<Car>| root.get(COLOR).eq(color.clone())),
            order(|_, root: &Root<Car>| vec![root.get(COLOR).desc()]),
        );
        let query = run(&combined);
        assert!(query.predicate.is_some());
        assert_eq!(query.order_by, vec![Order::desc("color")]);
    }

    #[test]
    fn test_has_orders() {
        assert!(!PredicateAndOrder::default().has_orders());
        assert!(!PredicateAndOrder::new(Condition::always(), Vec::new()).has_orders());
        assert!(PredicateAndOrder::new(Condition::always(), vec![Order::asc("id")]).has_orders());
    }
}
