//! Query descriptors and the where-style exclusivity rules.
//!
//! A [`QueryDescriptor`] holds at most one [`WhereStyle`]. There are two
//! ways to build one:
//!
//! - [`QueryParts`], the strict aggregator, fails with
//!   [`UsageError::ConflictingQueryDefinition`] when several styles are set.
//! - [`Select`](crate::select::Select), the fluent builder, replaces the
//!   previous style and logs a warning.

use std::fmt;
use std::mem;

use critq_model::{FetchPlan, OrderAttr, QueryContext, Root};

use crate::error::UsageError;
use crate::fragment::{
    Fetcher, PredicateAndOrder, PredicateAndOrderFn, PredicateFn, QueryShapeFn,
};

/// Discriminant of a [`WhereStyle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhereKind {
    None,
    Predicate,
    PredicateAndOrder,
    QueryShape,
}

impl WhereKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhereKind::None => "none",
            WhereKind::Predicate => "predicate",
            WhereKind::PredicateAndOrder => "predicate and order",
            WhereKind::QueryShape => "query shape",
        }
    }
}

impl fmt::Display for WhereKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a query's filter (and possibly its order) is expressed.
pub enum WhereStyle<'a, E> {
    None,
    Predicate(PredicateFn<'a, E>),
    PredicateAndOrder(PredicateAndOrderFn<'a, E>),
    QueryShape(QueryShapeFn<'a, E>),
}

impl<'a, E> WhereStyle<'a, E> {
    pub fn kind(&self) -> WhereKind {
        match self {
            WhereStyle::None => WhereKind::None,
            WhereStyle::Predicate(_) => WhereKind::Predicate,
            WhereStyle::PredicateAndOrder(_) => WhereKind::PredicateAndOrder,
            WhereStyle::QueryShape(_) => WhereKind::QueryShape,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, WhereStyle::None)
    }

    /// Install a new style and return the one it replaced.
    pub fn replace(&mut self, style: WhereStyle<'a, E>) -> WhereStyle<'a, E> {
        mem::replace(self, style)
    }

    /// Shape the query with this style.
    pub fn apply(&self, ctx: &mut QueryContext<'_>, root: &Root<E>) {
        match self {
            WhereStyle::None => {}
            WhereStyle::Predicate(predicate) => {
                let condition = predicate(ctx, root);
                ctx.apply_predicate(condition);
            }
            WhereStyle::PredicateAndOrder(fragment) => {
                let unit: PredicateAndOrder = fragment(ctx, root);
                unit.apply(ctx);
            }
            WhereStyle::QueryShape(shape) => shape(ctx, root),
        }
    }
}

impl<E> Default for WhereStyle<'_, E> {
    fn default() -> Self {
        WhereStyle::None
    }
}

impl<E> fmt::Debug for WhereStyle<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WhereStyle").field(&self.kind()).finish()
    }
}

/// Everything needed to assemble one query.
pub struct QueryDescriptor<'a, E> {
    pub(crate) where_style: WhereStyle<'a, E>,
    pub(crate) order_attrs: Option<Vec<OrderAttr<E>>>,
    pub(crate) fetch_plan: Option<FetchPlan>,
    pub(crate) fetchers: Vec<Fetcher<'a, E>>,
    pub(crate) distinct: bool,
}

impl<'a, E> QueryDescriptor<'a, E> {
    /// Descriptor matching every entity.
    pub fn new() -> Self {
        Self::with_style(WhereStyle::None)
    }

    pub fn with_style(where_style: WhereStyle<'a, E>) -> Self {
        Self {
            where_style,
            order_attrs: None,
            fetch_plan: None,
            fetchers: Vec::new(),
            distinct: false,
        }
    }

    /// Descriptor filtered by a predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> critq_model::Condition + 'a,
    {
        Self::with_style(WhereStyle::Predicate(Box::new(f)))
    }

    /// Descriptor filtered and ordered by one fragment.
    pub fn predicate_and_order<F>(f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder + 'a,
    {
        Self::with_style(WhereStyle::PredicateAndOrder(Box::new(f)))
    }

    /// Descriptor shaped by a raw query fragment.
    pub fn query_shape<F>(f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) + 'a,
    {
        Self::with_style(WhereStyle::QueryShape(Box::new(f)))
    }

    /// Explicit sort keys, independent of the where-style.
    pub fn with_order(mut self, orders: Vec<OrderAttr<E>>) -> Self {
        self.order_attrs = Some(orders);
        self
    }

    pub fn with_fetch_plan(mut self, plan: FetchPlan) -> Self {
        self.fetch_plan = Some(plan);
        self
    }

    /// Add a fetch-join fragment. Fetchers run on row queries only.
    pub fn with_fetcher<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) + 'a,
    {
        self.fetchers.push(Box::new(f));
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn where_kind(&self) -> WhereKind {
        self.where_style.kind()
    }

    pub fn fetch_plan(&self) -> Option<&FetchPlan> {
        self.fetch_plan.as_ref()
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
}

impl<E> Default for QueryDescriptor<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for QueryDescriptor<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDescriptor")
            .field("where_style", &self.where_style.kind())
            .field("order_attrs", &self.order_attrs)
            .field("fetch_plan", &self.fetch_plan)
            .field("fetchers", &self.fetchers.len())
            .field("distinct", &self.distinct)
            .finish()
    }
}

/// Strict aggregator: each where-style in its own slot, checked on conversion.
pub struct QueryParts<'a, E> {
    pub predicate: Option<PredicateFn<'a, E>>,
    pub predicate_and_order: Option<PredicateAndOrderFn<'a, E>>,
    pub query_shape: Option<QueryShapeFn<'a, E>>,
    pub fetch_plan: Option<FetchPlan>,
    pub distinct: bool,
}

impl<'a, E> QueryParts<'a, E> {
    pub fn new() -> Self {
        Self {
            predicate: None,
            predicate_and_order: None,
            query_shape: None,
            fetch_plan: None,
            distinct: false,
        }
    }

    pub fn with_predicate(mut self, predicate: PredicateFn<'a, E>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_predicate_and_order(mut self, fragment: PredicateAndOrderFn<'a, E>) -> Self {
        self.predicate_and_order = Some(fragment);
        self
    }

    pub fn with_query_shape(mut self, shape: QueryShapeFn<'a, E>) -> Self {
        self.query_shape = Some(shape);
        self
    }

    pub fn with_fetch_plan(mut self, plan: Option<FetchPlan>) -> Self {
        self.fetch_plan = plan;
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Names of the where-styles currently set.
    pub fn styles(&self) -> Vec<&'static str> {
        let mut styles = Vec::with_capacity(3);
        if self.predicate.is_some() {
            styles.push(WhereKind::Predicate.as_str());
        }
        if self.predicate_and_order.is_some() {
            styles.push(WhereKind::PredicateAndOrder.as_str());
        }
        if self.query_shape.is_some() {
            styles.push(WhereKind::QueryShape.as_str());
        }
        styles
    }

    /// Convert to a descriptor, failing if more than one where-style is set.
    pub fn into_descriptor(self) -> Result<QueryDescriptor<'a, E>, UsageError> {
        let styles = self.styles();
        if styles.len() > 1 {
            return Err(UsageError::ConflictingQueryDefinition { styles });
        }
        let where_style = match (self.predicate, self.predicate_and_order, self.query_shape) {
            (Some(predicate), _, _) => WhereStyle::Predicate(predicate),
            (_, Some(fragment), _) => WhereStyle::PredicateAndOrder(fragment),
            (_, _, Some(shape)) => WhereStyle::QueryShape(shape),
            (None, None, None) => WhereStyle::None,
        };
        let mut descriptor = QueryDescriptor::with_style(where_style).distinct(self.distinct);
        descriptor.fetch_plan = self.fetch_plan;
        Ok(descriptor)
    }
}

impl<E> Default for QueryParts<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}
