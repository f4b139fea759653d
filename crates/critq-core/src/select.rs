//! Fluent query builder.
//!
//! Re-configuring a [`Select`] is allowed: setting a where-style or a fetch
//! strategy a second time replaces the first and logs a warning. Builder
//! chains are often assembled in several places, so the last value wins.

use critq_model::{
    Condition, FetchGraph, FetchPlan, FetchSpec, OrderAttr, QueryContext, ResultPage, Root,
};
use tracing::warn;

use crate::config::QueryConfig;
use crate::descriptor::{QueryDescriptor, WhereStyle};
use crate::entity::Entity;
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::fragment::PredicateAndOrder;
use crate::session::Session;

/// Fluent query over entity `E`.
pub struct Select<'s, 'a, S: ?Sized, E> {
    executor: QueryExecutor<'s, S>,
    descriptor: QueryDescriptor<'a, E>,
    fetch: Option<FetchSpec>,
}

impl<'s, 'a, S: Session + ?Sized, E: Entity> Select<'s, 'a, S, E> {
    /// Start a query selecting every `E`.
    pub fn new(session: &'s S) -> Self {
        Self::with_executor(QueryExecutor::new(session))
    }

    pub fn with_executor(executor: QueryExecutor<'s, S>) -> Self {
        Self {
            executor,
            descriptor: QueryDescriptor::new(),
            fetch: None,
        }
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.executor = self.executor.with_config(config);
        self
    }

    fn set_where(mut self, style: WhereStyle<'a, E>) -> Self {
        let current = style.kind();
        let previous = self.descriptor.where_style.replace(style);
        if !previous.is_none() {
            warn!(
                entity = E::NAME,
                previous = %previous.kind(),
                current = %current,
                "overriding previously defined where style"
            );
        }
        self
    }

    /// Filter by a predicate.
    pub fn where_<F>(self, f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition + 'a,
    {
        self.set_where(WhereStyle::Predicate(Box::new(f)))
    }

    /// Filter and order by one fragment.
    pub fn where_and_order<F>(self, f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder + 'a,
    {
        self.set_where(WhereStyle::PredicateAndOrder(Box::new(f)))
    }

    /// Shape the query with a raw fragment.
    pub fn where_query<F>(self, f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) + 'a,
    {
        self.set_where(WhereStyle::QueryShape(Box::new(f)))
    }

    /// Sort keys independent of the where-style.
    ///
    /// Combining these with a where-style that orders fails at execution
    /// with [`UsageError::MixedOrdering`](crate::error::UsageError::MixedOrdering).
    pub fn order_by(mut self, orders: impl IntoIterator<Item = OrderAttr<E>>) -> Self {
        self.descriptor.order_attrs = Some(orders.into_iter().collect());
        self
    }

    fn set_fetch(mut self, spec: FetchSpec) -> Self {
        match self.fetch.replace(spec) {
            Some(FetchSpec::Plan(_)) => {
                warn!(entity = E::NAME, "overriding previously defined fetch plan")
            }
            Some(FetchSpec::Attributes { .. }) => {
                warn!(entity = E::NAME, "overriding previously defined nodes to fetch")
            }
            None => {}
        }
        self
    }

    /// Use a fetch plan as-is.
    pub fn fetch(self, plan: FetchPlan) -> Self {
        self.set_fetch(FetchSpec::Plan(plan))
    }

    /// Load exactly these relations; statically eager ones stay unloaded.
    pub fn fetch_only(self, graph: FetchGraph) -> Self {
        self.set_fetch(FetchSpec::Attributes { graph, only: true })
    }

    /// Load these relations on top of the statically eager ones.
    pub fn fetch_extra(self, graph: FetchGraph) -> Self {
        self.set_fetch(FetchSpec::Attributes { graph, only: false })
    }

    /// Add a fetch-join fragment.
    pub fn fetch_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) + 'a,
    {
        self.descriptor.fetchers.push(Box::new(f));
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.descriptor.distinct = distinct;
        self
    }

    /// Normalize the fetch setting and return the finished descriptor.
    pub fn into_descriptor(self) -> QueryDescriptor<'a, E> {
        self.into_parts().1
    }

    fn into_parts(self) -> (QueryExecutor<'s, S>, QueryDescriptor<'a, E>) {
        let mut descriptor = self.descriptor;
        descriptor.fetch_plan = self.fetch.map(FetchSpec::into_plan);
        (self.executor, descriptor)
    }

    /// All matching entities.
    pub fn list(self) -> Result<Vec<E>> {
        let (executor, descriptor) = self.into_parts();
        executor.list(&descriptor)
    }

    /// Zero or one matching entity.
    pub fn optional(self) -> Result<Option<E>> {
        let (executor, descriptor) = self.into_parts();
        executor.optional(&descriptor)
    }

    /// Exactly one matching entity.
    pub fn single(self) -> Result<E> {
        let (executor, descriptor) = self.into_parts();
        executor.single(&descriptor)
    }

    /// Number of matching entities; distinct if [`Select::distinct`] was set.
    pub fn count(self) -> Result<u64> {
        let (executor, descriptor) = self.into_parts();
        executor.count(&descriptor)
    }

    /// One page of matching entities. Requires an ordering.
    pub fn page(self, page_number: u32, page_size: u32) -> Result<ResultPage<E>> {
        let (executor, descriptor) = self.into_parts();
        executor.page(&descriptor, page_number, page_size)
    }
}
