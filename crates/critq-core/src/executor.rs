//! Query assembly and result-shape enforcement.
//!
//! Every row query is built the same way, in this order:
//!
//! 1. fresh [`CriteriaQuery`] rooted at the entity
//! 2. where-style (predicate, predicate+order or raw shape)
//! 3. explicit order attributes, rejected if the where-style already ordered
//! 4. distinct flag
//! 5. fetch-join fragments
//! 6. finalization by the session
//! 7. fetch hint on the finalized handle
//!
//! Counting queries run only step 2, without sorting.

use critq_model::{CriteriaQuery, FetchPlan, QueryContext, Record, Root, Value};
use tracing::debug;

use crate::config::QueryConfig;
use crate::descriptor::QueryDescriptor;
use crate::entity::Entity;
use crate::error::{Error, Result, UsageError};
use crate::session::{Session, TypedQuery};

/// Runs query descriptors against a session.
pub struct QueryExecutor<'s, S: ?Sized> {
    session: &'s S,
    config: QueryConfig,
}

impl<'s, S: Session + ?Sized> QueryExecutor<'s, S> {
    /// Create an executor with the default configuration.
    pub fn new(session: &'s S) -> Self {
        Self {
            session,
            config: QueryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn session(&self) -> &'s S {
        self.session
    }

    /// Build the row query for a descriptor, without finalizing it.
    pub fn assemble<E: Entity>(&self, descriptor: &QueryDescriptor<'_, E>) -> Result<CriteriaQuery> {
        let mut query = CriteriaQuery::new(E::NAME);
        let root = Root::<E>::new();
        let mut ctx = QueryContext::new(&mut query);

        descriptor.where_style.apply(&mut ctx, &root);

        if let Some(order_attrs) = &descriptor.order_attrs {
            if ctx.ordering_requested() {
                return Err(UsageError::MixedOrdering.into());
            }
            let orders = order_attrs.iter().map(|attr| attr.to_order(&root)).collect();
            ctx.apply_ordering(orders);
        }

        if descriptor.distinct {
            ctx.set_distinct_rows(true);
        }

        // Fetch joins must be in place before the session finalizes the query.
        for fetcher in &descriptor.fetchers {
            fetcher(&mut ctx, &root);
        }

        Ok(query)
    }

    /// Build the counting query for a descriptor: where-style only.
    pub fn assemble_count<E: Entity>(
        &self,
        descriptor: &QueryDescriptor<'_, E>,
        distinct_entities: bool,
    ) -> CriteriaQuery {
        let mut query = CriteriaQuery::count(E::NAME, distinct_entities);
        let root = Root::<E>::new();
        descriptor
            .where_style
            .apply(&mut QueryContext::without_sorting(&mut query), &root);
        query
    }

    /// Assemble and finalize a row query.
    pub(crate) fn prepare<E: Entity>(&self, descriptor: &QueryDescriptor<'_, E>) -> Result<TypedQuery> {
        let criteria = self.assemble(descriptor)?;
        self.finalize::<E>(criteria, descriptor.fetch_plan.as_ref())
    }

    /// Finalize an assembled row query and attach the fetch plan.
    pub(crate) fn finalize<E: Entity>(
        &self,
        criteria: CriteriaQuery,
        fetch_plan: Option<&FetchPlan>,
    ) -> Result<TypedQuery> {
        let mut typed = self.session.create_query(criteria)?;
        if let Some(plan) = fetch_plan {
            debug!(
                entity = E::NAME,
                hint = plan.mode.hint_name(),
                nodes = ?plan.graph.nodes(),
                "applying fetch plan"
            );
            typed.set_fetch_hint(plan.clone());
        }
        Ok(typed)
    }

    /// All matching entities.
    pub fn list<E: Entity>(&self, descriptor: &QueryDescriptor<'_, E>) -> Result<Vec<E>> {
        let mut typed = self.prepare(descriptor)?;
        if let Some(limit) = self.config.max_result_rows {
            typed.set_max_results(limit.saturating_add(1));
        }
        let rows = self.session.result_list(typed)?;
        if let Some(limit) = self.config.max_result_rows {
            if rows.len() > limit {
                return Err(Error::ResultLimitExceeded {
                    limit,
                    actual: rows.len(),
                });
            }
        }
        debug!(entity = E::NAME, rows = rows.len(), "list query executed");
        to_entities(rows)
    }

    /// Zero or one matching entity; more than one is an error.
    pub fn optional<E: Entity>(&self, descriptor: &QueryDescriptor<'_, E>) -> Result<Option<E>> {
        let typed = self.prepare(descriptor)?;
        let mut rows = self.session.result_list(typed)?;
        match rows.len() {
            0 | 1 => rows.pop().map(E::from_record).transpose().map_err(Error::from),
            count => Err(Error::NonUniqueResult { count }),
        }
    }

    /// Exactly one matching entity.
    pub fn single<E: Entity>(&self, descriptor: &QueryDescriptor<'_, E>) -> Result<E> {
        let typed = self.prepare(descriptor)?;
        let record = self.session.single_result(typed)?;
        Ok(E::from_record(record)?)
    }

    /// Count matching entities, distinct if the descriptor asks for it.
    pub fn count<E: Entity>(&self, descriptor: &QueryDescriptor<'_, E>) -> Result<u64> {
        self.count_with(descriptor, descriptor.distinct)
    }

    /// Count matching rows, or distinct root entities.
    pub fn count_with<E: Entity>(
        &self,
        descriptor: &QueryDescriptor<'_, E>,
        distinct_entities: bool,
    ) -> Result<u64> {
        let criteria = self.assemble_count(descriptor, distinct_entities);
        let typed = self.session.create_query(criteria)?;
        let count = self.session.scalar(typed)?;
        debug!(entity = E::NAME, count, distinct_entities, "count query executed");
        Ok(count)
    }

    /// Direct identity lookup, bypassing predicate construction.
    pub fn find_by_pk<E: Entity>(&self, pk: &Value) -> Result<Option<E>> {
        let record = self.session.find(E::NAME, pk)?;
        Ok(record.map(E::from_record).transpose()?)
    }
}

pub(crate) fn to_entities<E: Entity>(rows: Vec<Record>) -> Result<Vec<E>> {
    rows.into_iter()
        .map(|row| E::from_record(row).map_err(Error::from))
        .collect()
}
