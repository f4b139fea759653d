//! Repository base for per-entity repositories.
//!
//! A concrete repository wraps a [`Repository`] and exposes domain methods
//! built from its primitives:
//!
//! ```ignore
//! pub struct CarRepository<'s> {
//!     base: Repository<'s, MemorySession, Car, i64>,
//! }
//!
//! impl CarRepository<'_> {
//!     pub fn find_by_color(&self, color: &str) -> Result<Vec<Car>> {
//!         self.base.find_where(|_, root| root.get(Car::COLOR).eq(color))
//!     }
//! }
//! ```
//!
//! Write access is part of the repository type. [`Repository::new`] builds a
//! full [`CrudRepository`]; [`Repository::read_persist`] and
//! [`Repository::read_only`] narrow it. Narrowing cannot be undone, so a
//! [`ReadOnlyRepository`] handed out to a caller never writes:
//!
//! ```compile_fail
//! # use critq_core::memory::{Catalog, EntityDef, MemorySession};
//! # use critq_core::model::{Attribute, Record};
//! # use critq_core::{read_i64, Entity, Repository, SessionError};
//! # struct Tag { id: i64 }
//! # impl Entity for Tag {
//! #     const NAME: &'static str = "Tag";
//! #     fn from_record(record: Record) -> Result<Self, SessionError> {
//! #         Ok(Tag { id: read_i64(&record, Self::NAME, "id")? })
//! #     }
//! #     fn to_record(&self) -> Record {
//! #         Record::new().with_field("id", self.id)
//! #     }
//! # }
//! # let session = MemorySession::new(Catalog::new().with_entity(EntityDef::new("Tag", "id"))).unwrap();
//! let tags = Repository::new(&session, Attribute::<Tag, i64>::new("id")).read_only();
//! tags.persist(&Tag { id: 1 }).unwrap();
//! ```

use std::marker::PhantomData;

use critq_model::{
    Attribute, Condition, CriteriaQuery, FetchGraph, FetchPlan, QueryContext, ResultPage, Root,
    Value,
};
use tracing::debug;

use crate::config::QueryConfig;
use crate::descriptor::{QueryDescriptor, QueryParts};
use crate::entity::{Entity, VersionAware};
use crate::error::{Error, Result, SessionError, UsageError};
use crate::executor::QueryExecutor;
use crate::fragment::{PredicateAndOrder, PredicateFn};
use crate::select::Select;
use crate::session::Session;

mod sealed {
    pub trait Sealed {}
}

/// Write access level of a [`Repository`].
pub trait Access: sealed::Sealed {}

/// Access levels that may persist new entities.
pub trait PersistAccess: Access {}

/// Access levels that may merge and remove entities.
pub trait CrudAccess: PersistAccess {}

/// Reads only.
#[derive(Debug)]
pub enum ReadOnly {}

/// Reads plus `persist`.
#[derive(Debug)]
pub enum ReadPersist {}

/// Reads, `persist`, `merge` and the remove operations.
#[derive(Debug)]
pub enum Crud {}

impl sealed::Sealed for ReadOnly {}
impl sealed::Sealed for ReadPersist {}
impl sealed::Sealed for Crud {}
impl Access for ReadOnly {}
impl Access for ReadPersist {}
impl Access for Crud {}
impl PersistAccess for ReadPersist {}
impl PersistAccess for Crud {}
impl CrudAccess for Crud {}

pub type ReadOnlyRepository<'s, S, E, P> = Repository<'s, S, E, P, ReadOnly>;
pub type ReadPersistRepository<'s, S, E, P> = Repository<'s, S, E, P, ReadPersist>;
pub type CrudRepository<'s, S, E, P> = Repository<'s, S, E, P, Crud>;

/// Binds a session, an entity type and its primary-key attribute.
pub struct Repository<'s, S: ?Sized, E, P, A = Crud> {
    session: &'s S,
    pk: Attribute<E, P>,
    config: QueryConfig,
    _access: PhantomData<fn() -> A>,
}

impl<'s, S, E, P> Repository<'s, S, E, P, Crud>
where
    S: Session + ?Sized,
    E: Entity + 'static,
    P: Clone + Into<Value> + 'static,
{
    pub fn new(session: &'s S, pk: Attribute<E, P>) -> Self {
        Self {
            session,
            pk,
            config: QueryConfig::default(),
            _access: PhantomData,
        }
    }
}

impl<'s, S, E, P, A> Repository<'s, S, E, P, A>
where
    S: Session + ?Sized,
    E: Entity + 'static,
    P: Clone + Into<Value> + 'static,
    A: Access,
{
    fn narrow<B: Access>(self) -> Repository<'s, S, E, P, B> {
        Repository {
            session: self.session,
            pk: self.pk,
            config: self.config,
            _access: PhantomData,
        }
    }

    /// Drop all write access.
    pub fn read_only(self) -> ReadOnlyRepository<'s, S, E, P> {
        self.narrow()
    }

    /// Keep `persist`, drop `merge` and the remove operations.
    pub fn read_persist(self) -> ReadPersistRepository<'s, S, E, P>
    where
        A: PersistAccess,
    {
        self.narrow()
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session(&self) -> &'s S {
        self.session
    }

    /// Primary-key attribute.
    pub fn pk(&self) -> Attribute<E, P> {
        self.pk
    }

    fn executor(&self) -> QueryExecutor<'s, S> {
        QueryExecutor::new(self.session).with_config(self.config)
    }

    fn pk_descriptor(&self, pk: P, fetch_plan: Option<FetchPlan>) -> QueryDescriptor<'static, E> {
        let attribute = self.pk;
        let mut descriptor =
            QueryDescriptor::predicate(move |_, root: &Root<E>| root.get(attribute).eq(pk.clone()));
        descriptor.fetch_plan = fetch_plan;
        descriptor
    }

    fn predicate_descriptor<'a, F>(f: F, fetch_plan: Option<FetchPlan>) -> QueryDescriptor<'a, E>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition + 'a,
    {
        let mut descriptor = QueryDescriptor::predicate(f);
        descriptor.fetch_plan = fetch_plan;
        descriptor
    }

    fn conjunction<'a>(predicates: Vec<PredicateFn<'a, E>>, fetch_plan: Option<FetchPlan>) -> QueryDescriptor<'a, E> {
        Self::predicate_descriptor(
            move |ctx, root| Condition::all(predicates.iter().map(|predicate| predicate(ctx, root))),
            fetch_plan,
        )
    }

    /// Start a fluent query.
    pub fn select<'a>(&self) -> Select<'s, 'a, S, E> {
        Select::with_executor(self.executor())
    }

    /// Run a raw query-shape fragment.
    pub fn find<F>(&self, shape: F, fetch_plan: Option<FetchPlan>) -> Result<Vec<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>),
    {
        let mut descriptor = QueryDescriptor::query_shape(shape);
        descriptor.fetch_plan = fetch_plan;
        self.executor().list(&descriptor)
    }

    pub fn find_all(&self) -> Result<Vec<E>> {
        self.find_all_with(None)
    }

    pub fn find_all_with(&self, fetch_plan: Option<FetchPlan>) -> Result<Vec<E>> {
        let mut descriptor = QueryDescriptor::new();
        descriptor.fetch_plan = fetch_plan;
        self.executor().list(&descriptor)
    }

    pub fn find_where<F>(&self, predicate: F) -> Result<Vec<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        self.find_where_with(predicate, None)
    }

    pub fn find_where_with<F>(&self, predicate: F, fetch_plan: Option<FetchPlan>) -> Result<Vec<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        self.executor()
            .list(&Self::predicate_descriptor(predicate, fetch_plan))
    }

    pub fn find_where_ordered<F>(&self, fragment: F) -> Result<Vec<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder,
    {
        self.find_where_ordered_with(fragment, None)
    }

    pub fn find_where_ordered_with<F>(&self, fragment: F, fetch_plan: Option<FetchPlan>) -> Result<Vec<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder,
    {
        let mut descriptor = QueryDescriptor::predicate_and_order(fragment);
        descriptor.fetch_plan = fetch_plan;
        self.executor().list(&descriptor)
    }

    /// Zero or one entity matching the predicate.
    pub fn get_where<F>(&self, predicate: F) -> Result<Option<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        self.get_where_with(predicate, None)
    }

    pub fn get_where_with<F>(&self, predicate: F, fetch_plan: Option<FetchPlan>) -> Result<Option<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        self.executor()
            .optional(&Self::predicate_descriptor(predicate, fetch_plan))
    }

    /// Zero or one entity matching all predicates.
    pub fn get_where_all(
        &self,
        predicates: Vec<PredicateFn<'_, E>>,
        fetch_plan: Option<FetchPlan>,
    ) -> Result<Option<E>> {
        self.executor()
            .optional(&Self::conjunction(predicates, fetch_plan))
    }

    /// Exactly one entity matching the predicate.
    pub fn load_where<F>(&self, predicate: F) -> Result<E>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        self.load_where_with(predicate, None)
    }

    pub fn load_where_with<F>(&self, predicate: F, fetch_plan: Option<FetchPlan>) -> Result<E>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        self.executor()
            .single(&Self::predicate_descriptor(predicate, fetch_plan))
    }

    /// Exactly one entity matching all predicates.
    pub fn load_where_all(
        &self,
        predicates: Vec<PredicateFn<'_, E>>,
        fetch_plan: Option<FetchPlan>,
    ) -> Result<E> {
        self.executor()
            .single(&Self::conjunction(predicates, fetch_plan))
    }

    /// Direct session lookup by primary key.
    pub fn get_by_pk(&self, pk: P) -> Result<Option<E>> {
        self.executor().find_by_pk(&pk.into())
    }

    /// Primary-key lookup through the predicate path, with a fetch plan.
    pub fn get_by_pk_with(&self, pk: P, fetch_plan: Option<FetchPlan>) -> Result<Option<E>> {
        self.executor().optional(&self.pk_descriptor(pk, fetch_plan))
    }

    pub fn load_by_pk(&self, pk: P) -> Result<E> {
        self.load_by_pk_with(pk, None)
    }

    pub fn load_by_pk_with(&self, pk: P, fetch_plan: Option<FetchPlan>) -> Result<E> {
        self.executor().single(&self.pk_descriptor(pk, fetch_plan))
    }

    /// Count entities matching the predicate; `distinct` counts root entities.
    pub fn count_where<F>(&self, predicate: F, distinct: bool) -> Result<u64>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        self.executor()
            .count_with(&QueryDescriptor::predicate(predicate), distinct)
    }

    /// One page of entities. The fragment must supply an ordering.
    pub fn page_where<F>(&self, fragment: F, page_number: u32, page_size: u32) -> Result<ResultPage<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder,
    {
        self.page_where_with(fragment, page_number, page_size, false, None)
    }

    pub fn page_where_with<F>(
        &self,
        fragment: F,
        page_number: u32,
        page_size: u32,
        distinct: bool,
        fetch_plan: Option<FetchPlan>,
    ) -> Result<ResultPage<E>>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> PredicateAndOrder,
    {
        let descriptor = QueryParts::new()
            .with_predicate_and_order(Box::new(fragment))
            .with_fetch_plan(fetch_plan)
            .distinct(distinct)
            .into_descriptor()?;
        self.executor().page(&descriptor, page_number, page_size)
    }

    /// Fetch graph from raw node paths.
    pub fn fetch_graph<I, N>(&self, nodes: I) -> FetchGraph
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        FetchGraph::from_nodes(nodes)
    }

}

impl<'s, S, E, P, A> Repository<'s, S, E, P, A>
where
    S: Session + ?Sized,
    E: Entity + 'static,
    P: Clone + Into<Value> + 'static,
    A: PersistAccess,
{
    pub fn persist(&self, entity: &E) -> Result<E> {
        let stored = self.session.persist(E::NAME, entity.to_record())?;
        Ok(E::from_record(stored)?)
    }
}

impl<'s, S, E, P, A> Repository<'s, S, E, P, A>
where
    S: Session + ?Sized,
    E: Entity + 'static,
    P: Clone + Into<Value> + 'static,
    A: CrudAccess,
{
    pub fn merge(&self, entity: &E) -> Result<E> {
        let stored = self.session.merge(E::NAME, entity.to_record())?;
        Ok(E::from_record(stored)?)
    }

    /// Delete an entity by its primary key. Returns whether it existed.
    pub fn remove(&self, entity: &E) -> Result<bool> {
        let record = entity.to_record();
        let pk = record
            .get(self.pk.name())
            .filter(|value| !value.is_null())
            .ok_or_else(|| SessionError::mapping(E::NAME, self.pk.name()))?;
        Ok(self.session.remove(E::NAME, pk)?)
    }

    pub fn remove_by_pk(&self, pk: P) -> Result<bool> {
        Ok(self.session.remove(E::NAME, &pk.into())?)
    }

    /// Delete every entity matching the predicate.
    pub fn remove_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&mut QueryContext<'_>, &Root<E>) -> Condition,
    {
        let mut criteria = CriteriaQuery::new(E::NAME);
        let root = Root::<E>::new();
        let mut ctx = QueryContext::without_sorting(&mut criteria);
        let condition = predicate(&mut ctx, &root);
        ctx.apply_predicate(condition);
        let removed = self.session.remove_where(criteria)?;
        debug!(entity = E::NAME, removed, "removed by predicate");
        Ok(removed)
    }
}

impl<'s, S, E, P, A> Repository<'s, S, E, P, A>
where
    S: Session + ?Sized,
    E: VersionAware + 'static,
    P: Clone + Into<Value> + 'static,
    A: Access,
{
    /// Load by primary key and verify the version stamp.
    pub fn load_by_pk_and_version(
        &self,
        pk: impl Into<Option<P>>,
        expected_version: impl Into<Option<i64>>,
    ) -> Result<E> {
        self.load_by_pk_and_version_with(pk, expected_version, None)
    }

    /// Load by primary key with a fetch plan and verify the version stamp.
    ///
    /// This is a read-side staleness check only; write-side locking stays
    /// with the session's `merge`.
    pub fn load_by_pk_and_version_with(
        &self,
        pk: impl Into<Option<P>>,
        expected_version: impl Into<Option<i64>>,
        fetch_plan: Option<FetchPlan>,
    ) -> Result<E> {
        let pk = pk
            .into()
            .filter(|pk| !Into::<Value>::into(pk.clone()).is_null())
            .ok_or(UsageError::MissingArgument("pk"))?;
        let expected = expected_version
            .into()
            .ok_or(UsageError::MissingArgument("expected_version"))?;

        let entity = self.load_by_pk_with(pk, fetch_plan)?;
        let actual = entity.version();
        if actual != expected {
            return Err(Error::OptimisticConflict {
                entity: E::NAME,
                expected,
                actual,
            });
        }
        Ok(entity)
    }
}
