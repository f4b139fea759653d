//! Persistence session interface.
//!
//! The query layer never touches storage directly. It shapes a
//! [`CriteriaQuery`], asks the session to finalize it into a [`TypedQuery`],
//! attaches the fetch hint and window to that handle, and hands it back for
//! execution. Executing consumes the handle, so nothing can be attached to a
//! query after it ran.

use critq_model::{CriteriaQuery, FetchPlan, Record, Value};

use crate::error::SessionError;

/// A finalized query that has not been executed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedQuery {
    criteria: CriteriaQuery,
    fetch_plan: Option<FetchPlan>,
    first_result: usize,
    max_results: Option<usize>,
}

impl TypedQuery {
    /// Wrap a criteria query. Sessions call this from [`Session::create_query`].
    pub fn new(criteria: CriteriaQuery) -> Self {
        Self {
            criteria,
            fetch_plan: None,
            first_result: 0,
            max_results: None,
        }
    }

    pub fn criteria(&self) -> &CriteriaQuery {
        &self.criteria
    }

    /// Attach a fetch plan, replacing any previous one.
    pub fn set_fetch_hint(&mut self, plan: FetchPlan) -> &mut Self {
        self.fetch_plan = Some(plan);
        self
    }

    pub fn fetch_plan(&self) -> Option<&FetchPlan> {
        self.fetch_plan.as_ref()
    }

    /// Number of leading rows to skip.
    pub fn set_first_result(&mut self, offset: usize) -> &mut Self {
        self.first_result = offset;
        self
    }

    pub fn first_result(&self) -> usize {
        self.first_result
    }

    /// Maximum number of rows to return.
    pub fn set_max_results(&mut self, limit: usize) -> &mut Self {
        self.max_results = Some(limit);
        self
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }
}

/// Generic entity persistence session.
///
/// Records are keyed by entity name; the session knows each entity's
/// identity field. Implementations decide their own locking and
/// transaction discipline.
pub trait Session {
    /// Finalize a criteria query. Fails on unknown entities, fields or relations.
    fn create_query(&self, criteria: CriteriaQuery) -> Result<TypedQuery, SessionError>;

    /// Execute an entity query and return all rows in the window.
    fn result_list(&self, query: TypedQuery) -> Result<Vec<Record>, SessionError>;

    /// Execute an entity query expecting exactly one row.
    fn single_result(&self, query: TypedQuery) -> Result<Record, SessionError> {
        let mut rows = self.result_list(query)?;
        match rows.len() {
            0 | 1 => rows.pop().ok_or(SessionError::NoResult),
            count => Err(SessionError::NonUniqueResult { count }),
        }
    }

    /// Execute a counting query.
    fn scalar(&self, query: TypedQuery) -> Result<u64, SessionError>;

    /// Direct lookup by primary key.
    fn find(&self, entity: &str, pk: &Value) -> Result<Option<Record>, SessionError>;

    /// Store a new record and return it as stored.
    fn persist(&self, entity: &str, record: Record) -> Result<Record, SessionError>;

    /// Update an existing record (or store it if new) and return it as stored.
    fn merge(&self, entity: &str, record: Record) -> Result<Record, SessionError>;

    /// Delete by primary key. Returns whether a record was removed.
    fn remove(&self, entity: &str, pk: &Value) -> Result<bool, SessionError>;

    /// Delete every root entity matching the query predicate.
    fn remove_where(&self, criteria: CriteriaQuery) -> Result<usize, SessionError>;
}
