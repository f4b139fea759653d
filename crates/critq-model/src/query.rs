//! Criteria query IR and the shaping context handed to fragments.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::metamodel::{Join, JoinId, JoinSource, RelationAttr, Source};
use crate::order::Order;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    /// Drop parent rows without a match.
    Inner,
    /// Keep parent rows without a match, with the joined side null.
    Left,
}

/// One join clause of a criteria query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
    /// Entity the relation is navigated from.
    pub parent: Source,
    /// Relation name on the parent entity.
    pub relation: String,
    /// Join type.
    pub kind: JoinKind,
    /// Whether the joined relation is also materialized on the results.
    pub fetch: bool,
}

/// What a criteria query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Root entities.
    Entities,
    /// A scalar count of matching rows, or of distinct root entities.
    Count { distinct_entities: bool },
}

/// A criteria query rooted at one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaQuery {
    /// Root entity name.
    pub root_entity: String,
    /// Join clauses; a [`JoinId`] indexes into this list.
    pub joins: Vec<JoinClause>,
    /// Filter predicate.
    pub predicate: Option<Condition>,
    /// Sort keys in precedence order.
    pub order_by: Vec<Order>,
    /// Collapse rows to distinct root entities.
    pub distinct: bool,
    /// Result selection.
    pub selection: Selection,
}

impl CriteriaQuery {
    /// Create an entity-selecting query.
    pub fn new(root_entity: impl Into<String>) -> Self {
        Self {
            root_entity: root_entity.into(),
            joins: Vec::new(),
            predicate: None,
            order_by: Vec::new(),
            distinct: false,
            selection: Selection::Entities,
        }
    }

    /// Create a counting query.
    pub fn count(root_entity: impl Into<String>, distinct_entities: bool) -> Self {
        Self {
            selection: Selection::Count { distinct_entities },
            ..Self::new(root_entity)
        }
    }

    /// Whether this query selects a count.
    pub fn is_count(&self) -> bool {
        matches!(self.selection, Selection::Count { .. })
    }

    /// Look up a join clause by id.
    pub fn join(&self, id: JoinId) -> Option<&JoinClause> {
        self.joins.get(id.0)
    }
}

/// Mutable shaping capability over a fresh [`CriteriaQuery`].
///
/// Fragments receive a context and shape the query through it: joins,
/// predicate, ordering and distinct. A context created with
/// [`QueryContext::without_sorting`] drops ordering requests, which is how
/// counting queries reuse fragments written for row queries.
#[derive(Debug)]
pub struct QueryContext<'q> {
    query: &'q mut CriteriaQuery,
    sorting: bool,
    ordering_requested: bool,
}

impl<'q> QueryContext<'q> {
    /// Context that honors ordering.
    pub fn new(query: &'q mut CriteriaQuery) -> Self {
        Self {
            query,
            sorting: true,
            ordering_requested: false,
        }
    }

    /// Context that ignores ordering.
    pub fn without_sorting(query: &'q mut CriteriaQuery) -> Self {
        Self {
            sorting: false,
            ..Self::new(query)
        }
    }

    fn add_join<P, T>(
        &mut self,
        parent: &impl JoinSource<P>,
        relation: RelationAttr<P, T>,
        kind: JoinKind,
        fetch: bool,
    ) -> Join<T> {
        let id = JoinId(self.query.joins.len());
        self.query.joins.push(JoinClause {
            parent: parent.source(),
            relation: relation.name().to_string(),
            kind,
            fetch,
        });
        Join::new(id)
    }

    /// Inner join a relation.
    pub fn join<P, T>(&mut self, parent: &impl JoinSource<P>, relation: RelationAttr<P, T>) -> Join<T> {
        self.add_join(parent, relation, JoinKind::Inner, false)
    }

    /// Left join a relation.
    pub fn left_join<P, T>(
        &mut self,
        parent: &impl JoinSource<P>,
        relation: RelationAttr<P, T>,
    ) -> Join<T> {
        self.add_join(parent, relation, JoinKind::Left, false)
    }

    /// Fetch join a relation: left join it and materialize it on the results.
    pub fn fetch<P, T>(&mut self, parent: &impl JoinSource<P>, relation: RelationAttr<P, T>) -> Join<T> {
        self.add_join(parent, relation, JoinKind::Left, true)
    }

    /// Set the query predicate, replacing any previous one.
    pub fn apply_predicate(&mut self, condition: Condition) {
        self.query.predicate = Some(condition);
    }

    /// Set the query ordering, replacing any previous one.
    ///
    /// Ignored when the context does not sort, but still remembered so that
    /// [`QueryContext::ordering_requested`] reports it.
    pub fn apply_ordering(&mut self, orders: Vec<Order>) {
        if !orders.is_empty() {
            self.ordering_requested = true;
        }
        if self.sorting {
            self.query.order_by = orders;
        }
    }

    /// Collapse result rows to distinct root entities.
    pub fn set_distinct_rows(&mut self, distinct: bool) {
        self.query.distinct = distinct;
    }

    /// Whether the context honors ordering.
    pub fn is_sorting(&self) -> bool {
        self.sorting
    }

    /// Whether the query currently has sort keys.
    pub fn has_ordering(&self) -> bool {
        !self.query.order_by.is_empty()
    }

    /// Whether any fragment asked for a non-empty ordering.
    pub fn ordering_requested(&self) -> bool {
        self.ordering_requested
    }

    /// Read-only view of the query being shaped.
    pub fn query(&self) -> &CriteriaQuery {
        self.query
    }
}
