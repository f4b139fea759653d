//! In-memory [`Session`] implementation.
//!
//! Tables are ordered maps keyed by identity, so unsorted scans come back
//! in key order. A query is evaluated by fanning the root table out over its
//! join clauses, filtering the joined rows, then sorting, de-duplicating and
//! windowing them. Relations on the returned records are materialized
//! according to the fetch plan:
//!
//! - no plan: statically eager relations
//! - `fetchgraph`: exactly the graph's relations
//! - `loadgraph`: the graph's relations plus the eager ones
//!
//! Fetch joins add their relation to whichever graph applies. Eager
//! expansion stops at the configured depth and never re-enters a record
//! already being expanded.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use critq_model::{
    CriteriaQuery, FetchGraph, FetchMode, FetchPlan, JoinId, JoinKind, KeyValue, PathExpr, Record,
    Selection, Source, Value,
};
use parking_lot::RwLock;
use tracing::debug;

use crate::config::{QueryConfig, DEFAULT_MAX_FETCH_DEPTH};
use crate::error::SessionError;
use crate::session::{Session, TypedQuery};

use super::catalog::{Catalog, EntityDef, RelationDef};
use super::evaluator::{ConditionEvaluator, Tuple};

type Table = BTreeMap<KeyValue, Record>;

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<String, Table>,
    /// Next generated identity per entity; `None` once the id space is used up.
    next_ids: HashMap<String, Option<i64>>,
}

impl Tables {
    fn table(&self, entity: &str) -> Result<&Table, SessionError> {
        self.rows
            .get(entity)
            .ok_or_else(|| SessionError::UnknownEntity(entity.to_string()))
    }

    fn table_mut(&mut self, entity: &str) -> Result<&mut Table, SessionError> {
        self.rows
            .get_mut(entity)
            .ok_or_else(|| SessionError::UnknownEntity(entity.to_string()))
    }

    /// Next generated identity. Explicit integer identities move it forward.
    fn next_id(&mut self, entity: &str) -> Result<i64, SessionError> {
        let next = self.next_ids.entry(entity.to_string()).or_insert(Some(1));
        let id = next.ok_or_else(|| {
            SessionError::backend(format!("{entity} identity space exhausted"))
        })?;
        *next = id.checked_add(1);
        Ok(id)
    }

    fn observe_id(&mut self, entity: &str, id: i64) {
        let next = self.next_ids.entry(entity.to_string()).or_insert(Some(1));
        *next = match (*next, id.checked_add(1)) {
            (Some(current), Some(after)) => Some(current.max(after)),
            _ => None,
        };
    }
}

/// Relations to materialize on a result record.
#[derive(Debug)]
struct FetchRequest {
    graph: FetchGraph,
    include_eager: bool,
}

impl FetchRequest {
    fn eager() -> Self {
        Self {
            graph: FetchGraph::new(),
            include_eager: true,
        }
    }

    fn for_query(criteria: &CriteriaQuery, plan: Option<&FetchPlan>) -> Self {
        let (mut nodes, include_eager) = match plan {
            Some(plan) => (
                plan.graph.nodes().to_vec(),
                plan.mode == FetchMode::AssociationsPlusDefaultEager,
            ),
            None => (Vec::new(), true),
        };
        for (index, join) in criteria.joins.iter().enumerate() {
            if join.fetch {
                nodes.extend(join_path(criteria, JoinId(index)));
            }
        }
        Self {
            graph: FetchGraph::from_nodes(nodes),
            include_eager,
        }
    }
}

/// Dotted relation path from the root to a join.
fn join_path(criteria: &CriteriaQuery, id: JoinId) -> Option<String> {
    let join = criteria.join(id)?;
    match join.parent {
        Source::Root => Some(join.relation.clone()),
        Source::Join(parent) if parent.0 < id.0 => {
            join_path(criteria, parent).map(|prefix| format!("{prefix}.{}", join.relation))
        }
        Source::Join(_) => None,
    }
}

fn identity(entity: &EntityDef, record: &Record) -> Option<KeyValue> {
    record.get(&entity.identity_field).and_then(Value::key)
}

/// Entity a path source reads from, given the relations resolved so far.
fn source_entity<'a>(
    root: &'a str,
    relations: &[&'a RelationDef],
    source: Source,
) -> Result<&'a str, SessionError> {
    match source {
        Source::Root => Ok(root),
        Source::Join(id) => relations
            .get(id.0)
            .map(|relation| relation.to_entity.as_str())
            .ok_or_else(|| SessionError::backend(format!("join {} is not defined", id.0))),
    }
}

/// A [`Session`] over in-memory tables.
pub struct MemorySession {
    catalog: Catalog,
    tables: RwLock<Tables>,
    max_fetch_depth: usize,
}

impl MemorySession {
    /// Create an empty session. Fails if the catalog is inconsistent.
    pub fn new(catalog: Catalog) -> Result<Self, SessionError> {
        catalog.validate()?;
        let rows = catalog
            .entity_names()
            .map(|name| (name.to_string(), Table::new()))
            .collect();
        Ok(Self {
            catalog,
            tables: RwLock::new(Tables {
                rows,
                next_ids: HashMap::new(),
            }),
            max_fetch_depth: DEFAULT_MAX_FETCH_DEPTH,
        })
    }

    pub fn with_config(self, config: QueryConfig) -> Self {
        self.with_max_fetch_depth(config.max_fetch_depth)
    }

    /// Limit how deep eager relations are followed.
    pub fn with_max_fetch_depth(mut self, depth: usize) -> Self {
        self.max_fetch_depth = depth;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of stored records of an entity.
    pub fn row_count(&self, entity: &str) -> Result<usize, SessionError> {
        Ok(self.tables.read().table(entity)?.len())
    }

    /// Resolve join relations and check every referenced field.
    fn resolve<'c>(&'c self, criteria: &CriteriaQuery) -> Result<Vec<&'c RelationDef>, SessionError> {
        self.catalog.require_entity(&criteria.root_entity)?;

        let mut relations: Vec<&'c RelationDef> = Vec::with_capacity(criteria.joins.len());
        for join in &criteria.joins {
            let parent = source_entity(&criteria.root_entity, &relations, join.parent)?;
            let relation = self.catalog.relation(parent, &join.relation)?;
            relations.push(relation);
        }

        let mut failure = None;
        if let Some(predicate) = &criteria.predicate {
            predicate.for_each_path(&mut |path: &PathExpr| {
                if failure.is_none() {
                    failure = self.check_path(criteria, &relations, path).err();
                }
            });
        }
        if let Some(err) = failure {
            return Err(err);
        }
        for order in &criteria.order_by {
            self.check_path(criteria, &relations, &order.path)?;
        }
        Ok(relations)
    }

    fn check_path(
        &self,
        criteria: &CriteriaQuery,
        relations: &[&RelationDef],
        path: &PathExpr,
    ) -> Result<(), SessionError> {
        let entity = source_entity(&criteria.root_entity, relations, path.source)?;
        let def = self.catalog.require_entity(entity)?;
        if def.has_field(&path.field) {
            Ok(())
        } else {
            Err(SessionError::UnknownField {
                entity: entity.to_string(),
                field: path.field.clone(),
            })
        }
    }

    /// Target records related to `owner`.
    fn related<'t>(
        &self,
        tables: &'t Tables,
        relation: &RelationDef,
        owner: &Record,
    ) -> Result<Vec<&'t Record>, SessionError> {
        let table = tables.table(&relation.to_entity)?;
        let key = match owner.get(&relation.from_field) {
            Some(value) if !value.is_null() => value,
            _ => return Ok(Vec::new()),
        };
        let target = self.catalog.require_entity(&relation.to_entity)?;
        if relation.to_field == target.identity_field {
            return Ok(key.key().and_then(|k| table.get(&k)).into_iter().collect());
        }
        Ok(table
            .values()
            .filter(|record| {
                record
                    .get(&relation.to_field)
                    .is_some_and(|value| value.loose_eq(key))
            })
            .collect())
    }

    /// Joined and filtered rows of a query, in root key order.
    fn joined_rows<'t>(
        &self,
        tables: &'t Tables,
        criteria: &CriteriaQuery,
        relations: &[&RelationDef],
    ) -> Result<Vec<Tuple<'t>>, SessionError> {
        let mut rows: Vec<Tuple<'t>> = tables
            .table(&criteria.root_entity)?
            .values()
            .map(Tuple::new)
            .collect();

        for (join, relation) in criteria.joins.iter().zip(relations) {
            let mut fanned = Vec::with_capacity(rows.len());
            for mut row in rows {
                let members = match row.source(join.parent) {
                    Some(parent) => self.related(tables, relation, parent)?,
                    None => Vec::new(),
                };
                if members.is_empty() {
                    if join.kind == JoinKind::Left {
                        row.joined.push(None);
                        fanned.push(row);
                    }
                    continue;
                }
                for member in members {
                    let mut joined = row.clone();
                    joined.joined.push(Some(member));
                    fanned.push(joined);
                }
            }
            rows = fanned;
        }

        if let Some(predicate) = &criteria.predicate {
            rows.retain(|row| ConditionEvaluator::evaluate(predicate, row));
        }
        Ok(rows)
    }

    /// Copy of `record` with the requested relations loaded.
    #[allow(clippy::too_many_arguments)]
    fn materialize(
        &self,
        tables: &Tables,
        entity: &str,
        record: &Record,
        graph: &FetchGraph,
        include_eager: bool,
        depth: usize,
        expanding: &mut Vec<(String, KeyValue)>,
    ) -> Result<Record, SessionError> {
        let mut loaded = record.shallow();
        let def = self.catalog.require_entity(entity)?;

        let mut wanted: Vec<&RelationDef> = Vec::new();
        for name in graph.roots() {
            wanted.push(self.catalog.relation(entity, name)?);
        }
        if include_eager && depth < self.max_fetch_depth {
            for relation in self.catalog.eager_relations(entity) {
                if !wanted.iter().any(|w| w.name == relation.name) {
                    wanted.push(relation);
                }
            }
        }
        if wanted.is_empty() {
            return Ok(loaded);
        }

        let key = identity(def, record);
        if let Some(key) = &key {
            expanding.push((entity.to_string(), key.clone()));
        }
        for relation in wanted {
            let subgraph = graph.subgraph(&relation.name);
            let target = self.catalog.require_entity(&relation.to_entity)?;
            let mut members = Vec::new();
            for member in self.related(tables, relation, record)? {
                let cyclic = identity(target, member).is_some_and(|member_key| {
                    expanding
                        .iter()
                        .any(|(name, k)| *name == target.name && *k == member_key)
                });
                if cyclic {
                    members.push(member.shallow());
                } else {
                    members.push(self.materialize(
                        tables,
                        &relation.to_entity,
                        member,
                        &subgraph,
                        include_eager,
                        depth + 1,
                        expanding,
                    )?);
                }
            }
            loaded.set_relation(relation.name.clone(), members);
        }
        if key.is_some() {
            expanding.pop();
        }
        Ok(loaded)
    }

    /// Store a new record, assigning identity and initial version.
    fn insert(&self, tables: &mut Tables, def: &EntityDef, mut record: Record) -> Result<Record, SessionError> {
        let key = match identity(def, &record) {
            Some(key) => {
                if let KeyValue::Int(id) = key {
                    tables.observe_id(&def.name, id);
                }
                key
            }
            None => {
                let id = tables.next_id(&def.name)?;
                record.set(def.identity_field.as_str(), id);
                KeyValue::Int(id)
            }
        };
        if let Some(field) = &def.version_field {
            if record.get(field).map_or(true, Value::is_null) {
                record.set(field.as_str(), 0i64);
            }
        }

        let table = tables.table_mut(&def.name)?;
        if table.contains_key(&key) {
            return Err(SessionError::backend(format!(
                "{} with identity {:?} already exists",
                def.name, key
            )));
        }
        table.insert(key, record.clone());
        Ok(record)
    }
}

impl Session for MemorySession {
    fn create_query(&self, criteria: CriteriaQuery) -> Result<TypedQuery, SessionError> {
        self.resolve(&criteria)?;
        debug!(
            entity = %criteria.root_entity,
            joins = criteria.joins.len(),
            count = criteria.is_count(),
            "query created"
        );
        Ok(TypedQuery::new(criteria))
    }

    fn result_list(&self, query: TypedQuery) -> Result<Vec<Record>, SessionError> {
        let criteria = query.criteria();
        if criteria.is_count() {
            return Err(SessionError::backend("count query executed as a row query"));
        }
        let relations = self.resolve(criteria)?;
        let def = self.catalog.require_entity(&criteria.root_entity)?;
        let tables = self.tables.read();

        let mut rows = self.joined_rows(&tables, criteria, &relations)?;
        if !criteria.order_by.is_empty() {
            rows.sort_by(|a, b| ConditionEvaluator::order(&criteria.order_by, a, b));
        }
        if criteria.distinct {
            let mut seen = BTreeSet::new();
            rows.retain(|row| match identity(def, row.root) {
                Some(key) => seen.insert(key),
                None => true,
            });
        }

        let fetch = FetchRequest::for_query(criteria, query.fetch_plan());
        let limit = query.max_results().unwrap_or(usize::MAX);
        let mut results = Vec::new();
        for row in rows.iter().skip(query.first_result()).take(limit) {
            results.push(self.materialize(
                &tables,
                &criteria.root_entity,
                row.root,
                &fetch.graph,
                fetch.include_eager,
                0,
                &mut Vec::new(),
            )?);
        }

        debug!(
            entity = %criteria.root_entity,
            matched = rows.len(),
            returned = results.len(),
            offset = query.first_result(),
            "rows fetched"
        );
        Ok(results)
    }

    fn scalar(&self, query: TypedQuery) -> Result<u64, SessionError> {
        let criteria = query.criteria();
        let distinct_entities = match criteria.selection {
            Selection::Count { distinct_entities } => distinct_entities,
            Selection::Entities => {
                return Err(SessionError::backend("row query executed as a count query"))
            }
        };
        let relations = self.resolve(criteria)?;
        let def = self.catalog.require_entity(&criteria.root_entity)?;
        let tables = self.tables.read();

        let rows = self.joined_rows(&tables, criteria, &relations)?;
        let count = if distinct_entities {
            rows.iter()
                .filter_map(|row| identity(def, row.root))
                .collect::<BTreeSet<_>>()
                .len()
        } else {
            rows.len()
        };
        Ok(count as u64)
    }

    fn find(&self, entity: &str, pk: &Value) -> Result<Option<Record>, SessionError> {
        self.catalog.require_entity(entity)?;
        let Some(key) = pk.key() else {
            return Ok(None);
        };
        let tables = self.tables.read();
        let Some(record) = tables.table(entity)?.get(&key) else {
            return Ok(None);
        };
        let fetch = FetchRequest::eager();
        self.materialize(
            &tables,
            entity,
            record,
            &fetch.graph,
            fetch.include_eager,
            0,
            &mut Vec::new(),
        )
        .map(Some)
    }

    fn persist(&self, entity: &str, record: Record) -> Result<Record, SessionError> {
        let def = self.catalog.require_entity(entity)?;
        let mut tables = self.tables.write();
        let stored = self.insert(&mut tables, def, record.shallow())?;
        debug!(entity, id = ?stored.get(&def.identity_field), "record persisted");
        Ok(stored)
    }

    fn merge(&self, entity: &str, record: Record) -> Result<Record, SessionError> {
        let def = self.catalog.require_entity(entity)?;
        let mut record = record.shallow();
        let mut tables = self.tables.write();

        let existing = match identity(def, &record) {
            Some(key) => {
                let stored_version = tables.table(entity)?.get(&key).map(|stored| {
                    def.version_field
                        .as_ref()
                        .and_then(|field| stored.get(field))
                        .and_then(Value::as_i64)
                });
                stored_version.map(|version| (key, version))
            }
            None => None,
        };
        let Some((key, stored_version)) = existing else {
            return self.insert(&mut tables, def, record);
        };

        if let (Some(field), Some(actual)) = (&def.version_field, stored_version) {
            // A record without a version stamp is taken as current.
            let expected = record.get(field).and_then(Value::as_i64).unwrap_or(actual);
            if expected != actual {
                return Err(SessionError::OptimisticLock {
                    entity: entity.to_string(),
                    expected,
                    actual,
                });
            }
            let bumped = actual.checked_add(1).ok_or_else(|| {
                SessionError::backend(format!("{entity} version {actual} cannot be incremented"))
            })?;
            record.set(field.as_str(), bumped);
        }

        tables.table_mut(entity)?.insert(key, record.clone());
        debug!(entity, id = ?record.get(&def.identity_field), "record merged");
        Ok(record)
    }

    fn remove(&self, entity: &str, pk: &Value) -> Result<bool, SessionError> {
        self.catalog.require_entity(entity)?;
        let Some(key) = pk.key() else {
            return Ok(false);
        };
        let removed = self.tables.write().table_mut(entity)?.remove(&key).is_some();
        debug!(entity, removed, "remove by identity");
        Ok(removed)
    }

    fn remove_where(&self, criteria: CriteriaQuery) -> Result<usize, SessionError> {
        let relations = self.resolve(&criteria)?;
        let def = self.catalog.require_entity(&criteria.root_entity)?;
        let mut tables = self.tables.write();

        let keys: BTreeSet<KeyValue> = self
            .joined_rows(&tables, &criteria, &relations)?
            .iter()
            .filter_map(|row| identity(def, row.root))
            .collect();

        let table = tables.table_mut(&criteria.root_entity)?;
        let removed = keys.iter().filter(|key| table.remove(*key).is_some()).count();
        debug!(entity = %criteria.root_entity, removed, "bulk remove");
        Ok(removed)
    }
}
