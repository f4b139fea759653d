//! Dynamic entity rows exchanged with a persistence session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A stored entity as named field values plus any materialized relations.
///
/// A relation missing from [`Record::relations`] was not loaded; a present
/// but empty list means it was loaded and has no members.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: Vec<(String, Value)>,
    pub relations: BTreeMap<String, Vec<Record>>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Field value, if the field exists.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Set a field, replacing an existing value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Whether a relation was materialized.
    pub fn is_loaded(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    /// Materialized members of a relation.
    pub fn relation(&self, relation: &str) -> Option<&[Record]> {
        self.relations.get(relation).map(Vec::as_slice)
    }

    /// Store materialized relation members.
    pub fn set_relation(&mut self, relation: impl Into<String>, members: Vec<Record>) {
        self.relations.insert(relation.into(), members);
    }

    /// Remove and return materialized relation members.
    pub fn take_relation(&mut self, relation: &str) -> Option<Vec<Record>> {
        self.relations.remove(relation)
    }

    /// Copy of the record without materialized relations.
    pub fn shallow(&self) -> Record {
        Record {
            fields: self.fields.clone(),
            relations: BTreeMap::new(),
        }
    }
}
