//! Entity and relation metadata for the in-memory session.

use std::collections::HashMap;

use crate::error::SessionError;

/// Whether a relation yields many members or at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Parent field matched by many child rows.
    OneToMany,
    /// Referencing field matched by at most one target row.
    ManyToOne,
}

/// Static loading policy of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchType {
    /// Loaded with its owner unless a fetch plan says otherwise.
    Eager,
    /// Loaded only when requested.
    Lazy,
}

/// An entity definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    /// Entity name.
    pub name: String,
    /// Primary-key field.
    pub identity_field: String,
    /// Optimistic-lock version field, if versioned.
    pub version_field: Option<String>,
    /// Known fields. Empty means any field is accepted.
    pub fields: Vec<String>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: identity_field.into(),
            version_field: None,
            fields: Vec::new(),
        }
    }

    /// Mark the entity as versioned.
    pub fn with_version_field(mut self, field: impl Into<String>) -> Self {
        self.version_field = Some(field.into());
        self
    }

    /// Declare the entity's fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a field may be referenced in a query.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.is_empty()
            || field == self.identity_field
            || self.version_field.as_deref() == Some(field)
            || self.fields.iter().any(|f| f == field)
    }
}

/// A relation definition: target rows whose `to_field` equals the owner's
/// `from_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation name, unique per owning entity.
    pub name: String,
    /// Owning entity.
    pub from_entity: String,
    /// Field on the owner.
    pub from_field: String,
    /// Target entity.
    pub to_entity: String,
    /// Field on the target.
    pub to_field: String,
    pub cardinality: Cardinality,
    pub fetch: FetchType,
}

impl RelationDef {
    /// To-many relation, lazy by default.
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::OneToMany,
            fetch: FetchType::Lazy,
        }
    }

    /// To-one relation, eager by default.
    pub fn many_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::ManyToOne,
            fetch: FetchType::Eager,
        }
    }

    pub fn with_fetch(mut self, fetch: FetchType) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn eager(self) -> Self {
        self.with_fetch(FetchType::Eager)
    }

    pub fn lazy(self) -> Self {
        self.with_fetch(FetchType::Lazy)
    }

    pub fn is_eager(&self) -> bool {
        self.fetch == FetchType::Eager
    }
}

/// Entities and relations known to a session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: HashMap<String, EntityDef>,
    relations: Vec<RelationDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Entity definition or `UnknownEntity`.
    pub fn require_entity(&self, name: &str) -> Result<&EntityDef, SessionError> {
        self.entity(name)
            .ok_or_else(|| SessionError::UnknownEntity(name.to_string()))
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Relation `name` owned by `entity`, or `UnknownRelation`.
    pub fn relation(&self, entity: &str, name: &str) -> Result<&RelationDef, SessionError> {
        self.relations
            .iter()
            .find(|r| r.from_entity == entity && r.name == name)
            .ok_or_else(|| SessionError::UnknownRelation {
                entity: entity.to_string(),
                relation: name.to_string(),
            })
    }

    /// Relations owned by `entity` that load by default.
    pub fn eager_relations<'c>(&'c self, entity: &'c str) -> impl Iterator<Item = &'c RelationDef> + 'c {
        self.relations
            .iter()
            .filter(move |r| r.from_entity == entity && r.is_eager())
    }

    /// Check that every relation connects known entities and fields.
    pub fn validate(&self) -> Result<(), SessionError> {
        for relation in &self.relations {
            let from = self.require_entity(&relation.from_entity)?;
            let to = self.require_entity(&relation.to_entity)?;
            if !from.has_field(&relation.from_field) {
                return Err(SessionError::UnknownField {
                    entity: from.name.clone(),
                    field: relation.from_field.clone(),
                });
            }
            if !to.has_field(&relation.to_field) {
                return Err(SessionError::UnknownField {
                    entity: to.name.clone(),
                    field: relation.to_field.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new()
            .with_entity(EntityDef::new("Vendor", "id").with_fields(["name"]))
            .with_entity(EntityDef::new("Plant", "id").with_fields(["city", "vendor_id"]))
            .with_relation(RelationDef::one_to_many("plants", "Vendor", "id", "Plant", "vendor_id").eager())
    }

    #[test]
    fn test_relation_defaults() {
        let rel = RelationDef::one_to_many("models", "Vendor", "id", "CarModel", "vendor_id");
        assert_eq!(rel.cardinality, Cardinality::OneToMany);
        assert!(!rel.is_eager());

        let rel = RelationDef::many_to_one("vendor", "CarModel", "vendor_id", "Vendor", "id");
        assert_eq!(rel.cardinality, Cardinality::ManyToOne);
        assert!(rel.is_eager());
        assert!(!rel.lazy().is_eager());
    }

    #[test]
    fn test_lookup() {
        let catalog = catalog();
        assert!(catalog.relation("Vendor", "plants").is_ok());
        assert!(matches!(
            catalog.relation("Plant", "plants"),
            Err(SessionError::UnknownRelation { .. })
        ));
        assert_eq!(catalog.eager_relations("Vendor").count(), 1);
        assert!(catalog.require_entity("Boat").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(catalog().validate().is_ok());
        let broken = catalog().with_relation(RelationDef::one_to_many(
            "ghosts", "Vendor", "id", "Ghost", "vendor_id",
        ));
        assert!(matches!(broken.validate(), Err(SessionError::UnknownEntity(_))));

        let broken = catalog().with_relation(RelationDef::one_to_many(
            "plants2", "Vendor", "id", "Plant", "owner_id",
        ));
        assert!(matches!(broken.validate(), Err(SessionError::UnknownField { .. })));
    }

    #[test]
    fn test_field_declarations() {
        let def = EntityDef::new("Vendor", "id")
            .with_version_field("version")
            .with_fields(["name"]);
        assert!(def.has_field("id"));
        assert!(def.has_field("version"));
        assert!(def.has_field("name"));
        assert!(!def.has_field("color"));
        assert!(EntityDef::new("Any", "id").has_field("whatever"));
    }
}
