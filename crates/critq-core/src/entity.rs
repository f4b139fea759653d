//! Entity mapping traits.

use critq_model::{Record, Value};

use crate::error::SessionError;

/// A type stored by a persistence session.
pub trait Entity: Sized {
    /// Entity name as registered with the session.
    const NAME: &'static str;

    /// Build the entity from a stored record.
    fn from_record(record: Record) -> Result<Self, SessionError>;

    /// Convert the entity to a record. Relations are not written.
    fn to_record(&self) -> Record;
}

/// An entity carrying an optimistic-lock version stamp.
pub trait VersionAware: Entity {
    fn version(&self) -> i64;
}

/// A relation that may or may not have been materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Lazy<T> {
    #[default]
    Unloaded,
    Loaded(T),
}

impl<T> Lazy<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Lazy::Loaded(_))
    }

    /// The loaded value, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Lazy::Loaded(value) => Some(value),
            Lazy::Unloaded => None,
        }
    }

    pub fn into_loaded(self) -> Option<T> {
        match self {
            Lazy::Loaded(value) => Some(value),
            Lazy::Unloaded => None,
        }
    }
}

impl<T: Entity> Lazy<Vec<T>> {
    /// Take a to-many relation out of a record.
    pub fn many(record: &mut Record, relation: &str) -> Result<Self, SessionError> {
        match record.take_relation(relation) {
            Some(members) => members
                .into_iter()
                .map(T::from_record)
                .collect::<Result<Vec<_>, _>>()
                .map(Lazy::Loaded),
            None => Ok(Lazy::Unloaded),
        }
    }
}

impl<T: Entity> Lazy<Option<T>> {
    /// Take a to-one relation out of a record.
    pub fn one(record: &mut Record, relation: &str) -> Result<Self, SessionError> {
        match record.take_relation(relation) {
            Some(members) => members
                .into_iter()
                .next()
                .map(T::from_record)
                .transpose()
                .map(Lazy::Loaded),
            None => Ok(Lazy::Unloaded),
        }
    }
}

/// Read a required string field.
pub fn read_string(record: &Record, entity: &str, field: &str) -> Result<String, SessionError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SessionError::mapping(entity, field))
}

/// Read a required integer field.
pub fn read_i64(record: &Record, entity: &str, field: &str) -> Result<i64, SessionError> {
    record
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| SessionError::mapping(entity, field))
}

/// Read an optional integer field; absent and null both yield `None`.
pub fn read_opt_i64(record: &Record, entity: &str, field: &str) -> Result<Option<i64>, SessionError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| SessionError::mapping(entity, field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Plant {
        id: i64,
        city: String,
    }

    impl Entity for Plant {
        const NAME: &'static str = "Plant";

        fn from_record(record: Record) -> Result<Self, SessionError> {
            Ok(Plant {
                id: read_i64(&record, Self::NAME, "id")?,
                city: read_string(&record, Self::NAME, "city")?,
            })
        }

        fn to_record(&self) -> Record {
            Record::new()
                .with_field("id", self.id)
                .with_field("city", self.city.as_str())
        }
    }

    #[test]
    fn test_unloaded_relation() {
        let mut record = Record::new();
        let plants = Lazy::<Vec<Plant>>::many(&mut record, "plants").unwrap();
        assert!(!plants.is_loaded());
        assert_eq!(plants.get(), None);
    }

    #[test]
    fn test_loaded_relations() {
        let plant = Plant {
            id: 1,
            city: "Mlada Boleslav".into(),
        };
        let mut record = Record::new();
        record.set_relation("plants", vec![plant.to_record()]);
        record.set_relation("hq", Vec::new());

        let plants = Lazy::<Vec<Plant>>::many(&mut record, "plants").unwrap();
        assert_eq!(plants.get().map(Vec::len), Some(1));

        let hq = Lazy::<Option<Plant>>::one(&mut record, "hq").unwrap();
        assert_eq!(hq, Lazy::Loaded(None));
    }

    #[test]
    fn test_mapping_errors() {
        let record = Record::new().with_field("id", "not a number");
        assert!(matches!(
            Plant::from_record(record),
            Err(SessionError::Mapping(_))
        ));
        let record = Record::new().with_field("n", Value::Null);
        assert_eq!(read_opt_i64(&record, "X", "n").unwrap(), None);
    }
}
