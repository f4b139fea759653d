//! Shared fixture: vendors, car models, cars and manufacturing plants.

#![allow(dead_code)]

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use critq_core::memory::{Catalog, EntityDef, MemorySession, RelationDef};
use critq_core::model::{CriteriaQuery, Record, Value};
use critq_core::{
    read_i64, read_string, Entity, Lazy, Repository, Session, SessionError, TypedQuery,
    VersionAware,
};
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const RENAULT_ID: i64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    pub id: Option<i64>,
    pub name: String,
    pub version: i64,
    pub models: Lazy<Vec<CarModel>>,
    pub manufacturing_plants: Lazy<Vec<ManufacturingPlant>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarModel {
    pub id: Option<i64>,
    pub name: String,
    pub vendor_id: i64,
    pub cars: Lazy<Vec<Car>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    pub id: Option<i64>,
    pub color: String,
    pub model_id: i64,
    pub model: Lazy<Option<CarModel>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturingPlant {
    pub id: Option<i64>,
    pub city: String,
    pub vendor_id: i64,
}

pub mod vendor {
    use super::{CarModel, ManufacturingPlant, Vendor};
    use critq_core::model::{Attribute, RelationAttr};

    pub const ID: Attribute<Vendor, i64> = Attribute::new("id");
    pub const NAME: Attribute<Vendor, String> = Attribute::new("name");
    pub const VERSION: Attribute<Vendor, i64> = Attribute::new("version");
    pub const MODELS: RelationAttr<Vendor, CarModel> = RelationAttr::new("models");
    pub const MANUFACTURING_PLANTS: RelationAttr<Vendor, ManufacturingPlant> =
        RelationAttr::new("manufacturing_plants");
}

pub mod car_model {
    use super::{Car, CarModel, Vendor};
    use critq_core::model::{Attribute, RelationAttr};

    pub const ID: Attribute<CarModel, i64> = Attribute::new("id");
    pub const NAME: Attribute<CarModel, String> = Attribute::new("name");
    pub const VENDOR_ID: Attribute<CarModel, i64> = Attribute::new("vendor_id");
    pub const CARS: RelationAttr<CarModel, Car> = RelationAttr::new("cars");
    pub const VENDOR: RelationAttr<CarModel, Vendor> = RelationAttr::new("vendor");
}

pub mod car {
    use super::{Car, CarModel};
    use critq_core::model::{Attribute, RelationAttr};

    pub const ID: Attribute<Car, i64> = Attribute::new("id");
    pub const COLOR: Attribute<Car, String> = Attribute::new("color");
    pub const MODEL_ID: Attribute<Car, i64> = Attribute::new("model_id");
    pub const MODEL: RelationAttr<Car, CarModel> = RelationAttr::new("model");
}

impl Vendor {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            version: 0,
            models: Lazy::Unloaded,
            manufacturing_plants: Lazy::Unloaded,
        }
    }
}

impl Entity for Vendor {
    const NAME: &'static str = "Vendor";

    fn from_record(mut record: Record) -> Result<Self, SessionError> {
        Ok(Vendor {
            id: Some(read_i64(&record, Self::NAME, "id")?),
            name: read_string(&record, Self::NAME, "name")?,
            version: read_i64(&record, Self::NAME, "version")?,
            models: Lazy::many(&mut record, "models")?,
            manufacturing_plants: Lazy::many(&mut record, "manufacturing_plants")?,
        })
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_field("id", self.id)
            .with_field("name", self.name.as_str())
            .with_field("version", self.version)
    }
}

impl VersionAware for Vendor {
    fn version(&self) -> i64 {
        self.version
    }
}

impl Entity for CarModel {
    const NAME: &'static str = "CarModel";

    fn from_record(mut record: Record) -> Result<Self, SessionError> {
        Ok(CarModel {
            id: Some(read_i64(&record, Self::NAME, "id")?),
            name: read_string(&record, Self::NAME, "name")?,
            vendor_id: read_i64(&record, Self::NAME, "vendor_id")?,
            cars: Lazy::many(&mut record, "cars")?,
        })
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_field("id", self.id)
            .with_field("name", self.name.as_str())
            .with_field("vendor_id", self.vendor_id)
    }
}

impl Car {
    pub fn new(color: &str, model_id: i64) -> Self {
        Self {
            id: None,
            color: color.to_string(),
            model_id,
            model: Lazy::Unloaded,
        }
    }
}

impl Entity for Car {
    const NAME: &'static str = "Car";

    fn from_record(mut record: Record) -> Result<Self, SessionError> {
        Ok(Car {
            id: Some(read_i64(&record, Self::NAME, "id")?),
            color: read_string(&record, Self::NAME, "color")?,
            model_id: read_i64(&record, Self::NAME, "model_id")?,
            model: Lazy::one(&mut record, "model")?,
        })
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_field("id", self.id)
            .with_field("color", self.color.as_str())
            .with_field("model_id", self.model_id)
    }
}

impl Entity for ManufacturingPlant {
    const NAME: &'static str = "ManufacturingPlant";

    fn from_record(record: Record) -> Result<Self, SessionError> {
        Ok(ManufacturingPlant {
            id: Some(read_i64(&record, Self::NAME, "id")?),
            city: read_string(&record, Self::NAME, "city")?,
            vendor_id: read_i64(&record, Self::NAME, "vendor_id")?,
        })
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_field("id", self.id)
            .with_field("city", self.city.as_str())
            .with_field("vendor_id", self.vendor_id)
    }
}

pub fn catalog() -> Catalog {
    Catalog::new()
        .with_entity(
            EntityDef::new("Vendor", "id")
                .with_version_field("version")
                .with_fields(["name"]),
        )
        .with_entity(EntityDef::new("CarModel", "id").with_fields(["name", "vendor_id"]))
        .with_entity(EntityDef::new("Car", "id").with_fields(["color", "model_id"]))
        .with_entity(EntityDef::new("ManufacturingPlant", "id").with_fields(["city", "vendor_id"]))
        .with_relation(RelationDef::one_to_many("models", "Vendor", "id", "CarModel", "vendor_id"))
        .with_relation(
            RelationDef::one_to_many(
                "manufacturing_plants",
                "Vendor",
                "id",
                "ManufacturingPlant",
                "vendor_id",
            )
            .eager(),
        )
        .with_relation(RelationDef::one_to_many("cars", "CarModel", "id", "Car", "model_id"))
        .with_relation(
            RelationDef::many_to_one("vendor", "CarModel", "vendor_id", "Vendor", "id").lazy(),
        )
        .with_relation(RelationDef::many_to_one("model", "Car", "model_id", "CarModel", "id").lazy())
}

/// Fifteen vendors, eleven of them with a lowercase `a` in the name.
pub const VENDORS: [(i64, &str); 15] = [
    (1000, "Renault"),
    (1001, "Mercedes"),
    (1002, "Peugeot"),
    (1003, "Seat"),
    (1004, "Tesla"),
    (1005, "Volkswagen"),
    (1006, "Skoda"),
    (1007, "Fiat"),
    (1008, "Mazda"),
    (1009, "Honda"),
    (1010, "Toyota"),
    (1011, "Dacia"),
    (1012, "Lada"),
    (1013, "BMW"),
    (1014, "Volvo"),
];

const MODELS: [(i64, &str, i64); 6] = [
    (2000, "Clio", 1000),
    (2001, "Megane", 1000),
    (2002, "Talisman", 1000),
    (2003, "Leon", 1003),
    (2004, "Model S", 1004),
    (2005, "Punto", 1007),
];

const CARS: [(i64, &str, i64); 7] = [
    (3000, "green", 2000),
    (3001, "green", 2001),
    (3002, "green", 2002),
    (3003, "red", 2003),
    (3004, "blue", 2004),
    (3005, "blue", 2000),
    (3006, "white", 2005),
];

const PLANTS: [(i64, &str, i64); 4] = [
    (4000, "Flins", 1000),
    (4001, "Douai", 1000),
    (4002, "Martorell", 1003),
    (4003, "Fremont", 1004),
];

/// Session seeded with the fixture data set.
pub fn seeded_session() -> MemorySession {
    let session = MemorySession::new(catalog()).expect("fixture catalog is consistent");
    for (id, name) in VENDORS {
        let vendor = Vendor {
            id: Some(id),
            ..Vendor::new(name)
        };
        session.persist(Vendor::NAME, vendor.to_record()).unwrap();
    }
    for (id, name, vendor_id) in MODELS {
        let model = CarModel {
            id: Some(id),
            name: name.to_string(),
            vendor_id,
            cars: Lazy::Unloaded,
        };
        session.persist(CarModel::NAME, model.to_record()).unwrap();
    }
    for (id, color, model_id) in CARS {
        let car = Car {
            id: Some(id),
            ..Car::new(color, model_id)
        };
        session.persist(Car::NAME, car.to_record()).unwrap();
    }
    for (id, city, vendor_id) in PLANTS {
        let plant = ManufacturingPlant {
            id: Some(id),
            city: city.to_string(),
            vendor_id,
        };
        session.persist(ManufacturingPlant::NAME, plant.to_record()).unwrap();
    }
    session
}

pub fn vendors<S: Session + ?Sized>(session: &S) -> Repository<'_, S, Vendor, i64> {
    Repository::new(session, vendor::ID)
}

pub fn cars<S: Session + ?Sized>(session: &S) -> Repository<'_, S, Car, i64> {
    Repository::new(session, car::ID)
}

pub fn names(vendors: &[Vendor]) -> Vec<&str> {
    vendors.iter().map(|v| v.name.as_str()).collect()
}

/// Session wrapper that counts every query it is asked to build or run.
pub struct CountingSession<'s> {
    inner: &'s MemorySession,
    queries: Cell<usize>,
}

impl<'s> CountingSession<'s> {
    pub fn new(inner: &'s MemorySession) -> Self {
        Self {
            inner,
            queries: Cell::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }

    fn bump(&self) {
        self.queries.set(self.queries.get() + 1);
    }
}

impl Session for CountingSession<'_> {
    fn create_query(&self, criteria: CriteriaQuery) -> Result<TypedQuery, SessionError> {
        self.bump();
        self.inner.create_query(criteria)
    }

    fn result_list(&self, query: TypedQuery) -> Result<Vec<Record>, SessionError> {
        self.bump();
        self.inner.result_list(query)
    }

    fn scalar(&self, query: TypedQuery) -> Result<u64, SessionError> {
        self.bump();
        self.inner.scalar(query)
    }

    fn find(&self, entity: &str, pk: &Value) -> Result<Option<Record>, SessionError> {
        self.bump();
        self.inner.find(entity, pk)
    }

    fn persist(&self, entity: &str, record: Record) -> Result<Record, SessionError> {
        self.inner.persist(entity, record)
    }

    fn merge(&self, entity: &str, record: Record) -> Result<Record, SessionError> {
        self.inner.merge(entity, record)
    }

    fn remove(&self, entity: &str, pk: &Value) -> Result<bool, SessionError> {
        self.inner.remove(entity, pk)
    }

    fn remove_where(&self, criteria: CriteriaQuery) -> Result<usize, SessionError> {
        self.bump();
        self.inner.remove_where(criteria)
    }
}

/// Tracing layer collecting the messages of `WARN` events.
#[derive(Clone, Default)]
pub struct WarningCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl WarningCapture {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for WarningCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.messages.lock().push(visitor.0);
        }
    }
}

/// Run `f` with warnings captured and return them.
pub fn capture_warnings(f: impl FnOnce()) -> Vec<String> {
    use tracing_subscriber::layer::SubscriberExt;

    let capture = WarningCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture.messages()
}
