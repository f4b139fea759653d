//! critq core - criteria queries, fetch plans and pagination.
//!
//! A generic query layer over a persistence [`Session`]. Callers describe
//! a query with closures over a [`QueryContext`] and a typed [`Root`],
//! either through the strict [`QueryParts`] aggregate or the fluent
//! [`Select`] builder, and run it as a list, an optional or single result,
//! a count, or a page with a total count. [`Repository`] wraps the common
//! shapes for one entity type.
//!
//! # Example
//!
//! ```
//! use critq_core::memory::{Catalog, EntityDef, MemorySession};
//! use critq_core::{read_i64, read_string, Entity, Repository, SessionError};
//! use critq_core::model::{Attribute, OrderAttr, Record};
//!
//! struct Vendor {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Vendor {
//!     const ID: Attribute<Vendor, i64> = Attribute::new("id");
//!     const VENDOR_NAME: Attribute<Vendor, String> = Attribute::new("name");
//! }
//!
//! impl Entity for Vendor {
//!     const NAME: &'static str = "Vendor";
//!
//!     fn from_record(record: Record) -> Result<Self, SessionError> {
//!         Ok(Vendor {
//!             id: read_i64(&record, Self::NAME, "id")?,
//!             name: read_string(&record, Self::NAME, "name")?,
//!         })
//!     }
//!
//!     fn to_record(&self) -> Record {
//!         Record::new().with_field("id", self.id).with_field("name", self.name.as_str())
//!     }
//! }
//!
//! let catalog = Catalog::new().with_entity(EntityDef::new("Vendor", "id"));
//! let session = MemorySession::new(catalog).unwrap();
//! let vendors = Repository::new(&session, Vendor::ID);
//! for (id, name) in [(1, "Seat"), (2, "Fiat"), (3, "Tesla")] {
//!     vendors.persist(&Vendor { id, name: name.to_string() }).unwrap();
//! }
//!
//! let page = vendors
//!     .select()
//!     .where_(|_, root| root.get(Vendor::VENDOR_NAME).like("%a%"))
//!     .order_by([OrderAttr::asc(Vendor::VENDOR_NAME)])
//!     .page(1, 2)
//!     .unwrap();
//! assert_eq!(page.total_count, 3);
//! assert_eq!(page.results[0].name, "Fiat");
//! ```

pub mod config;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod executor;
pub mod fragment;
pub mod memory;
pub mod paginator;
pub mod repository;
pub mod select;
pub mod session;

pub use config::{ConfigError, QueryConfig, DEFAULT_MAX_FETCH_DEPTH};
pub use descriptor::{QueryDescriptor, QueryParts, WhereKind, WhereStyle};
pub use entity::{read_i64, read_opt_i64, read_string, Entity, Lazy, VersionAware};
pub use error::{Error, Result, SessionError, UsageError};
pub use executor::QueryExecutor;
pub use fragment::{
    OrderFn, PredicateAndOrder, PredicateAndOrderFn, PredicateFn, QueryShapeFn,
};
pub use paginator::PageRequest;
pub use repository::{
    Access, Crud, CrudAccess, CrudRepository, PersistAccess, ReadOnly, ReadOnlyRepository,
    ReadPersist, ReadPersistRepository, Repository,
};
pub use select::Select;
pub use session::{Session, TypedQuery};

pub use critq_model::{QueryContext, ResultPage, Root};

/// Re-export the query model.
pub use critq_model as model;
