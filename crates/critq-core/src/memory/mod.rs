//! In-memory persistence session.
//!
//! Useful for tests and embedding: relations are resolved from a
//! [`Catalog`] and queries are evaluated against ordered tables.

pub mod catalog;
pub mod evaluator;
pub mod session;

pub use catalog::{Cardinality, Catalog, EntityDef, FetchType, RelationDef};
pub use evaluator::{ConditionEvaluator, Tuple};
pub use session::MemorySession;
