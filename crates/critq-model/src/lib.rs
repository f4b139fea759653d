//! critq model types.
//!
//! This crate defines the values and the criteria-query IR that the query
//! layer in `critq-core` builds and a persistence session executes.
//!
//! # Modules
//!
//! - [`value`] - Runtime values for conditions, keys and record fields
//! - [`metamodel`] - Typed attribute/relation references and paths
//! - [`condition`] - Boolean condition AST and LIKE matching
//! - [`order`] - Sort keys
//! - [`fetch`] - Fetch graphs and fetch plans
//! - [`query`] - Criteria query IR and the shaping context
//! - [`record`] - Dynamic entity rows
//! - [`page`] - Paginated results
//!
//! # Example
//!
//! ```
//! use critq_model::{Attribute, CriteriaQuery, QueryContext, Root};
//!
//! struct Car;
//! const COLOR: Attribute<Car, String> = Attribute::new("color");
//!
//! let mut query = CriteriaQuery::new("Car");
//! let root = Root::<Car>::new();
//! let mut ctx = QueryContext::new(&mut query);
//! ctx.apply_predicate(root.get(COLOR).eq("green"));
//! ctx.apply_ordering(vec![root.get(COLOR).asc()]);
//! assert!(ctx.has_ordering());
//! ```

pub mod condition;
pub mod fetch;
pub mod metamodel;
pub mod order;
pub mod page;
pub mod query;
pub mod record;
pub mod value;

// Re-export commonly used types at crate root
pub use condition::{like_match, CompareOp, Condition};
pub use fetch::{FetchGraph, FetchMode, FetchPlan, FetchSpec};
pub use metamodel::{Attribute, Join, JoinId, JoinSource, Path, PathExpr, RelationAttr, Root, Source};
pub use order::{Order, OrderAttr, OrderDirection};
pub use page::ResultPage;
pub use query::{CriteriaQuery, JoinClause, JoinKind, QueryContext, Selection};
pub use record::Record;
pub use value::{KeyValue, Value};
