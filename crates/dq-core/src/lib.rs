//! # dq-core: The "Grammar" of DYNQ
//!
//! Ad-hoc filtering, sorting, projection and pagination over a relational
//! data set, driven by flat client tokens instead of SQL:
//!
//! ```text
//! ?filter=age:gte:18&filter=name:like:ann&sort=name.asc&select=user.email&page=0&take=20
//! ```
//!
//! Tokens are parsed into specs ([`grammar`]), field aliases are resolved
//! ([`alias`]), filters are mapped onto engine predicates through the
//! operator catalog ([`operator`]), and the [`translate`] step drives any
//! [`engine::QueryEngine`] through a counted, paginated read. The
//! [`handler::QueryHandler`] wires these together for one endpoint.

pub mod alias;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod handler;
pub mod operator;
pub mod pagination;
pub mod path;
pub mod request;
pub mod shape;
pub mod sql;
pub mod translate;
pub mod value;

pub use alias::AliasMap;
pub use engine::{EngineError, Predicate, PredicateKind, QueryEngine, QueryScope, RowSet, Window};
pub use error::QueryError;
pub use grammar::{Direction, FilterSpec, SelectSpec, SortSpec};
pub use handler::{PageResponse, QueryHandler};
pub use operator::{Arity, Operator};
pub use pagination::{Page, PageLimits, PageMeta};
pub use path::Path;
pub use request::{QueryParams, StructuredQuery};
pub use shape::{ColumnDef, DecodeTarget, RecordShape};
pub use translate::{QuerySpec, Translator};
pub use value::{Cell, Record, Value};
