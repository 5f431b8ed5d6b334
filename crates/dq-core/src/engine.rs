//! # Query Engine Interface
//!
//! The relational query engine is an external collaborator. This module
//! fixes the capabilities the translator needs from it and the typed
//! predicate form the operator catalog hands over. Implementations own
//! their connection pooling, transactions and join resolution.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::grammar::Direction;
use crate::shape::RecordShape;
use crate::value::Cell;

/// Failure reported by a query engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("backend: {0}")]
    Backend(String),

    #[error("cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
}

/// Ordering comparisons that take a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredicateKind {
    Compare { op: CompareOp, value: String },
    /// `pattern` already carries its `%` wildcards.
    Like { pattern: String, negated: bool },
    /// Inclusive on both ends, values in the order the client gave them.
    Between { low: String, high: String },
    In { values: Vec<String>, negated: bool },
    Null { negated: bool },
}

/// One conjunct of the WHERE clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub column: String,
    #[serde(flatten)]
    pub kind: PredicateKind,
}

/// Pagination window applied to the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

/// Result of a projected read: column names in projection order and one
/// cell per column for every row.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Entry point into a query engine.
pub trait QueryEngine: Send + Sync {
    /// Open a fresh, unfiltered scope over the records described by `shape`.
    fn scope(&self, shape: &RecordShape) -> Result<Box<dyn QueryScope>, EngineError>;
}

/// A query under construction. Every builder call may reject its input,
/// e.g. when a column does not exist.
///
/// Dropping the future of an async method must abandon the underlying
/// read; request cancellation relies on it.
#[async_trait]
pub trait QueryScope: Send {
    /// AND `predicate` onto the filters applied so far.
    fn filter(&mut self, predicate: &Predicate) -> Result<(), EngineError>;

    /// Append an ORDER BY key after the ones already applied.
    fn order(&mut self, column: &str, direction: Direction) -> Result<(), EngineError>;

    /// Restrict the read to exactly these qualified columns.
    fn project(&mut self, columns: &[String]) -> Result<(), EngineError>;

    /// Number of rows matching the filters, ignoring any window.
    async fn count(&mut self) -> Result<u64, EngineError>;

    /// Read the projected columns as a generic row cursor.
    async fn rows(&mut self, window: Window) -> Result<RowSet, EngineError>;

    /// Read whole records, one cell per shape column in shape order.
    async fn records(&mut self, window: Window) -> Result<Vec<Vec<Cell>>, EngineError>;
}
