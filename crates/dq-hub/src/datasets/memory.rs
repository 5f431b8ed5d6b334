//! # In-Memory Query Engine
//!
//! Serves a dataset of JSON rows through the [`QueryEngine`] interface.
//! A qualified column such as `user.email` reads the nested field `email`
//! of the row's `user` object, which stands in for a resolved join.

use async_trait::async_trait;
use dq_core::engine::{CompareOp, EngineError, Predicate, PredicateKind, QueryScope, RowSet, Window};
use dq_core::{Cell, Direction, QueryEngine, RecordShape};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Immutable rows plus every qualified column that occurs in them.
#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: Vec<Value>,
    columns: BTreeSet<String>,
}

impl MemoryTable {
    pub fn new(rows: Vec<Value>) -> Self {
        let mut columns = BTreeSet::new();
        for row in &rows {
            collect_columns(row, "", &mut columns);
        }
        Self { rows, columns }
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Top-level keys of the first row, in the order they appear.
    pub fn top_level_columns(&self) -> Vec<String> {
        match self.rows.first() {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

fn collect_columns(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    if let Value::Object(map) = value {
        for (key, child) in map {
            let column = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            collect_columns(child, &column, out);
            out.insert(column);
        }
    }
}

pub struct MemoryEngine {
    table: Arc<MemoryTable>,
}

impl MemoryEngine {
    pub fn new(table: Arc<MemoryTable>) -> Self {
        Self { table }
    }
}

impl QueryEngine for MemoryEngine {
    fn scope(&self, shape: &RecordShape) -> Result<Box<dyn QueryScope>, EngineError> {
        let record_columns: Vec<String> = shape.names().map(str::to_string).collect();
        Ok(Box::new(MemoryScope {
            table: self.table.clone(),
            record_columns,
            filters: Vec::new(),
            order: Vec::new(),
            projection: Vec::new(),
        }))
    }
}

struct MemoryScope {
    table: Arc<MemoryTable>,
    record_columns: Vec<String>,
    filters: Vec<Predicate>,
    order: Vec<(String, Direction)>,
    projection: Vec<String>,
}

impl MemoryScope {
    fn known(&self, column: &str) -> Result<(), EngineError> {
        if self.table.has_column(column) {
            Ok(())
        } else {
            Err(EngineError::UnknownColumn(column.to_string()))
        }
    }

    fn matching(&self) -> Vec<&Value> {
        self.table
            .rows()
            .iter()
            .filter(|row| self.filters.iter().all(|p| evaluate(row, p)))
            .collect()
    }

    /// Filtered, ordered and windowed rows.
    fn page(&self, window: Window) -> Vec<&Value> {
        let mut rows = self.matching();
        // Stable sort: earlier keys win, later keys only break ties.
        rows.sort_by(|a, b| {
            self.order
                .iter()
                .map(|(column, direction)| {
                    let ord = compare_values(field(a, column), field(b, column));
                    match direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

#[async_trait]
impl QueryScope for MemoryScope {
    fn filter(&mut self, predicate: &Predicate) -> Result<(), EngineError> {
        self.known(&predicate.column)?;
        self.filters.push(predicate.clone());
        Ok(())
    }

    fn order(&mut self, column: &str, direction: Direction) -> Result<(), EngineError> {
        self.known(column)?;
        self.order.push((column.to_string(), direction));
        Ok(())
    }

    fn project(&mut self, columns: &[String]) -> Result<(), EngineError> {
        for column in columns {
            self.known(column)?;
        }
        self.projection = columns.to_vec();
        Ok(())
    }

    async fn count(&mut self) -> Result<u64, EngineError> {
        Ok(self.matching().len() as u64)
    }

    async fn rows(&mut self, window: Window) -> Result<RowSet, EngineError> {
        if self.projection.is_empty() {
            return Err(EngineError::Unsupported("row cursor without a projection".into()));
        }
        let rows = self
            .page(window)
            .into_iter()
            .map(|row| {
                self.projection
                    .iter()
                    .map(|c| to_cell(field(row, c)))
                    .collect()
            })
            .collect();
        Ok(RowSet {
            columns: self.projection.clone(),
            rows,
        })
    }

    async fn records(&mut self, window: Window) -> Result<Vec<Vec<Cell>>, EngineError> {
        Ok(self
            .page(window)
            .into_iter()
            .map(|row| {
                self.record_columns
                    .iter()
                    .map(|c| to_cell(field(row, c)))
                    .collect()
            })
            .collect())
    }
}

// =============================================================================
// Evaluation
// =============================================================================

fn field<'a>(row: &'a Value, column: &str) -> Option<&'a Value> {
    lookup(row, column).filter(|v| !v.is_null())
}

/// Nested lookup: `user.email` reads `email` of the `user` object. Keys are
/// matched verbatim, so a key that itself contains a dot is found before any
/// deeper split of the column.
fn lookup<'a>(value: &'a Value, column: &str) -> Option<&'a Value> {
    let map = value.as_object()?;
    if let Some(v) = map.get(column) {
        return Some(v);
    }
    let splits: Vec<usize> = column.match_indices('.').map(|(i, _)| i).collect();
    splits.iter().rev().find_map(|&i| {
        map.get(&column[..i])
            .and_then(|child| lookup(child, &column[i + 1..]))
    })
}

fn evaluate(row: &Value, predicate: &Predicate) -> bool {
    let value = field(row, &predicate.column);

    match (&predicate.kind, value) {
        (PredicateKind::Null { negated }, v) => v.is_some() == *negated,
        // Everything else is false against NULL, negated forms included.
        (_, None) => false,
        (PredicateKind::Compare { op, value: operand }, Some(v)) => {
            let ord = compare_operand(v, operand);
            match op {
                CompareOp::Eq => ord == Ordering::Equal,
                CompareOp::Neq => ord != Ordering::Equal,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Gte => ord != Ordering::Less,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Lte => ord != Ordering::Greater,
            }
        }
        (PredicateKind::Like { pattern, negated }, Some(v)) => {
            like(&value_to_string(v), pattern) != *negated
        }
        (PredicateKind::Between { low, high }, Some(v)) => {
            compare_operand(v, low) != Ordering::Less
                && compare_operand(v, high) != Ordering::Greater
        }
        (PredicateKind::In { values, negated }, Some(v)) => {
            values
                .iter()
                .any(|candidate| compare_operand(v, candidate) == Ordering::Equal)
                != *negated
        }
    }
}

/// Compare a row value with a raw client operand: numerically when both
/// sides are finite numbers, textually otherwise.
fn compare_operand(value: &Value, operand: &str) -> Ordering {
    match (value_to_f64(value), finite(operand.trim())) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => value_to_string(value).as_str().cmp(operand),
    }
}

/// Ordering for ORDER BY. NULLs sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (value_to_f64(a), value_to_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => value_to_string(a).cmp(&value_to_string(b)),
        },
    }
}

/// `NaN` and `inf` parse as floats but have no total order; they compare as text.
fn finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => finite(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_cell(value: Option<&Value>) -> Cell {
    match value {
        None | Some(Value::Null) => Cell::Null,
        Some(Value::Bool(b)) => Cell::Bool(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => Cell::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(Value::String(s)) => Cell::Text(s.clone()),
        Some(other) => Cell::Text(other.to_string()),
    }
}

/// SQL LIKE: `%` matches any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
