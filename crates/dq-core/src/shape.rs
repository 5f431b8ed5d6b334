//! # Record Shapes
//!
//! Describes the queried record type by its columns and the type each one
//! decodes into, so the translator never needs to know the storage type.

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::value::{Cell, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecodeTarget {
    Text,
    Integer,
    Float,
    Boolean,
    Bytes,
    /// Keep whatever the engine returned.
    #[default]
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub target: DecodeTarget,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, target: DecodeTarget) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordShape {
    columns: Vec<ColumnDef>,
}

impl RecordShape {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn column(mut self, name: impl Into<String>, target: DecodeTarget) -> Self {
        self.columns.push(ColumnDef::new(name, target));
        self
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Decode a full record; `cells` are positional, one per shape column.
    pub fn decode_record(&self, cells: Vec<Cell>) -> Result<Record, EngineError> {
        if cells.len() != self.columns.len() {
            return Err(EngineError::Backend(format!(
                "record has {} cells, shape has {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        let mut record = Record::with_capacity(cells.len());
        for (def, cell) in self.columns.iter().zip(cells) {
            record.insert(def.name.clone(), decode_as(&def.name, def.target, cell)?);
        }
        Ok(record)
    }
}

/// Decode one projected cell by its own type. Bytes are read as UTF-8 text.
pub fn decode_cell(column: &str, cell: Cell) -> Result<Value, EngineError> {
    Ok(match cell {
        Cell::Null => Value::Null,
        Cell::Bool(b) => Value::Bool(b),
        Cell::Int(n) => Value::Int(n),
        Cell::Float(f) => Value::Float(f),
        Cell::Text(s) => Value::Text(s),
        Cell::Bytes(b) => Value::Text(utf8(column, b)?),
    })
}

/// Decode one cell into the declared `target`.
pub fn decode_as(column: &str, target: DecodeTarget, cell: Cell) -> Result<Value, EngineError> {
    let mismatch = |found: &str| EngineError::Decode {
        column: column.to_string(),
        reason: format!("expected {target:?}, found {found}"),
    };

    let value = match (target, cell) {
        (_, Cell::Null) => Value::Null,
        (DecodeTarget::Json, cell) => decode_cell(column, cell)?,

        (DecodeTarget::Text, Cell::Text(s)) => Value::Text(s),
        (DecodeTarget::Text, Cell::Bytes(b)) => Value::Text(utf8(column, b)?),
        (DecodeTarget::Text, Cell::Int(n)) => Value::Text(n.to_string()),
        (DecodeTarget::Text, Cell::Float(f)) => Value::Text(f.to_string()),
        (DecodeTarget::Text, Cell::Bool(b)) => Value::Text(b.to_string()),

        (DecodeTarget::Integer, Cell::Int(n)) => Value::Int(n),
        (DecodeTarget::Integer, Cell::Text(s)) => {
            Value::Int(s.trim().parse().map_err(|_| mismatch("non-integer text"))?)
        }
        (DecodeTarget::Integer, Cell::Bool(b)) => Value::Int(i64::from(b)),
        (DecodeTarget::Integer, Cell::Float(_)) => return Err(mismatch("float")),
        (DecodeTarget::Integer, Cell::Bytes(_)) => return Err(mismatch("bytes")),

        (DecodeTarget::Float, Cell::Float(f)) => Value::Float(f),
        (DecodeTarget::Float, Cell::Int(n)) => Value::Float(n as f64),
        (DecodeTarget::Float, Cell::Text(s)) => {
            Value::Float(s.trim().parse().map_err(|_| mismatch("non-numeric text"))?)
        }
        (DecodeTarget::Float, Cell::Bool(_)) => return Err(mismatch("bool")),
        (DecodeTarget::Float, Cell::Bytes(_)) => return Err(mismatch("bytes")),

        (DecodeTarget::Boolean, Cell::Bool(b)) => Value::Bool(b),
        (DecodeTarget::Boolean, Cell::Int(n)) => Value::Bool(n != 0),
        (DecodeTarget::Boolean, Cell::Text(s)) => match s.as_str() {
            "true" | "t" | "1" => Value::Bool(true),
            "false" | "f" | "0" => Value::Bool(false),
            _ => return Err(mismatch("non-boolean text")),
        },
        (DecodeTarget::Boolean, Cell::Float(_)) => return Err(mismatch("float")),
        (DecodeTarget::Boolean, Cell::Bytes(_)) => return Err(mismatch("bytes")),

        (DecodeTarget::Bytes, Cell::Bytes(b)) => Value::Bytes(b),
        (DecodeTarget::Bytes, Cell::Text(s)) => Value::Bytes(s.into_bytes()),
        (DecodeTarget::Bytes, _) => return Err(mismatch("non-binary value")),
    };
    Ok(value)
}

fn utf8(column: &str, bytes: Vec<u8>) -> Result<String, EngineError> {
    String::from_utf8(bytes).map_err(|e| EngineError::Decode {
        column: column.to_string(),
        reason: e.to_string(),
    })
}
