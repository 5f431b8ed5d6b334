//! # Datasets
//!
//! A dataset is a named table of JSON rows plus everything needed to query
//! it: an alias map, a record shape and page limits. Datasets are declared
//! in the hub's config file and loaded once at startup.

pub mod memory;
pub mod registry;

use anyhow::Context;
use dq_core::{AliasMap, ColumnDef, DecodeTarget, QueryHandler, RecordShape};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memory::{MemoryEngine, MemoryTable};

/// One `[[datasets]]` entry of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// JSON file holding an array of row objects. Relative paths resolve
    /// against the config file's directory.
    pub data: PathBuf,
    pub default_take: Option<u64>,
    pub max_take: Option<u64>,
    #[serde(default)]
    pub aliases: AliasMap,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
}

/// Public description of a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<ColumnDef>,
    pub aliases: AliasMap,
    pub default_take: u64,
    pub max_take: u64,
}

pub struct Dataset {
    name: String,
    rows: usize,
    handler: QueryHandler,
}

impl Dataset {
    /// Build a dataset over already loaded rows. Without declared columns
    /// the shape is the first row's top-level keys, decoded as-is.
    pub fn from_rows(
        config: &DatasetConfig,
        rows: Vec<serde_json::Value>,
        default_take: u64,
        max_take: u64,
    ) -> Self {
        let table = Arc::new(MemoryTable::new(rows));
        let shape = if config.columns.is_empty() {
            table
                .top_level_columns()
                .into_iter()
                .fold(RecordShape::default(), |shape, name| {
                    shape.column(name, DecodeTarget::Json)
                })
        } else {
            RecordShape::new(config.columns.clone())
        };
        let row_count = table.rows().len();

        let handler = QueryHandler::builder(Arc::new(MemoryEngine::new(table)), shape)
            .aliases(config.aliases.clone())
            .default_take(config.default_take.unwrap_or(default_take))
            .max_take(config.max_take.unwrap_or(max_take))
            .build();

        Self {
            name: config.name.clone(),
            rows: row_count,
            handler,
        }
    }

    /// Read `config.data` (relative to `base_dir`) and build the dataset.
    pub fn load(
        config: &DatasetConfig,
        base_dir: &Path,
        default_take: u64,
        max_take: u64,
    ) -> anyhow::Result<Self> {
        let path = base_dir.join(&config.data);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading dataset '{}' from {:?}", config.name, path))?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("dataset '{}' must be a JSON array of objects", config.name))?;
        if let Some(pos) = rows.iter().position(|r| !r.is_object()) {
            anyhow::bail!("dataset '{}': row {} is not an object", config.name, pos);
        }
        Ok(Self::from_rows(config, rows, default_take, max_take))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &QueryHandler {
        &self.handler
    }

    pub fn info(&self) -> DatasetInfo {
        let limits = self.handler.limits();
        DatasetInfo {
            name: self.name.clone(),
            rows: self.rows,
            columns: self.handler.shape().columns().to_vec(),
            aliases: self.handler.aliases().clone(),
            default_take: limits.default_take(),
            max_take: limits.max_take(),
        }
    }
}
