//! # Dataset Registry
//!
//! Name → [`Dataset`] lookup. Filled once at startup and read-only while
//! serving, so handlers share it without locks.

use super::{Dataset, DatasetConfig, DatasetInfo};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Default)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, Arc<Dataset>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured dataset. A dataset that fails to load is
    /// logged and skipped; the rest are still served.
    pub fn load(configs: &[DatasetConfig], base_dir: &Path, default_take: u64, max_take: u64) -> Self {
        let mut registry = Self::new();
        for config in configs {
            match Dataset::load(config, base_dir, default_take, max_take) {
                Ok(dataset) => {
                    tracing::info!("Loaded dataset '{}' ({} rows)", dataset.name(), dataset.info().rows);
                    registry.add(dataset);
                }
                Err(e) => tracing::error!("Failed to load dataset '{}': {:#}", config.name, e),
            }
        }
        registry
    }

    /// Register a dataset, replacing any previous one with the same name.
    pub fn add(&mut self, dataset: Dataset) {
        let name = dataset.name().to_string();
        if self.datasets.insert(name.clone(), Arc::new(dataset)).is_some() {
            tracing::warn!("Dataset '{}' declared twice; keeping the last one", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Dataset>> {
        self.datasets.get(name).cloned()
    }

    pub fn list(&self) -> Vec<DatasetInfo> {
        self.datasets.values().map(|d| d.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
