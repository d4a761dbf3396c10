//! Keyed store of the latest known asset record per internal name
//!
//! The cache is exclusively owned by the resolver, so there is no interior
//! mutability and no locking. An update fully replaces the previous record
//! for the same name; there is no field-level merge.

use std::collections::HashMap;

use crate::AssetRecord;

#[derive(Debug, Default)]
pub struct AssetCache {
    records: HashMap<String, AssetRecord>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Insert or fully replace the record stored under `name`.
    pub fn update(&mut self, name: impl Into<String>, record: AssetRecord) {
        self.records.insert(name.into(), record);
    }

    pub fn lookup(&self, name: &str) -> Option<&AssetRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn delete(&mut self, name: &str) -> Option<AssetRecord> {
        self.records.remove(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep only the entries whose name satisfies the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.records.retain(|name, _| keep(name));
    }
}
