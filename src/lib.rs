pub mod cache;
pub mod config;
pub mod directory;
pub mod identity;
pub mod resolver;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Operation carried by an asset-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetOperation {
    Create,
    Update,
    Delete,
    Inventory,
}

/// One asset node of the hierarchy, as published on the bus.
///
/// `aux` carries the structural attributes (`type`, `subtype` and the
/// flattened `parent_name.1..N` ancestor list); `ext` carries the
/// user-facing ones (`name`, `description`, `contact_email`, `ip.1..N`,
/// `ipv6.1..N`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub operation: AssetOperation,
    #[serde(default)]
    pub aux: HashMap<String, String>,
    #[serde(default)]
    pub ext: HashMap<String, String>,
}

impl AssetRecord {
    pub fn new(name: impl Into<String>, operation: AssetOperation) -> Self {
        Self {
            name: name.into(),
            operation,
            aux: HashMap::new(),
            ext: HashMap::new(),
        }
    }

    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux.insert(key.into(), value.into());
        self
    }

    pub fn with_ext(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ext.insert(key.into(), value.into());
        self
    }

    pub fn aux_str(&self, key: &str) -> Option<&str> {
        self.aux.get(key).map(String::as_str)
    }

    pub fn ext_str(&self, key: &str) -> Option<&str> {
        self.ext.get(key).map(String::as_str)
    }

    /// Ancestor internal name at `level`, read from the flattened
    /// `parent_name.<level>` aux attribute (level 1 = immediate parent).
    pub fn parent_at(&self, level: usize) -> Option<&str> {
        self.aux_str(&format!("parent_name.{level}"))
    }
}
