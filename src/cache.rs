//! In-process caching of archive firmware versions
//!
//! The cache is a nested mapping `build target -> OS version -> model ->
//! firmware version`. Entries are inserted on the first successful fetch and
//! never evicted; failed fetches leave the cache untouched so a later call
//! may retry.

use std::collections::BTreeMap;

use crate::error::Result;

/// Firmware versions for every model of one `(build target, OS version)`.
pub type ModelFirmware = BTreeMap<String, String>;

/// Cache key combining build target and OS version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub build_target: String,
    pub os_version: String,
}

impl CacheKey {
    pub fn new(build_target: &str, os_version: &str) -> Self {
        Self {
            build_target: build_target.to_string(),
            os_version: os_version.to_string(),
        }
    }
}

/// Single-owner firmware-version cache
#[derive(Debug, Clone, Default)]
pub struct FirmwareCache {
    entries: BTreeMap<String, BTreeMap<String, ModelFirmware>>,
}

impl FirmwareCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached record, or fetch and cache it if not present
    pub fn get_or_fetch<F>(&mut self, key: &CacheKey, fetch: F) -> Result<ModelFirmware>
    where
        F: FnOnce() -> Result<ModelFirmware>,
    {
        if let Some(cached) = self.get(key) {
            return Ok(cached.clone());
        }

        // Not in cache, fetch it. Errors propagate before anything is stored.
        let result = fetch()?;
        self.insert(key, result.clone());
        Ok(result)
    }

    /// Manually insert a record into the cache
    pub fn insert(&mut self, key: &CacheKey, value: ModelFirmware) {
        self.entries
            .entry(key.build_target.clone())
            .or_default()
            .insert(key.os_version.clone(), value);
    }

    /// Get a record from cache without fetching
    pub fn get(&self, key: &CacheKey) -> Option<&ModelFirmware> {
        self.entries
            .get(&key.build_target)
            .and_then(|versions| versions.get(&key.os_version))
    }

    /// Look up the firmware version of one model
    pub fn firmware(&self, key: &CacheKey, model: &str) -> Option<&str> {
        self.get(key)
            .and_then(|models| models.get(model))
            .map(String::as_str)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of cached `(build target, OS version)` records
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
