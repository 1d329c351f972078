//! JSON persistence for the three engine stores.
//!
//! One file per concern under the data directory: `rules.json`,
//! `merchants.json`, `corpus.json`. Loads fall back to seeds (rules,
//! merchants) or empty (corpus) when a file is missing or unreadable, so
//! the engine stays available in a degraded read-only mode.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use tally_core::types::TrainingExample;

use crate::merchants::MerchantMap;
use crate::rules::RuleStore;

/// File-backed storage for rules, merchants, and the training corpus
#[derive(Debug, Clone)]
pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rules_path(&self) -> PathBuf {
        self.dir.join("rules.json")
    }

    fn merchants_path(&self) -> PathBuf {
        self.dir.join("merchants.json")
    }

    fn corpus_path(&self) -> PathBuf {
        self.dir.join("corpus.json")
    }

    /// Load the rule store, seeding defaults when nothing (valid) is on
    /// disk.
    pub fn load_rules(&self, now: DateTime<Utc>) -> RuleStore {
        self.load_or(&self.rules_path(), || RuleStore::with_defaults(now))
    }

    pub fn save_rules(&self, rules: &RuleStore) -> Result<()> {
        self.write_json(&self.rules_path(), rules)
    }

    pub fn load_merchants(&self) -> MerchantMap {
        self.load_or(&self.merchants_path(), MerchantMap::with_defaults)
    }

    pub fn save_merchants(&self, merchants: &MerchantMap) -> Result<()> {
        self.write_json(&self.merchants_path(), merchants)
    }

    pub fn load_corpus(&self) -> Vec<TrainingExample> {
        self.load_or(&self.corpus_path(), Vec::new)
    }

    pub fn save_corpus(&self, corpus: &[TrainingExample]) -> Result<()> {
        self.write_json(&self.corpus_path(), &corpus)
    }

    fn load_or<T: DeserializeOwned>(&self, path: &Path, default: impl FnOnce() -> T) -> T {
        if !path.exists() {
            return default();
        }
        match self.read_json(path) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "store unreadable, using defaults");
                default()
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("create {}", self.dir.display()))?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
