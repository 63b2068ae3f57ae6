//! Skip/processed registry: transaction hashes that were already settled,
//! created, or deliberately ignored.
//!
//! Persisted as a small TOML document that users may edit by hand:
//!
//! ```toml
//! [[ignored_hashes]]
//! hash = "0xabc..."
//! reason = "Marked as ignored on 2025-12-01"
//! ```

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot parse registry: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize registry: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub hash: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    ignored_hashes: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipRegistry {
    entries: Vec<RegistryEntry>,
}

impl SkipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(text: &str) -> Result<Self, RegistryError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let file: RegistryFile = toml::from_str(text)?;
        let mut registry = Self::new();
        for entry in file.ignored_hashes {
            registry.insert(entry.hash, entry.reason);
        }
        Ok(registry)
    }

    pub fn to_toml(&self) -> Result<String, RegistryError> {
        let file = RegistryFile { ignored_hashes: self.entries.clone() };
        Ok(toml::to_string(&file)?)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.iter().any(|e| e.hash.eq_ignore_ascii_case(hash))
    }

    pub fn get(&self, hash: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.hash.eq_ignore_ascii_case(hash))
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record that `hash` settled or created ledger entry `entry_id`.
    /// Returns false if the hash was already present.
    pub fn add_processed(&mut self, hash: &str, entry_id: &str) -> bool {
        self.add_processed_on(hash, entry_id, Local::now().date_naive())
    }

    pub fn add_processed_on(&mut self, hash: &str, entry_id: &str, on: NaiveDate) -> bool {
        self.insert(
            hash.to_string(),
            format!("Processed for ledger entry {entry_id} on {}", on.format("%Y-%m-%d")),
        )
    }

    /// Record that the user chose to never import `hash`.
    /// Returns false if the hash was already present.
    pub fn add_ignored(&mut self, hash: &str) -> bool {
        self.add_ignored_on(hash, Local::now().date_naive())
    }

    pub fn add_ignored_on(&mut self, hash: &str, on: NaiveDate) -> bool {
        self.insert(hash.to_string(), format!("Marked as ignored on {}", on.format("%Y-%m-%d")))
    }

    fn insert(&mut self, hash: String, reason: String) -> bool {
        if self.contains(&hash) {
            return false;
        }
        self.entries.push(RegistryEntry { hash, reason });
        true
    }
}
