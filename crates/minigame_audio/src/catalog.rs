//! Asset catalog
//!
//! Maps stable sound ids to the clip each one plays. Catalogs are supplied by
//! the game; the coordinator never invents entries.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Unique identifier for a sound
pub type SoundId = String;

fn default_volume() -> f32 {
    1.0
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable identifier used by gameplay code
    pub id: SoundId,
    /// Where the backend loads the clip from
    pub uri: String,
    /// Loop until stopped (background music)
    #[serde(default, rename = "loop")]
    pub looping: bool,
    /// Playback volume, 0.0 to 1.0
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Use the streaming backend; `None` picks the platform default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    /// Minimum time between successive plays of this id
    #[serde(default)]
    pub cooldown_ms: u64,
}

impl CatalogEntry {
    /// Create a new entry with default settings
    pub fn new<I: Into<SoundId>, U: Into<String>>(id: I, uri: U) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            looping: false,
            volume: 1.0,
            streaming: None,
            cooldown_ms: 0,
        }
    }

    /// Mark the entry as looping
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Set entry volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Set the cooldown window
    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Force the streaming or buffered backend
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }

    /// Cooldown as a duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Ordered, id-unique collection of catalog entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CatalogFile", into = "CatalogFile")]
pub struct AssetCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<SoundId, usize>,
}

impl AssetCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from entries; a later duplicate id replaces the earlier one
    pub fn from_entries<I: IntoIterator<Item = CatalogEntry>>(entries: I) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    /// Add an entry (builder pattern)
    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.insert(entry);
        self
    }

    /// Insert an entry, replacing any entry with the same id
    pub fn insert(&mut self, mut entry: CatalogEntry) {
        entry.volume = entry.volume.clamp(0.0, 1.0);
        if let Some(&slot) = self.index.get(&entry.id) {
            log::warn!("Duplicate catalog id '{}', keeping {}", entry.id, entry.uri);
            self.entries[slot] = entry;
        } else {
            self.index.insert(entry.id.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Look up an entry by id
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.index.get(id).map(|&slot| &self.entries[slot])
    }

    /// Check whether an id is in the catalog
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CatalogEntry> for AssetCatalog {
    fn from_iter<T: IntoIterator<Item = CatalogEntry>>(iter: T) -> Self {
        Self::from_entries(iter)
    }
}

/// On-disk shape: `sounds = [ { id = "...", uri = "..." }, ... ]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sounds: Vec<CatalogEntry>,
}

impl From<CatalogFile> for AssetCatalog {
    fn from(file: CatalogFile) -> Self {
        Self::from_entries(file.sounds)
    }
}

impl From<AssetCatalog> for CatalogFile {
    fn from(catalog: AssetCatalog) -> Self {
        Self { sounds: catalog.entries }
    }
}

impl Config for AssetCatalog {}
