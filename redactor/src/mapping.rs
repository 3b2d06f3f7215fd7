//! The placeholder registry for one document.
//!
//! A [`PlaceholderMap`] is created by a redactor, owned by the caller for the
//! length of one redact → external call → restore round, and consumed by
//! restoration. It holds original values, so it is not `Serialize`; the
//! log-safe form is [`PlaceholderMap::records`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{entity::Entity, error::RedactionError};

/// One issued placeholder and an owned snapshot of the entity behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingEntry {
    pub placeholder: String,
    pub entity: Entity,
    /// True only if the original content can be written back as text.
    pub restorable: bool,
    pub redacted_at: DateTime<Utc>,
}

impl MappingEntry {
    pub fn new(entity: Entity, restorable: bool) -> Self {
        Self {
            placeholder: entity.placeholder.clone(),
            entity,
            restorable,
            redacted_at: Utc::now(),
        }
    }
}

/// The log-safe view of a mapping entry. Carries no original value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub placeholder: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f64,
    pub restorable: bool,
    pub redacted_at: DateTime<Utc>,
}

impl From<&MappingEntry> for MappingRecord {
    fn from(entry: &MappingEntry) -> Self {
        Self {
            placeholder: entry.placeholder.clone(),
            entity_type: entry.entity.entity_type.clone(),
            confidence: entry.entity.confidence,
            restorable: entry.restorable,
            redacted_at: entry.redacted_at,
        }
    }
}

/// Placeholder → entity registry, in insertion order.
///
/// Lookups go from placeholder to value only.
#[derive(Clone, Debug, Default)]
pub struct PlaceholderMap {
    entries: Vec<MappingEntry>,
    index: HashMap<String, usize>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry. Placeholders are unique within one map.
    pub fn insert(&mut self, entry: MappingEntry) -> Result<(), RedactionError> {
        if self.index.contains_key(&entry.placeholder) {
            return Err(RedactionError::DuplicatePlaceholder {
                placeholder: entry.placeholder,
            });
        }
        self.index
            .insert(entry.placeholder.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, placeholder: &str) -> Option<&MappingEntry> {
        self.index.get(placeholder).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, placeholder: &str) -> bool {
        self.index.contains_key(placeholder)
    }

    /// The value to write back for `placeholder`, if it is restorable.
    pub fn original_value(&self, placeholder: &str) -> Option<&str> {
        self.get(placeholder)
            .filter(|entry| entry.restorable)
            .and_then(|entry| entry.entity.original_text.as_deref())
    }

    pub fn entries(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.placeholder.as_str())
    }

    /// Ordered, log-safe records: placeholder, type, confidence, restorable,
    /// and redaction time.
    pub fn records(&self) -> Vec<MappingRecord> {
        self.entries.iter().map(MappingRecord::from).collect()
    }
}
