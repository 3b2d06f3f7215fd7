//! `slog` values for redaction artifacts.
//!
//! Everything here is built from the log-safe views only: mapping records and
//! restoration counters. Original values never reach a serializer through
//! this module.
//!
//! Serialization failures are represented as placeholder strings rather than
//! propagated, so logging stays infallible.

use serde::Serialize;
use serde_json::Value as JsonValue;
use slog::{o, Discard, Key, Logger, Record, Result as SlogResult, Serializer, Value as SlogValue};

use crate::{mapping::PlaceholderMap, restore::RestorationStats};

/// A logger that drops every record. Used when the caller supplies none.
pub(crate) fn discard() -> Logger {
    Logger::root(Discard, o!())
}

fn to_json<T: Serialize>(value: &T) -> JsonValue {
    serde_json::to_value(value)
        .unwrap_or_else(|_| JsonValue::String("Failed to serialize value".to_string()))
}

fn emit_json(
    value: &JsonValue,
    record: &Record<'_>,
    key: Key,
    serializer: &mut dyn Serializer,
) -> SlogResult {
    let nested = slog::Serde(value.clone());
    SlogValue::serialize(&nested, record, key, serializer)
}

/// Emits a placeholder map as a JSON list of mapping records.
///
/// ```ignore
/// info!(logger, "redacted"; "mapping" => SafeMapping::new(&redaction.mapping));
/// ```
pub struct SafeMapping {
    records: JsonValue,
}

impl SafeMapping {
    pub fn new(mapping: &PlaceholderMap) -> Self {
        Self {
            records: to_json(&mapping.records()),
        }
    }
}

impl SlogValue for SafeMapping {
    fn serialize(
        &self,
        record: &Record<'_>,
        key: Key,
        serializer: &mut dyn Serializer,
    ) -> SlogResult {
        emit_json(&self.records, record, key, serializer)
    }
}

/// Emits restoration statistics as a JSON object.
pub struct RestorationSummary {
    stats: JsonValue,
}

impl RestorationSummary {
    pub fn new(stats: &RestorationStats) -> Self {
        Self {
            stats: to_json(stats),
        }
    }
}

impl SlogValue for RestorationSummary {
    fn serialize(
        &self,
        record: &Record<'_>,
        key: Key,
        serializer: &mut dyn Serializer,
    ) -> SlogResult {
        emit_json(&self.stats, record, key, serializer)
    }
}
