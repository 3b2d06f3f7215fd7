//! Shared data types: entities, their locations, and detection run metadata.
//!
//! An [`Entity`] is the canonical, placeholder-labeled form of one detected
//! sensitive item. Detection backends never build entities directly; they emit
//! raw candidates that the aggregator validates and labels.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Sensitive;

/// Content domain of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    /// Reserved. No redactor consumes audio entities yet.
    Audio,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Audio => "audio",
        })
    }
}

/// Half-open character range `[start, end)` in Unicode scalar values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true when the two ranges share at least one character.
    pub fn overlaps(&self, other: &TextSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Pixel rectangle `(x1, y1)` inclusive to `(x2, y2)` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Grows the box by `by` pixels on every side, saturating at zero.
    #[must_use]
    pub fn expand(&self, by: u32) -> Self {
        Self {
            x1: self.x1.saturating_sub(by),
            y1: self.y1.saturating_sub(by),
            x2: self.x2.saturating_add(by),
            y2: self.y2.saturating_add(by),
        }
    }

    /// Clips the box to an image of the given dimensions.
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.min(width),
            y1: self.y1.min(height),
            x2: self.x2.min(width),
            y2: self.y2.min(height),
        }
    }
}

/// Audio time range in seconds. Reserved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// Where an entity sits in its document. Exactly one form per modality.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Span(TextSpan),
    Region(BoundingBox),
    Interval(TimeRange),
}

impl Location {
    /// The modality this location form belongs to.
    pub fn modality(&self) -> Modality {
        match self {
            Location::Span(_) => Modality::Text,
            Location::Region(_) => Modality::Image,
            Location::Interval(_) => Modality::Audio,
        }
    }
}

/// A detected sensitive item.
///
/// `original_text` holds the original content when it is itself a string (the
/// span text for text entities, the recognized string for OCR regions). It is
/// printed as `[REDACTED]` by `Debug`.
#[derive(Clone, PartialEq, Serialize, Deserialize, Sensitive)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub placeholder: String,
    pub confidence: f64,
    pub modality: Modality,
    pub location: Option<Location>,
    #[sensitive]
    pub original_text: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
}

impl Entity {
    /// Builds a text entity covering `span`.
    pub fn text(
        entity_type: impl Into<String>,
        placeholder: impl Into<String>,
        span: TextSpan,
        confidence: f64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            placeholder: placeholder.into(),
            confidence,
            modality: Modality::Text,
            location: Some(Location::Span(span)),
            original_text: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Builds an image entity covering `bbox`.
    pub fn image(
        entity_type: impl Into<String>,
        placeholder: impl Into<String>,
        bbox: BoundingBox,
        confidence: f64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            placeholder: placeholder.into(),
            confidence,
            modality: Modality::Image,
            location: Some(Location::Region(bbox)),
            original_text: None,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_original_text(mut self, text: impl Into<String>) -> Self {
        self.original_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn span(&self) -> Option<TextSpan> {
        match self.location {
            Some(Location::Span(span)) => Some(span),
            _ => None,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        match self.location {
            Some(Location::Region(bbox)) => Some(bbox),
            _ => None,
        }
    }
}

/// A detection source that contributed nothing to a run, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

/// Summary of one detection run. Informational only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetadata {
    pub total_entities: usize,
    pub entities_by_type: BTreeMap<String, usize>,
    pub detection_time: Duration,
    /// True if any contributing source ran with hardware acceleration.
    pub accelerated: bool,
    /// Model identifier per source name.
    pub model_info: BTreeMap<String, String>,
    pub contributing_sources: Vec<String>,
    pub failed_sources: Vec<SourceFailure>,
    /// Candidates dropped at validation or by the confidence/type filters.
    pub rejected_candidates: usize,
    /// Text candidates dropped because they overlapped an accepted span.
    pub dropped_overlaps: usize,
}
