//! Raw detection candidates and their validation.
//!
//! Backends emit loosely typed [`RawCandidate`]s. They are checked and
//! converted into a located [`Candidate`] at the aggregation boundary, so
//! nothing downstream has to deal with a malformed payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    entity::{BoundingBox, Location, Modality, TextSpan},
    error::RedactionError,
    placeholder::is_valid_label,
    Sensitive,
};

/// A candidate exactly as a detection backend reports it.
#[derive(Clone, PartialEq, Serialize, Deserialize, Sensitive)]
pub struct RawCandidate {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f64,
    pub modality: Modality,
    /// Character offsets `(start, end)` for text.
    #[serde(default)]
    pub span: Option<(usize, usize)>,
    /// Pixel box `(x1, y1, x2, y2)` for images. May be slightly outside the
    /// image; negative coordinates are clamped to zero.
    #[serde(default)]
    pub bbox: Option<(i64, i64, i64, i64)>,
    /// Reserved for audio.
    #[serde(default)]
    pub timestamp: Option<(f64, f64)>,
    /// Recognized text, when the original content is a string.
    #[serde(default)]
    #[sensitive]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
}

impl RawCandidate {
    pub fn text_span(entity_type: impl Into<String>, start: usize, end: usize, confidence: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            confidence,
            modality: Modality::Text,
            span: Some((start, end)),
            bbox: None,
            timestamp: None,
            text: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn image_region(
        entity_type: impl Into<String>,
        bbox: (i64, i64, i64, i64),
        confidence: f64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            confidence,
            modality: Modality::Image,
            span: None,
            bbox: Some(bbox),
            timestamp: None,
            text: None,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A validated candidate: normalized type tag and exactly one location that
/// matches its modality.
#[derive(Clone, PartialEq, Sensitive)]
pub struct Candidate {
    pub entity_type: String,
    pub confidence: f64,
    pub location: Location,
    #[sensitive]
    pub text: Option<String>,
    pub metadata: BTreeMap<String, JsonValue>,
    pub source: String,
}

impl Candidate {
    pub fn modality(&self) -> Modality {
        self.location.modality()
    }

    pub fn span(&self) -> Option<TextSpan> {
        match self.location {
            Location::Span(span) => Some(span),
            _ => None,
        }
    }
}

fn invalid(reason: impl Into<String>) -> RedactionError {
    RedactionError::InvalidCandidate(reason.into())
}

fn clamp_coordinate(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Checks a raw candidate from `source` and converts it.
pub fn validate(raw: RawCandidate, source: &str) -> Result<Candidate, RedactionError> {
    let entity_type = raw.entity_type.trim().to_ascii_uppercase();
    if !is_valid_label(&entity_type) {
        return Err(invalid(format!(
            "type tag `{}` is not a valid label",
            raw.entity_type
        )));
    }
    if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
        return Err(invalid(format!(
            "confidence {} is outside [0, 1]",
            raw.confidence
        )));
    }

    let forms = [raw.span.is_some(), raw.bbox.is_some(), raw.timestamp.is_some()]
        .into_iter()
        .filter(|present| *present)
        .count();
    if forms != 1 {
        return Err(invalid(format!(
            "expected exactly one location form, found {forms}"
        )));
    }

    let location = match (raw.modality, raw.span, raw.bbox) {
        (Modality::Text, Some((start, end)), _) => {
            if start >= end {
                return Err(invalid(format!("span {start}..{end} is empty or inverted")));
            }
            Location::Span(TextSpan::new(start, end))
        }
        (Modality::Image, _, Some((x1, y1, x2, y2))) => {
            let bbox = BoundingBox::new(
                clamp_coordinate(x1),
                clamp_coordinate(y1),
                clamp_coordinate(x2),
                clamp_coordinate(y2),
            );
            if bbox.is_empty() {
                return Err(invalid(format!(
                    "box ({x1}, {y1}, {x2}, {y2}) is empty or inverted"
                )));
            }
            Location::Region(bbox)
        }
        (Modality::Audio, ..) => return Err(invalid("audio modality is reserved")),
        (modality, ..) => {
            return Err(invalid(format!(
                "location form does not match {modality} modality"
            )));
        }
    };

    let mut metadata = raw.metadata;
    metadata.insert("source".to_owned(), JsonValue::from(source));

    Ok(Candidate {
        entity_type,
        confidence: raw.confidence,
        location,
        text: raw.text,
        metadata,
        source: source.to_owned(),
    })
}
