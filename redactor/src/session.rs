//! One document's trip through the engine, as a chain of owned stages.
//!
//! [`Detection`] → [`Redacted`] → [`Restored`]. Each transition consumes the
//! previous stage, so a mapping cannot outlive its round and cannot be
//! applied to a second output. Only the sanitized document and the safe
//! mapping records are reachable from a [`Redacted`]; the original document
//! is dropped at redaction.

use std::fmt;

use image::RgbImage;

use crate::{
    detection::Aggregation,
    entity::{DetectionMetadata, Entity, Modality},
    error::RedactionError,
    mapping::{MappingRecord, PlaceholderMap},
    redact::{Redaction, Redactor},
    restore::{RestorationStats, Restorer},
};

/// A document kind that can travel through a session.
pub trait SessionDocument {
    fn modality(&self) -> Modality;
}

impl SessionDocument for String {
    fn modality(&self) -> Modality {
        Modality::Text
    }
}

impl SessionDocument for RgbImage {
    fn modality(&self) -> Modality {
        Modality::Image
    }
}

/// A document with its canonical entities, not yet redacted.
///
/// Still holds the original document, so its `Debug` output shows only the
/// modality and how many entities were found.
#[derive(Clone)]
pub struct Detection<D> {
    document: D,
    entities: Vec<Entity>,
    metadata: DetectionMetadata,
}

impl<D: SessionDocument> fmt::Debug for Detection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detection")
            .field("modality", &self.document.modality())
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

impl<D> Detection<D> {
    pub fn new(document: D, aggregation: Aggregation) -> Self {
        Self {
            document,
            entities: aggregation.entities,
            metadata: aggregation.metadata,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn metadata(&self) -> &DetectionMetadata {
        &self.metadata
    }

    /// Redacts the document with `redactor`, dropping the original.
    pub fn redact<R>(self, redactor: &R) -> Redacted<D>
    where
        R: Redactor<Document = D>,
    {
        let redaction = redactor.redact(&self.document, &self.entities);
        Redacted {
            redaction,
            metadata: self.metadata,
        }
    }
}

/// A sanitized document and the mapping needed to restore output about it.
#[derive(Debug)]
pub struct Redacted<D> {
    redaction: Redaction<D>,
    metadata: DetectionMetadata,
}

impl<D> Redacted<D> {
    /// The document that may leave the trust boundary.
    pub fn document(&self) -> &D {
        &self.redaction.document
    }

    pub fn into_document(self) -> D {
        self.redaction.document
    }

    pub fn metadata(&self) -> &DetectionMetadata {
        &self.metadata
    }

    /// Log-safe view of the mapping.
    pub fn records(&self) -> Vec<MappingRecord> {
        self.redaction.mapping.records()
    }

    pub(crate) fn mapping(&self) -> &PlaceholderMap {
        &self.redaction.mapping
    }

    pub fn skipped(&self) -> &[RedactionError] {
        &self.redaction.skipped
    }

    pub fn unlabeled(&self) -> &[String] {
        &self.redaction.unlabeled
    }

    /// Restores `output`, consuming the mapping.
    pub fn restore(self, output: &str, restorer: &Restorer) -> Restored {
        let restoration = restorer.restore(output, &self.redaction.mapping);
        Restored {
            text: restoration.text,
            stats: restoration.stats,
            metadata: self.metadata,
        }
    }
}

/// The final output of one round.
#[derive(Clone, Debug, PartialEq)]
pub struct Restored {
    pub text: String,
    pub stats: RestorationStats,
    pub metadata: DetectionMetadata,
}
