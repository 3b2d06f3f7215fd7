//! Modality-specific redactors.
//!
//! - **`text`**: placeholder substitution over character spans
//! - **`image`**: blackout boxes with drawn placeholder labels
//! - **`canvas`**: the drawing capability the image redactor writes through
//!
//! Both redactors share one contract: they never mutate their input, they
//! skip malformed entities with a warning instead of failing, and every
//! entity they act on gets exactly one [`MappingEntry`]. A placeholder that
//! already occurs in the document, or inside a value being removed, is
//! rejected so restoration stays unambiguous.

mod canvas;
mod image;
mod text;

use std::collections::{BTreeSet, HashSet};

pub use self::canvas::Canvas;
pub use self::image::{CanvasReport, ImageRedactor};
pub use self::text::TextRedactor;

use crate::{
    entity::{Entity, Modality},
    error::RedactionError,
    mapping::PlaceholderMap,
};

/// The result of redacting one document.
#[derive(Clone, Debug)]
pub struct Redaction<D> {
    /// The sanitized document.
    pub document: D,
    pub mapping: PlaceholderMap,
    /// Entities that were not acted on, and why.
    pub skipped: Vec<RedactionError>,
    /// Image only: placeholders whose box was blacked out without a label.
    pub unlabeled: Vec<String>,
}

impl<D> Redaction<D> {
    pub(crate) fn unchanged(document: D) -> Self {
        Self {
            document,
            mapping: PlaceholderMap::new(),
            skipped: Vec::new(),
            unlabeled: Vec::new(),
        }
    }
}

/// Removes detected entities from one kind of document.
pub trait Redactor {
    type Document;

    /// Returns a sanitized copy of `document` and the mapping for it.
    fn redact(&self, document: &Self::Document, entities: &[Entity]) -> Redaction<Self::Document>;

    /// Names of the techniques this redactor applies.
    fn redaction_methods(&self) -> &'static [&'static str];
}

/// Decides which mapping entries may be written back into external output.
///
/// Text entities are restorable whenever their original text is known. Image
/// entities are restorable only if their type is listed and they carry a
/// recognized string; a face or a signature has no textual form to restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestorePolicy {
    restorable_types: BTreeSet<String>,
}

impl RestorePolicy {
    pub fn new<I, S>(restorable_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            restorable_types: restorable_types
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn is_restorable(&self, entity: &Entity) -> bool {
        if entity.original_text.is_none() {
            return false;
        }
        match entity.modality {
            Modality::Text => true,
            Modality::Image => self.restorable_types.contains(&entity.entity_type),
            Modality::Audio => false,
        }
    }
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self::new(["OCR_TEXT"])
    }
}

/// Checks that an entity's placeholder is well formed, does not already occur
/// among the `existing` tokens of the document, and is not yet `issued`.
fn check_placeholder(
    entity: &Entity,
    existing: &HashSet<&str>,
    issued: impl Fn(&str) -> bool,
) -> Result<(), RedactionError> {
    if !crate::placeholder::is_placeholder(&entity.placeholder) {
        return Err(RedactionError::InvalidPlaceholder {
            placeholder: entity.placeholder.clone(),
        });
    }
    if existing.contains(entity.placeholder.as_str()) {
        return Err(RedactionError::PlaceholderCollision {
            placeholder: entity.placeholder.clone(),
        });
    }
    if issued(&entity.placeholder) {
        return Err(RedactionError::DuplicatePlaceholder {
            placeholder: entity.placeholder.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BoundingBox, TextSpan};

    #[test]
    fn text_is_restorable_once_original_is_known() {
        let policy = RestorePolicy::default();
        let entity = Entity::text("PERSON", "[PERSON_A]", TextSpan::new(0, 4), 0.9);
        assert!(!policy.is_restorable(&entity));
        assert!(policy.is_restorable(&entity.with_original_text("Jane")));
    }

    #[test]
    fn image_restorability_follows_listed_types() {
        let policy = RestorePolicy::new(["ocr_text"]);
        let bbox = BoundingBox::new(0, 0, 20, 20);
        let ocr = Entity::image("OCR_TEXT", "[OCR_TEXT_A]", bbox, 0.9).with_original_text("Secret");
        let face = Entity::image("FACE", "[FACE_A]", bbox, 0.9).with_original_text("ignored");
        let unread = Entity::image("OCR_TEXT", "[OCR_TEXT_B]", bbox, 0.9);
        assert!(policy.is_restorable(&ocr));
        assert!(!policy.is_restorable(&face));
        assert!(!policy.is_restorable(&unread));
    }
}
