use std::{collections::HashSet, iter};

use slog::{debug, o, warn, Logger};

use super::{check_placeholder, Redaction, Redactor, RestorePolicy};
use crate::{
    entity::{Entity, TextSpan},
    error::{InputError, RedactionError},
    mapping::{MappingEntry, PlaceholderMap},
    placeholder::scan,
};

const METHODS: &[&str] = &["placeholder_substitution"];

/// Replaces each entity's character span with its placeholder.
///
/// Spans are Unicode scalar offsets into the input. Entities are applied from
/// the highest start offset down, so every span is resolved against the
/// unmodified input. An entity whose span reaches into one already replaced
/// is skipped as an overlap, and one whose placeholder already occurs in the
/// input is skipped as a collision.
#[derive(Clone, Debug)]
pub struct TextRedactor {
    policy: RestorePolicy,
    logger: Logger,
}

impl TextRedactor {
    pub fn new(policy: RestorePolicy) -> Self {
        Self {
            policy,
            logger: crate::slog::discard(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: &Logger) -> Self {
        self.logger = logger.new(o!("component" => "text_redactor"));
        self
    }

    /// Redacts `text`, leaving it untouched.
    pub fn redact_text(&self, text: &str, entities: &[Entity]) -> Redaction<String> {
        if entities.is_empty() {
            debug!(self.logger, "no entities, text returned unchanged");
            return Redaction::unchanged(text.to_owned());
        }

        // boundaries[i] is the byte offset of character i; the last slot is text.len().
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        let mut skipped = Vec::new();
        let mut located = Vec::with_capacity(entities.len());
        for entity in entities {
            match entity.span() {
                None => skipped.push(RedactionError::MissingLocation {
                    placeholder: entity.placeholder.clone(),
                    expected: "character span",
                }),
                Some(span) if span.is_empty() || span.end > char_len => {
                    skipped.push(RedactionError::SpanOutOfBounds {
                        placeholder: entity.placeholder.clone(),
                        start: span.start,
                        end: span.end,
                        len: char_len,
                    });
                }
                Some(span) => located.push((span, entity)),
            }
        }
        located.sort_by(|(a, _), (b, _)| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

        let existing: HashSet<&str> = scan(text).map(|token| token.text).collect();
        let mut output = text.to_owned();
        let mut last_applied: Option<TextSpan> = None;
        let mut entries = Vec::with_capacity(located.len());
        for (span, entity) in located {
            // Spans arrive by descending start, so only the last one applied can overlap.
            if last_applied.is_some_and(|applied| span.overlaps(&applied)) {
                skipped.push(RedactionError::Overlap {
                    placeholder: entity.placeholder.clone(),
                });
                continue;
            }
            let issued = |p: &str| entries.iter().any(|e: &MappingEntry| e.placeholder == p);
            if let Err(err) = check_placeholder(entity, &existing, issued) {
                skipped.push(err);
                continue;
            }

            let (start, end) = (boundaries[span.start], boundaries[span.end]);
            // Bytes before `start` are still identical to `text`.
            output.replace_range(start..end, &entity.placeholder);
            last_applied = Some(span);

            let mut owned = entity.clone();
            owned.original_text = Some(text[start..end].to_owned());
            let restorable = self.policy.is_restorable(&owned);
            entries.push(MappingEntry::new(owned, restorable));
        }

        // Entries were produced from the end of the text backwards.
        let mut mapping = PlaceholderMap::new();
        for entry in entries.into_iter().rev() {
            if let Err(err) = mapping.insert(entry) {
                skipped.push(err);
            }
        }

        for err in &skipped {
            warn!(self.logger, "entity skipped"; "reason" => %err);
        }
        debug!(self.logger, "text redacted";
            "replaced" => mapping.len(),
            "skipped" => skipped.len(),
        );

        Redaction {
            document: output,
            mapping,
            skipped,
            unlabeled: Vec::new(),
        }
    }

    /// Redacts a UTF-8 encoded document.
    pub fn redact_bytes(
        &self,
        bytes: &[u8],
        entities: &[Entity],
    ) -> Result<Redaction<String>, InputError> {
        let text = std::str::from_utf8(bytes).map_err(|err| InputError::Encoding {
            valid_up_to: err.valid_up_to(),
        })?;
        Ok(self.redact_text(text, entities))
    }
}

impl Default for TextRedactor {
    fn default() -> Self {
        Self::new(RestorePolicy::default())
    }
}

impl Redactor for TextRedactor {
    type Document = String;

    fn redact(&self, document: &String, entities: &[Entity]) -> Redaction<String> {
        self.redact_text(document, entities)
    }

    fn redaction_methods(&self) -> &'static [&'static str] {
        METHODS
    }
}
