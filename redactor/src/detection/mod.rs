//! Candidate aggregation: validation, filtering, overlap resolution, and
//! placeholder assignment.
//!
//! - **`source`**: the detection backend capability and bounded collection
//! - **`dedup`**: overlap resolution for text spans
//!
//! The aggregator is the single merge point and the only code that issues
//! placeholders. Counters live in a fresh allocator per run, so IDs are
//! deterministic regardless of the order in which sources finish.

mod dedup;
mod source;

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use slog::{debug, info, o, warn, Logger};

pub use dedup::deduplicate;
pub use source::{run_sources, DetectionSource, Document, SourceOutput};

use crate::{
    candidate::{validate, Candidate},
    config::AggregationConfig,
    entity::{DetectionMetadata, Entity, Modality, SourceFailure},
    placeholder::{scan, PlaceholderAllocator},
};

/// Canonical output of one detection run.
#[derive(Clone, Debug)]
pub struct Aggregation {
    /// Text entities in ascending start order, then image entities in source
    /// order.
    pub entities: Vec<Entity>,
    pub metadata: DetectionMetadata,
}

/// Merges candidate lists from independent sources into placeholder-labeled
/// entities.
#[derive(Clone, Debug)]
pub struct DetectionAggregator {
    min_confidence: f64,
    allowed_types: Option<BTreeSet<String>>,
    label_aliases: BTreeMap<String, String>,
    logger: Logger,
}

impl DetectionAggregator {
    /// Builds an aggregator. Type tags in `config` are matched
    /// case-insensitively.
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            allowed_types: config.allowed_types.as_ref().map(|types| {
                types.iter().map(|t| t.trim().to_ascii_uppercase()).collect()
            }),
            label_aliases: config
                .label_aliases
                .iter()
                .map(|(type_tag, label)| (type_tag.trim().to_ascii_uppercase(), label.clone()))
                .collect(),
            logger: crate::slog::discard(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: &Logger) -> Self {
        self.logger = logger.new(o!("component" => "aggregator"));
        self
    }

    /// Placeholder label used for `entity_type`.
    pub fn label_for<'a>(&'a self, entity_type: &'a str) -> &'a str {
        self.label_aliases
            .get(entity_type)
            .map_or(entity_type, String::as_str)
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        candidate.confidence >= self.min_confidence
            && self
                .allowed_types
                .as_ref()
                .map_or(true, |types| types.contains(&candidate.entity_type))
    }

    /// Runs `sources` against `document` in parallel, bounded by `timeout`,
    /// and merges what they return.
    pub fn detect(
        &self,
        sources: &[Arc<dyn DetectionSource>],
        document: &Arc<Document>,
        timeout: Duration,
    ) -> Aggregation {
        let started = Instant::now();
        let outputs = run_sources(sources, document, timeout, &self.logger);
        let existing: Vec<&str> = match document.as_ref() {
            Document::Text(text) => scan(text).map(|token| token.text).collect(),
            Document::Image(_) => Vec::new(),
        };
        self.merge_reserving(
            outputs,
            Some(document.modality()),
            existing,
            started.elapsed(),
        )
    }

    /// Merges collected source outputs.
    ///
    /// When `modality` is given, candidates of any other modality are
    /// rejected. A failed source contributes nothing and is listed in
    /// [`DetectionMetadata::failed_sources`].
    pub fn merge(
        &self,
        outputs: Vec<SourceOutput>,
        modality: Option<Modality>,
        detection_time: Duration,
    ) -> Aggregation {
        self.merge_reserving(outputs, modality, Vec::new(), detection_time)
    }

    /// Like [`merge`](Self::merge), but never issues a placeholder listed in
    /// `existing` or occurring in any candidate's original text.
    ///
    /// `existing` holds the placeholder-shaped tokens already present in the
    /// document; issuing one of them would make restoration ambiguous.
    pub fn merge_reserving(
        &self,
        outputs: Vec<SourceOutput>,
        modality: Option<Modality>,
        existing: Vec<&str>,
        detection_time: Duration,
    ) -> Aggregation {
        let mut metadata = DetectionMetadata {
            detection_time,
            ..DetectionMetadata::default()
        };
        let mut text = Vec::new();
        let mut regions = Vec::new();

        for output in outputs {
            let candidates = match output.result {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!(self.logger, "detection source failed";
                        "source" => &output.source, "error" => %err);
                    metadata.failed_sources.push(SourceFailure {
                        source: output.source,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            metadata.accelerated |= output.accelerated;
            if let Some(model) = output.model {
                metadata.model_info.insert(output.source.clone(), model);
            }

            for raw in candidates {
                let candidate = match validate(raw, &output.source) {
                    Ok(candidate) => candidate,
                    Err(err) => {
                        debug!(self.logger, "candidate rejected";
                            "source" => &output.source, "reason" => %err);
                        metadata.rejected_candidates += 1;
                        continue;
                    }
                };
                if modality.is_some_and(|m| m != candidate.modality()) || !self.admits(&candidate)
                {
                    metadata.rejected_candidates += 1;
                    continue;
                }
                match candidate.modality() {
                    Modality::Text => text.push(candidate),
                    _ => regions.push(candidate),
                }
            }
            metadata.contributing_sources.push(output.source);
        }

        let (text, dropped) = deduplicate(text, |c| c.span().unwrap_or_default());
        metadata.dropped_overlaps = dropped;

        let mut reserved: HashSet<String> = existing.into_iter().map(str::to_owned).collect();
        reserved.extend(
            text.iter()
                .chain(&regions)
                .filter_map(|c| c.text.as_deref())
                .flat_map(|value| scan(value).map(|token| token.text.to_owned())),
        );
        if !reserved.is_empty() {
            debug!(self.logger, "placeholders reserved"; "count" => reserved.len());
        }
        let mut allocator = PlaceholderAllocator::with_reserved(reserved);
        let entities: Vec<Entity> = text
            .into_iter()
            .chain(regions)
            .map(|candidate| {
                let placeholder = allocator.allocate(self.label_for(&candidate.entity_type));
                Entity {
                    entity_type: candidate.entity_type,
                    placeholder,
                    confidence: candidate.confidence,
                    modality: candidate.location.modality(),
                    location: Some(candidate.location),
                    original_text: candidate.text,
                    metadata: candidate.metadata,
                }
            })
            .collect();

        for entity in &entities {
            *metadata
                .entities_by_type
                .entry(entity.entity_type.clone())
                .or_insert(0) += 1;
        }
        metadata.total_entities = entities.len();

        info!(self.logger, "detection merged";
            "entities" => metadata.total_entities,
            "sources" => metadata.contributing_sources.len(),
            "failed" => metadata.failed_sources.len(),
            "rejected" => metadata.rejected_candidates,
            "overlaps" => metadata.dropped_overlaps);

        Aggregation { entities, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        candidate::RawCandidate,
        entity::{BoundingBox, TextSpan},
        error::DetectionBackendError,
    };

    fn aggregator() -> DetectionAggregator {
        DetectionAggregator::new(&AggregationConfig::default())
    }

    fn ok(source: &str, candidates: Vec<RawCandidate>) -> SourceOutput {
        SourceOutput::new(source, Ok(candidates))
    }

    #[test]
    fn text_candidates_are_deduplicated_and_labeled_in_order() {
        let outputs = vec![
            ok(
                "ner",
                vec![
                    RawCandidate::text_span("ORG", 30, 60, 0.8),
                    RawCandidate::text_span("PERSON", 0, 8, 0.9),
                    RawCandidate::text_span("PERSON", 12, 20, 0.9),
                ],
            ),
            ok("regex", vec![RawCandidate::text_span("EMAIL", 40, 55, 1.0)]),
        ];
        let aggregation = aggregator().merge(outputs, Some(Modality::Text), Duration::ZERO);
        let summary: Vec<(&str, Option<TextSpan>)> = aggregation
            .entities
            .iter()
            .map(|e| (e.placeholder.as_str(), e.span()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("[PERSON_A]", Some(TextSpan::new(0, 8))),
                ("[PERSON_B]", Some(TextSpan::new(12, 20))),
                ("[ORG_A]", Some(TextSpan::new(30, 60))),
            ]
        );
        assert_eq!(aggregation.metadata.dropped_overlaps, 1);
        assert_eq!(aggregation.metadata.total_entities, 3);
        assert_eq!(aggregation.metadata.entities_by_type["PERSON"], 2);
        assert_eq!(aggregation.metadata.contributing_sources, vec!["ner", "regex"]);
    }

    #[test]
    fn failed_source_degrades_gracefully() {
        let outputs = vec![
            SourceOutput::new(
                "faces",
                Err(DetectionBackendError::Unavailable("model missing".into())),
            ),
            ok(
                "ocr",
                vec![RawCandidate::image_region("OCR_TEXT", (300, 100, 700, 150), 0.92)
                    .with_text("Secret Text")],
            ),
        ];
        let aggregation = aggregator().merge(outputs, Some(Modality::Image), Duration::ZERO);
        assert_eq!(aggregation.entities.len(), 1);
        assert_eq!(aggregation.entities[0].placeholder, "[OCR_TEXT_A]");
        assert_eq!(aggregation.metadata.contributing_sources, vec!["ocr"]);
        assert_eq!(aggregation.metadata.failed_sources[0].source, "faces");
        assert!(aggregation.metadata.failed_sources[0]
            .reason
            .contains("model missing"));
    }

    #[test]
    fn image_regions_are_not_spatially_deduplicated() {
        let outputs = vec![
            ok("faces", vec![RawCandidate::image_region("FACE", (0, 0, 50, 50), 0.99)]),
            ok("objects", vec![RawCandidate::image_region("VEHICLE", (10, 10, 60, 60), 0.7)]),
        ];
        let aggregation = aggregator().merge(outputs, None, Duration::ZERO);
        let boxes: Vec<Option<BoundingBox>> = aggregation.entities.iter().map(Entity::bbox).collect();
        assert_eq!(
            boxes,
            vec![
                Some(BoundingBox::new(0, 0, 50, 50)),
                Some(BoundingBox::new(10, 10, 60, 60))
            ]
        );
        assert_eq!(aggregation.metadata.dropped_overlaps, 0);
    }

    #[test]
    fn filters_and_aliases_apply() {
        let config = AggregationConfig {
            min_confidence: 0.5,
            allowed_types: Some(BTreeSet::from(["ocr_text".to_string()])),
            label_aliases: BTreeMap::from([("ocr_text".to_string(), "TEXT".to_string())]),
        };
        let outputs = vec![ok(
            "ocr",
            vec![
                RawCandidate::image_region("OCR_TEXT", (0, 0, 40, 20), 0.4),
                RawCandidate::image_region("OCR_TEXT", (0, 30, 40, 50), 0.9),
                RawCandidate::image_region("FACE", (50, 0, 90, 40), 0.99),
            ],
        )];
        let aggregation = DetectionAggregator::new(&config).merge(outputs, None, Duration::ZERO);
        assert_eq!(aggregation.entities.len(), 1);
        assert_eq!(aggregation.entities[0].placeholder, "[TEXT_A]");
        assert_eq!(aggregation.entities[0].entity_type, "OCR_TEXT");
        assert_eq!(aggregation.metadata.rejected_candidates, 2);
    }

    #[test]
    fn modality_mismatch_is_rejected() {
        let outputs = vec![ok(
            "mixed",
            vec![
                RawCandidate::text_span("PERSON", 0, 4, 0.9),
                RawCandidate::image_region("FACE", (0, 0, 9, 9), 0.9),
            ],
        )];
        let aggregation = aggregator().merge(outputs, Some(Modality::Text), Duration::ZERO);
        assert_eq!(aggregation.entities.len(), 1);
        assert_eq!(aggregation.metadata.rejected_candidates, 1);
    }

    #[test]
    fn counters_reset_between_runs() {
        let aggregator = aggregator();
        for _ in 0..2 {
            let outputs = vec![ok("ner", vec![RawCandidate::text_span("PERSON", 0, 4, 0.9)])];
            let aggregation = aggregator.merge(outputs, None, Duration::ZERO);
            assert_eq!(aggregation.entities[0].placeholder, "[PERSON_A]");
        }
    }

    #[test]
    fn twenty_seven_entities_overflow_to_decimal() {
        let candidates = (0..27)
            .map(|i| RawCandidate::text_span("PERSON", i * 10, i * 10 + 4, 0.9))
            .collect();
        let aggregation = aggregator().merge(vec![ok("ner", candidates)], None, Duration::ZERO);
        let ids: Vec<&str> = aggregation
            .entities
            .iter()
            .map(|e| e.placeholder.as_str())
            .collect();
        assert_eq!(ids[0], "[PERSON_A]");
        assert_eq!(ids[25], "[PERSON_Z]");
        assert_eq!(ids[26], "[PERSON_26]");
    }

    #[test]
    fn existing_placeholders_in_document_are_not_reissued() {
        let outputs = vec![ok("ner", vec![RawCandidate::text_span("PERSON", 15, 19, 0.9)])];
        let aggregation = aggregator().merge_reserving(
            outputs,
            Some(Modality::Text),
            scan("[PERSON_A] met Jane").map(|t| t.text).collect(),
            Duration::ZERO,
        );
        assert_eq!(aggregation.entities[0].placeholder, "[PERSON_B]");
    }

    #[test]
    fn placeholders_inside_original_values_are_not_reissued() {
        let outputs = vec![ok(
            "ner",
            vec![
                RawCandidate::text_span("NOTE", 0, 14, 0.9).with_text("see [PERSON_A]"),
                RawCandidate::text_span("PERSON", 20, 24, 0.9),
            ],
        )];
        let aggregation = aggregator().merge(outputs, None, Duration::ZERO);
        let ids: Vec<&str> = aggregation
            .entities
            .iter()
            .map(|e| e.placeholder.as_str())
            .collect();
        assert_eq!(ids, vec!["[NOTE_A]", "[PERSON_B]"]);
    }
}
