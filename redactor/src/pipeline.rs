//! The per-document pipeline: detect → redact → external call → restore.
//!
//! A [`Pipeline`] is built once from a validated [`PipelineConfig`] and a set
//! of detection sources, and holds no per-document state. Each call creates
//! its own allocator and mapping. The two waits in a round, detection and the
//! inference call, are both bounded by the configured timeouts.

use std::{
    collections::HashSet,
    error::Error as StdError,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

use crossbeam_channel::RecvTimeoutError;
use image::RgbImage;
use slog::{info, o, warn, Logger};

use crate::{
    config::PipelineConfig,
    detection::{DetectionAggregator, DetectionSource, Document},
    error::{ConfigurationError, InputError, PipelineError, PipelineResult},
    redact::{ImageRedactor, RestorePolicy, TextRedactor},
    restore::Restorer,
    session::{Detection, Redacted, Restored},
    slog::SafeMapping,
};

pub type InferenceError = Box<dyn StdError + Send + Sync>;

/// The external service a sanitized document is sent to: an LLM, a vision
/// model, and so on. It only ever sees placeholders.
pub trait InferenceClient: Send + Sync {
    fn infer(&self, sanitized: &Document) -> Result<String, InferenceError>;
}

pub struct Pipeline {
    config: PipelineConfig,
    sources: Vec<Arc<dyn DetectionSource>>,
    aggregator: DetectionAggregator,
    text: TextRedactor,
    image: ImageRedactor,
    restorer: Restorer,
    logger: Logger,
}

impl Pipeline {
    /// Validates `config` and `sources`. Refuses to build without at least
    /// one source or with two sources sharing a name.
    pub fn new(
        config: PipelineConfig,
        sources: Vec<Arc<dyn DetectionSource>>,
        logger: &Logger,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        if sources.is_empty() {
            return Err(ConfigurationError::NoSources);
        }
        let mut names = HashSet::new();
        for source in &sources {
            if !names.insert(source.name()) {
                return Err(ConfigurationError::DuplicateSource(source.name().to_owned()));
            }
        }

        let logger = logger.new(o!("component" => "pipeline"));
        let policy = RestorePolicy::new(&config.restorable_types);
        let pipeline = Self {
            aggregator: DetectionAggregator::new(&config.aggregation).with_logger(&logger),
            text: TextRedactor::new(policy.clone()).with_logger(&logger),
            image: ImageRedactor::new(config.image.clone(), policy).with_logger(&logger),
            restorer: Restorer::new().with_logger(&logger),
            config,
            sources,
            logger,
        };
        info!(pipeline.logger, "pipeline ready";
            "sources" => pipeline.sources.len(),
            "image_redaction" => pipeline.image.describe(),
        );
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detect_text(&self, text: &str) -> Detection<String> {
        let document = Arc::new(Document::Text(text.to_owned()));
        let aggregation =
            self.aggregator
                .detect(&self.sources, &document, self.config.detection_timeout());
        Detection::new(text.to_owned(), aggregation)
    }

    pub fn detect_image(&self, image: RgbImage) -> Detection<RgbImage> {
        let document = Arc::new(Document::Image(image.clone()));
        let aggregation =
            self.aggregator
                .detect(&self.sources, &document, self.config.detection_timeout());
        Detection::new(image, aggregation)
    }

    pub fn redact_text(&self, text: &str) -> Redacted<String> {
        let redacted = self.detect_text(text).redact(&self.text);
        self.log_redaction(&redacted);
        redacted
    }

    /// Like [`Pipeline::redact_text`], for UTF-8 bytes.
    pub fn redact_text_bytes(&self, bytes: &[u8]) -> Result<Redacted<String>, InputError> {
        let text = std::str::from_utf8(bytes).map_err(|err| InputError::Encoding {
            valid_up_to: err.valid_up_to(),
        })?;
        Ok(self.redact_text(text))
    }

    pub fn redact_image(&self, image: RgbImage) -> Redacted<RgbImage> {
        let redacted = self.detect_image(image).redact(&self.image);
        self.log_redaction(&redacted);
        redacted
    }

    /// Like [`Pipeline::redact_image`], for PNG or JPEG bytes.
    pub fn redact_encoded_image(&self, bytes: &[u8]) -> Result<Redacted<RgbImage>, InputError> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        Ok(self.redact_image(image))
    }

    pub fn restore<D>(&self, redacted: Redacted<D>, output: &str) -> Restored {
        redacted.restore(output, &self.restorer)
    }

    /// Runs a full round for a text document.
    pub fn process_text<C>(&self, text: &str, client: &Arc<C>) -> PipelineResult<Restored>
    where
        C: InferenceClient + ?Sized + 'static,
    {
        let redacted = self.redact_text(text);
        let sanitized = Document::Text(redacted.document().clone());
        let output = self.call_inference(client, sanitized)?;
        Ok(self.restore(redacted, &output))
    }

    /// Runs a full round for an image document.
    pub fn process_image<C>(&self, image: RgbImage, client: &Arc<C>) -> PipelineResult<Restored>
    where
        C: InferenceClient + ?Sized + 'static,
    {
        let redacted = self.redact_image(image);
        let sanitized = Document::Image(redacted.document().clone());
        let output = self.call_inference(client, sanitized)?;
        Ok(self.restore(redacted, &output))
    }

    fn log_redaction<D>(&self, redacted: &Redacted<D>) {
        let metadata = redacted.metadata();
        info!(self.logger, "document redacted";
            "entities" => metadata.total_entities,
            "failed_sources" => metadata.failed_sources.len(),
            "skipped" => redacted.skipped().len(),
            "mapping" => SafeMapping::new(redacted.mapping()),
        );
    }

    /// Calls `client` on a worker thread and waits at most the inference
    /// timeout. A late worker is abandoned; its result is dropped.
    fn call_inference<C>(&self, client: &Arc<C>, sanitized: Document) -> PipelineResult<String>
    where
        C: InferenceClient + ?Sized + 'static,
    {
        let limit = self.config.inference_timeout();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let worker_client = Arc::clone(client);
        thread::Builder::new()
            .name("inference".to_owned())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    worker_client
                        .infer(&sanitized)
                        .map_err(|err| PipelineError::Inference(err.to_string()))
                }))
                .unwrap_or_else(|_| {
                    Err(PipelineError::Inference("inference client panicked".to_owned()))
                });
                let _ = tx.send(result);
            })
            .map_err(|err| PipelineError::Inference(format!("could not start worker: {err}")))?;

        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(self.logger, "inference call timed out";
                    "timeout_ms" => self.config.inference_timeout_ms);
                Err(PipelineError::Timeout {
                    stage: "inference",
                    limit,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::Inference(
                "inference worker exited without a result".to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{candidate::RawCandidate, error::DetectionBackendError};

    struct Names;

    impl DetectionSource for Names {
        fn name(&self) -> &str {
            "names"
        }

        fn detect(&self, document: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError> {
            let Document::Text(text) = document else {
                return Ok(Vec::new());
            };
            Ok(text
                .find("Jane")
                .map(|byte| {
                    let start = text[..byte].chars().count();
                    RawCandidate::text_span("person", start, start + 4, 0.9)
                })
                .into_iter()
                .collect())
        }
    }

    struct Echo;

    impl InferenceClient for Echo {
        fn infer(&self, sanitized: &Document) -> Result<String, InferenceError> {
            match sanitized {
                Document::Text(text) => Ok(format!("{text} [PERSON_B]")),
                Document::Image(_) => Ok("an image".to_owned()),
            }
        }
    }

    struct Slow;

    impl InferenceClient for Slow {
        fn infer(&self, _: &Document) -> Result<String, InferenceError> {
            thread::sleep(Duration::from_millis(500));
            Ok(String::new())
        }
    }

    fn pipeline(config: PipelineConfig) -> Pipeline {
        let sources: Vec<Arc<dyn DetectionSource>> = vec![Arc::new(Names)];
        Pipeline::new(config, sources, &crate::slog::discard()).unwrap()
    }

    #[test]
    fn refuses_to_start_without_sources() {
        let err = Pipeline::new(PipelineConfig::default(), Vec::new(), &crate::slog::discard())
            .err()
            .unwrap();
        assert_eq!(err, ConfigurationError::NoSources);
    }

    #[test]
    fn refuses_duplicate_source_names() {
        let sources: Vec<Arc<dyn DetectionSource>> = vec![Arc::new(Names), Arc::new(Names)];
        let err = Pipeline::new(PipelineConfig::default(), sources, &crate::slog::discard())
            .err()
            .unwrap();
        assert_eq!(err, ConfigurationError::DuplicateSource("names".into()));
    }

    #[test]
    fn full_text_round() {
        let client = Arc::new(Echo);
        let restored = pipeline(PipelineConfig::default())
            .process_text("Hi Jane", &client)
            .unwrap();
        assert_eq!(restored.text, "Hi Jane [PERSON_B]");
        assert_eq!(restored.stats.hallucinated_placeholders, vec!["[PERSON_B]"]);
        assert_eq!(restored.metadata.contributing_sources, vec!["names"]);
    }

    #[test]
    fn inference_is_bounded() {
        let config = PipelineConfig {
            inference_timeout_ms: 20,
            ..PipelineConfig::default()
        };
        let client: Arc<dyn InferenceClient> = Arc::new(Slow);
        let err = pipeline(config).process_text("Hi Jane", &client).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Timeout {
                stage: "inference",
                ..
            }
        ));
    }
}
