//! Detection source capability and bounded parallel collection.
//!
//! Every source runs on its own worker thread and writes only to its own
//! result slot. Collection waits on a channel until all sources report or the
//! deadline passes; late sources are recorded as timed out and their results
//! are discarded when they eventually arrive.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::RecvTimeoutError;
use image::RgbImage;
use slog::{debug, warn, Logger};

use crate::{candidate::RawCandidate, entity::Modality, error::DetectionBackendError};

/// A document as handed to detection sources.
#[derive(Clone)]
pub enum Document {
    Text(String),
    Image(RgbImage),
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Text(text) => f
                .debug_struct("Text")
                .field("chars", &text.chars().count())
                .finish_non_exhaustive(),
            Document::Image(image) => f
                .debug_struct("Image")
                .field("width", &image.width())
                .field("height", &image.height())
                .finish_non_exhaustive(),
        }
    }
}

impl Document {
    pub fn modality(&self) -> Modality {
        match self {
            Document::Text(_) => Modality::Text,
            Document::Image(_) => Modality::Image,
        }
    }
}

/// An external detection backend: named-entity recognition, face detection,
/// OCR, object detection, and so on.
pub trait DetectionSource: Send + Sync {
    /// Stable name, unique within one pipeline.
    fn name(&self) -> &str;

    /// Type tags this source may emit.
    fn supported_types(&self) -> Vec<String> {
        Vec::new()
    }

    /// Model identifier reported in run metadata.
    fn model_info(&self) -> Option<String> {
        None
    }

    /// Whether the source runs with hardware acceleration.
    fn accelerated(&self) -> bool {
        false
    }

    fn detect(&self, document: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError>;
}

/// What one source produced in one run.
#[derive(Clone, Debug)]
pub struct SourceOutput {
    pub source: String,
    pub model: Option<String>,
    pub accelerated: bool,
    pub result: Result<Vec<RawCandidate>, DetectionBackendError>,
}

impl SourceOutput {
    pub fn new(
        source: impl Into<String>,
        result: Result<Vec<RawCandidate>, DetectionBackendError>,
    ) -> Self {
        Self {
            source: source.into(),
            model: None,
            accelerated: false,
            result,
        }
    }

    fn from_source(
        source: &dyn DetectionSource,
        result: Result<Vec<RawCandidate>, DetectionBackendError>,
    ) -> Self {
        Self {
            source: source.name().to_owned(),
            model: source.model_info(),
            accelerated: source.accelerated(),
            result,
        }
    }
}

/// Runs every source against `document` in parallel and waits at most
/// `timeout` for all of them.
///
/// Outputs are returned in the order of `sources`, independent of completion
/// order.
pub fn run_sources(
    sources: &[Arc<dyn DetectionSource>],
    document: &Arc<Document>,
    timeout: Duration,
    logger: &Logger,
) -> Vec<SourceOutput> {
    let deadline = Instant::now() + timeout;
    let (tx, rx) = crossbeam_channel::bounded(sources.len());
    let mut slots: Vec<Option<Result<Vec<RawCandidate>, DetectionBackendError>>> =
        vec![None; sources.len()];
    let mut pending: usize = 0;

    for (index, source) in sources.iter().enumerate() {
        let worker_source = Arc::clone(source);
        let worker_document = Arc::clone(document);
        let tx = tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("detect-{}", source.name()))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    worker_source.detect(&worker_document)
                }))
                .unwrap_or(Err(DetectionBackendError::Panicked));
                // The receiver is gone once the deadline passed.
                let _ = tx.send((index, result));
            });
        match spawned {
            Ok(_) => pending += 1,
            Err(err) => {
                warn!(logger, "could not start detection worker";
                    "source" => source.name(), "error" => %err);
                slots[index] = Some(Err(DetectionBackendError::Unavailable(
                    "worker thread could not be started".to_owned(),
                )));
            }
        }
    }
    drop(tx);

    while pending > 0 {
        match rx.recv_deadline(deadline) {
            Ok((index, result)) => {
                debug!(logger, "detection source finished";
                    "source" => sources[index].name(), "ok" => result.is_ok());
                slots[index] = Some(result);
                pending -= 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(logger, "detection deadline passed"; "pending" => pending,
                    "timeout_ms" => u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    sources
        .iter()
        .zip(slots)
        .map(|(source, slot)| {
            let result = slot.unwrap_or(Err(DetectionBackendError::TimedOut(timeout)));
            SourceOutput::from_source(source.as_ref(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        delay: Duration,
        outcome: Result<Vec<RawCandidate>, DetectionBackendError>,
    }

    impl DetectionSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn model_info(&self) -> Option<String> {
            Some(format!("{}-v1", self.name))
        }

        fn detect(&self, _document: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError> {
            thread::sleep(self.delay);
            self.outcome.clone()
        }
    }

    struct Panicking;

    impl DetectionSource for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn detect(&self, _document: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError> {
            panic!("model crashed")
        }
    }

    fn discard() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn outputs_follow_registration_order() {
        let sources: Vec<Arc<dyn DetectionSource>> = vec![
            Arc::new(Fixed {
                name: "slow",
                delay: Duration::from_millis(50),
                outcome: Ok(vec![RawCandidate::text_span("PERSON", 0, 4, 0.9)]),
            }),
            Arc::new(Fixed {
                name: "fast",
                delay: Duration::ZERO,
                outcome: Ok(Vec::new()),
            }),
        ];
        let document = Arc::new(Document::Text("Jane went home".into()));
        let outputs = run_sources(&sources, &document, Duration::from_secs(5), &discard());
        let names: Vec<&str> = outputs.iter().map(|o| o.source.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
        assert_eq!(outputs[0].result.as_ref().unwrap().len(), 1);
        assert_eq!(outputs[0].model.as_deref(), Some("slow-v1"));
    }

    #[test]
    fn late_source_times_out_without_blocking() {
        let sources: Vec<Arc<dyn DetectionSource>> = vec![
            Arc::new(Fixed {
                name: "stuck",
                delay: Duration::from_secs(5),
                outcome: Ok(Vec::new()),
            }),
            Arc::new(Fixed {
                name: "fine",
                delay: Duration::ZERO,
                outcome: Ok(Vec::new()),
            }),
        ];
        let document = Arc::new(Document::Text(String::new()));
        let started = Instant::now();
        let outputs = run_sources(&sources, &document, Duration::from_millis(100), &discard());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            outputs[0].result,
            Err(DetectionBackendError::TimedOut(Duration::from_millis(100)))
        );
        assert!(outputs[1].result.is_ok());
    }

    #[test]
    fn panicking_source_is_reported() {
        let sources: Vec<Arc<dyn DetectionSource>> = vec![Arc::new(Panicking)];
        let document = Arc::new(Document::Text("x".into()));
        let outputs = run_sources(&sources, &document, Duration::from_secs(5), &discard());
        assert_eq!(outputs[0].result, Err(DetectionBackendError::Panicked));
    }
}
