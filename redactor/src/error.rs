//! Error taxonomy.
//!
//! Only [`InputError`], [`ConfigurationError`], and the pipeline-level
//! conditions in [`PipelineError`] halt processing. Backend failures degrade
//! a detection run, malformed entities are skipped one at a time, and
//! restoration never fails. Messages never embed original values.

use std::time::Duration;

use thiserror::Error;

/// The document could not be opened or parsed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("text document is not valid UTF-8 (first invalid byte at {valid_up_to})")]
    Encoding { valid_up_to: usize },
    #[error("image document could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

/// A required collaborator or setting is unavailable. Raised before any
/// document is processed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("no detection sources configured")]
    NoSources,
    #[error("duplicate detection source name `{0}`")]
    DuplicateSource(String),
    #[error("{name} must be greater than zero")]
    ZeroTimeout { name: &'static str },
    #[error("min_confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),
    #[error("label alias `{type_tag}` -> `{label}` is not a valid placeholder label")]
    InvalidAlias { type_tag: String, label: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// One detection source failed. The run continues without it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectionBackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend failed: {0}")]
    Failed(String),
    #[error("backend did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("backend panicked")]
    Panicked,
}

/// Why a single entity or candidate was skipped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RedactionError {
    #[error("entity {placeholder} has no {expected} location")]
    MissingLocation {
        placeholder: String,
        expected: &'static str,
    },
    #[error("entity {placeholder} span {start}..{end} is outside a document of {len} characters")]
    SpanOutOfBounds {
        placeholder: String,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("entity {placeholder} overlaps an entity already redacted")]
    Overlap { placeholder: String },
    #[error("entity {placeholder} has an empty region")]
    EmptyRegion { placeholder: String },
    #[error("placeholder {placeholder} was already issued in this document")]
    DuplicatePlaceholder { placeholder: String },
    #[error("entity placeholder `{placeholder}` is not a well-formed placeholder")]
    InvalidPlaceholder { placeholder: String },
    #[error("placeholder {placeholder} already occurs in the document")]
    PlaceholderCollision { placeholder: String },
    #[error("candidate rejected: {0}")]
    InvalidCandidate(String),
}

/// Non-fatal observations made during restoration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "placeholder", rename_all = "snake_case")]
pub enum RestorationWarning {
    /// A mapped placeholder never appeared in the output.
    Unused(String),
    /// A placeholder-shaped token with no mapping entry.
    Hallucinated(String),
    /// A mapped, non-restorable placeholder appeared and was left as-is.
    Withheld(String),
}

/// Errors that stop processing of one document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("{stage} did not complete within {limit:?}")]
    Timeout { stage: &'static str, limit: Duration },
    #[error("inference call failed: {0}")]
    Inference(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
