//! Placeholder redaction and restoration for documents bound for untrusted
//! inference services.
//!
//! Sensitive spans of text and regions of images are replaced with stable,
//! per-document placeholders such as `[PERSON_A]` before a document leaves the
//! trust boundary. When the external service answers, verified placeholders
//! are swapped back for their originals and any placeholder the service
//! invented is reported as hallucinated.
//!
//! The engine is split into:
//! - **Detection**: independent [`DetectionSource`]s run in parallel under a
//!   deadline; [`DetectionAggregator`] validates, filters, deduplicates, and
//!   is the only place placeholders are issued.
//! - **Redaction**: [`TextRedactor`] substitutes placeholders into text,
//!   [`ImageRedactor`] blacks out and labels pixel boxes. Both produce a
//!   [`PlaceholderMap`].
//! - **Restoration**: [`Restorer`] runs a restoration pass and an independent
//!   hallucination pass over downstream output.
//!
//! [`Pipeline`] ties the stages together per document, and the types in
//! [`session`] make the order of stages a compile-time property.
//!
//! What this crate does not do:
//! - ship any detection model or inference client
//! - read files, environment variables, or credentials
//! - persist mappings; only [`MappingRecord`]s are meant to be logged

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::default_trait_access,
    clippy::doc_markdown,
    clippy::if_not_else,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::needless_ifs,
    clippy::use_self,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::enum_glob_use,
    clippy::struct_excessive_bools,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::result_large_err,
    clippy::future_not_send,
    clippy::option_if_let_else,
    clippy::from_over_into,
    clippy::manual_inspect
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::non_ascii_literal, clippy::unwrap_used))]


pub use redactor_derive::Sensitive;

/// Printed by `#[derive(Sensitive)]` in place of `#[sensitive]` fields.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

mod candidate;
mod config;
pub mod detection;
mod entity;
mod error;
mod mapping;
mod pipeline;
pub mod placeholder;
pub mod redact;
mod restore;
pub mod session;
pub mod slog;

pub use candidate::{validate, Candidate, RawCandidate};
pub use config::{AggregationConfig, Color, ImageRedactionConfig, PipelineConfig};
pub use detection::{Aggregation, DetectionAggregator, DetectionSource, Document, SourceOutput};
pub use entity::{
    BoundingBox, DetectionMetadata, Entity, Location, Modality, SourceFailure, TextSpan,
    TimeRange,
};
pub use error::{
    ConfigurationError, DetectionBackendError, InputError, PipelineError, PipelineResult,
    RedactionError, RestorationWarning,
};
pub use mapping::{MappingEntry, MappingRecord, PlaceholderMap};
pub use pipeline::{InferenceClient, InferenceError, Pipeline};
pub use redact::{Canvas, CanvasReport, ImageRedactor, Redaction, Redactor, RestorePolicy, TextRedactor};
pub use restore::{Restoration, RestorationStats, Restorer};
pub use session::{Detection, Redacted, Restored, SessionDocument};
