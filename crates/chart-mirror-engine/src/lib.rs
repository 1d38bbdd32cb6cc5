//! chart-mirror Engine - release reconciliation
//!
//! This crate decides which upstream releases to mirror and what the
//! published charts look like:
//! - `tracker`: upstream versions not yet released downstream
//! - `transformer`: chart tree normalization (schema, versions, subchart toggles)
//! - `synthesizer`: charts wrapping extension controller registrations
//! - `driver`: per-source orchestration, reporting and cancellation

pub mod driver;
pub mod error;
pub mod publisher;
pub mod report;
pub mod synthesizer;
pub mod tracker;
pub mod transformer;

pub use driver::{BuiltChart, CancelFlag, Reconciler};
pub use error::{EngineError, ErrorKind, Result};
pub use publisher::{ArchivePublisher, ChartPublisher, DirectoryPublisher, PublishedChart};
pub use report::{
    ReconcileReport, RunStatus, SourceOutcome, SourceReport, VersionOutcome, VersionReport,
};
pub use synthesizer::{inject_values_block, manifest_urls, synthesize};
pub use tracker::{TrackedVersion, VersionSet, trackable};
pub use transformer::{condition_for, image_tag_paths, normalize};
