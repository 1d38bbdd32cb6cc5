//! chart-mirror Core - data model shared by every chart-mirror crate
//!
//! This crate provides the foundational types used throughout chart-mirror:
//! - `Configuration`: Upstream sources and the destination repository
//! - `ChartNode`: An owned Helm chart tree (metadata, values, files, dependencies)
//! - `Values`: Chart values with dotted-path access
//! - `version`: Tag to semver helpers

pub mod archive;
pub mod chart;
pub mod config;
pub mod error;
pub mod ignore;
pub mod values;
pub mod version;

pub use archive::{archive_name, create_archive, load_archive, read_archive, write_archive};
pub use chart::{
    CHART_API_VERSION, ChartDependency, ChartFile, ChartMetadata, ChartNode, RELEASE_NOTES_FILE,
    VALUES_FILE,
};
pub use config::{
    CONTROLLER_REGISTRATION, Configuration, DestinationSpec, Settings, SourceSpec,
};
pub use error::{CoreError, Result};
pub use ignore::{IGNORE_FILE, IgnoreRules};
pub use values::Values;
pub use version::{parse_tag, strip_version_prefix};
