//! chart-mirror Repository Collaborators
//!
//! Everything the reconciliation engine talks to outside the process:
//!
//! - **Upstream releases**: GitHub release listing, release notes, latest release
//! - **Released versions**: the destination `index.yaml`, or the destination's
//!   own `<name>-<version>` release tags as a fallback
//! - **Chart import**: shallow checkout of an upstream tag with `git2`
//! - **Manifest download**: raw files and release assets
//!
//! The engine only sees the traits in [`backend`]; the types here are the
//! production implementations.

pub mod backend;
pub mod error;
pub mod git;
pub mod github;
pub mod index;

// Re-exports for convenience
pub use backend::{
    ChartImporter, ManifestFetcher, ReleasedVersions, UpstreamRelease, UpstreamReleases,
};
pub use error::{RepoError, Result};
pub use git::GitImporter;
pub use github::{GitHubClient, TaggedReleases};
pub use index::{IndexEntry, ReleaseIndex};
