//! Mirror configuration
//!
//! Describes the upstream projects to mirror and the destination repository
//! that receives the unified release stream. Typically stored in `config.yaml`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::version::strip_version_prefix;

/// Artifact path sentinel: synthesize a chart from the upstream
/// `controller-registration.yaml` instead of importing a chart directory
pub const CONTROLLER_REGISTRATION: &str = "controller-registration";

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Upstream projects to mirror
    #[serde(default)]
    pub sources: Vec<SourceSpec>,

    /// Unified release target
    pub destination: DestinationSpec,

    /// Runtime knobs
    #[serde(default, skip_serializing_if = "Settings::is_default")]
    pub settings: Settings,
}

impl Configuration {
    /// Load and validate configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::InvalidConfig {
                message: format!("configuration file not found: {}", path.display()),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that every source is usable
    pub fn validate(&self) -> Result<()> {
        if self.destination.owner.is_empty() || self.destination.repo.is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "destination owner and repo are required".to_string(),
            });
        }

        for source in &self.sources {
            if source.name.is_empty() {
                return Err(CoreError::InvalidConfig {
                    message: format!("source for '{}' has no name", source.repo),
                });
            }
            source.owner_and_repo()?;
            if source.artifact_paths.is_empty() {
                return Err(CoreError::InvalidConfig {
                    message: format!("source '{}' declares no charts", source.name),
                });
            }
        }

        Ok(())
    }
}

/// One upstream project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Chart name in the destination repository
    pub name: String,

    /// Upstream release tag (e.g. `v1.70.0`)
    pub version: String,

    /// Upstream repository as `owner/repo`
    pub repo: String,

    /// Chart directories inside the upstream repository, or
    /// [`CONTROLLER_REGISTRATION`]
    #[serde(rename = "charts")]
    pub artifact_paths: Vec<String>,
}

impl SourceSpec {
    /// Split `repo` into owner and repository name
    pub fn owner_and_repo(&self) -> Result<(&str, &str)> {
        match self.repo.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok((owner, repo))
            }
            _ => Err(CoreError::InvalidConfig {
                message: format!(
                    "source '{}': repo '{}' must have the form owner/repo",
                    self.name, self.repo
                ),
            }),
        }
    }

    /// Clone this source as a template for one upstream tag
    pub fn with_version(&self, tag: impl Into<String>) -> Self {
        Self {
            version: tag.into(),
            ..self.clone()
        }
    }

    /// Version in chart form (no `v` prefix)
    pub fn chart_version(&self) -> &str {
        strip_version_prefix(&self.version)
    }
}

/// Unified release target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSpec {
    /// Owning organisation or user
    pub owner: String,

    /// Repository receiving the releases
    pub repo: String,

    /// Branch that serves `index.yaml`
    #[serde(default = "default_index_branch")]
    pub index_branch: String,
}

fn default_index_branch() -> String {
    "gh-pages".to_string()
}

/// Runtime knobs with sensible defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Max number of upstream releases considered per source (newest first).
    /// `None` pages until the listing is exhausted.
    #[serde(default)]
    pub lookback: Option<usize>,

    /// Deadline for every external call
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// GitHub REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Raw file download base URL
    #[serde(default = "default_raw_url")]
    pub raw_url: String,

    /// Web (clone and release assets) base URL
    #[serde(default = "default_web_url")]
    pub web_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lookback: None,
            timeout: default_timeout(),
            api_url: default_api_url(),
            raw_url: default_raw_url(),
            web_url: default_web_url(),
        }
    }
}

impl Settings {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// URL of a file in `repo` (owner/name) at a tag or branch
    pub fn raw_file_url(&self, repo: &str, reference: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.raw_url.trim_end_matches('/'),
            repo,
            reference,
            path
        )
    }

    /// URL of an asset attached to the release of `tag`
    pub fn release_asset_url(&self, repo: &str, tag: &str, asset: &str) -> String {
        format!(
            "{}/{}/releases/download/{}/{}",
            self.web_url.trim_end_matches('/'),
            repo,
            tag,
            asset
        )
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
sources:
  - name: gardener
    version: v1.70.0
    repo: gardener/gardener
    charts:
      - charts/gardener/controlplane
      - charts/gardener/gardenlet
  - name: networking-calico
    version: v1.30.0
    repo: gardener/gardener-extension-networking-calico
    charts:
      - controller-registration
destination:
  owner: gardener-community
  repo: gardener-charts
"#;

    #[test]
    fn test_parse_configuration() {
        let config = Configuration::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.destination.owner, "gardener-community");
        assert_eq!(config.destination.index_branch, "gh-pages");
        assert_eq!(config.settings, Settings::default());

        let gardener = &config.sources[0];
        assert_eq!(gardener.artifact_paths.len(), 2);
        assert_eq!(gardener.owner_and_repo().unwrap(), ("gardener", "gardener"));

        let calico = &config.sources[1];
        assert_eq!(calico.artifact_paths, vec![CONTROLLER_REGISTRATION]);
    }

    #[test]
    fn test_download_urls() {
        let settings = Settings {
            raw_url: "http://127.0.0.1:8080/raw/".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.raw_file_url("gardener/gardener", "v1.70.0", "charts/x.yaml"),
            "http://127.0.0.1:8080/raw/gardener/gardener/v1.70.0/charts/x.yaml"
        );
        assert_eq!(
            settings.release_asset_url("gardener/ext", "v1.0.0", "controller-registration.yaml"),
            "https://github.com/gardener/ext/releases/download/v1.0.0/controller-registration.yaml"
        );
    }

    #[test]
    fn test_settings_overrides() {
        let yaml = format!("{SAMPLE}settings:\n  lookback: 20\n  timeout: 90s\n");
        let config = Configuration::from_yaml(&yaml).unwrap();

        assert_eq!(config.settings.lookback, Some(20));
        assert_eq!(config.settings.timeout, Duration::from_secs(90));
        assert_eq!(config.settings.api_url, "https://api.github.com");
    }

    #[test]
    fn test_with_version_clones_template() {
        let config = Configuration::from_yaml(SAMPLE).unwrap();
        let template = &config.sources[0];

        let next = template.with_version("v1.71.0");
        assert_eq!(next.version, "v1.71.0");
        assert_eq!(next.chart_version(), "1.71.0");
        assert_eq!(template.version, "v1.70.0");
        assert_eq!(next.artifact_paths, template.artifact_paths);
    }

    #[test]
    fn test_invalid_repo_identifier() {
        for repo in ["gardener", "gardener/", "/gardener", "a/b/c"] {
            let source = SourceSpec {
                name: "x".to_string(),
                version: "v1.0.0".to_string(),
                repo: repo.to_string(),
                artifact_paths: vec!["charts/x".to_string()],
            };
            assert!(source.owner_and_repo().is_err(), "{repo} should be rejected");
        }
    }

    #[test]
    fn test_validate_rejects_empty_charts() {
        let yaml = r#"
sources:
  - name: dashboard
    version: 1.0.0
    repo: gardener/dashboard
    charts: []
destination:
  owner: o
  repo: r
"#;
        assert!(matches!(
            Configuration::from_yaml(yaml),
            Err(CoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Configuration::from_yaml(SAMPLE).unwrap();
        config.sources[0].version = "v1.71.0".to_string();
        config.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("settings"));
        assert!(content.contains("charts:"));

        let reloaded = Configuration::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_missing_file() {
        let err = Configuration::load_from(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }
}
