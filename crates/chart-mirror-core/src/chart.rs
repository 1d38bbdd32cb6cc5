//! Helm chart tree
//!
//! A [`ChartNode`] owns its metadata, values, files and dependency subcharts.
//! Trees are loaded from an unpacked chart directory or a `.tgz` archive and
//! written back in the same layout Helm uses:
//!
//! ```text
//! <name>/
//!   Chart.yaml
//!   values.yaml
//!   templates/...
//!   charts/<dependency>/...
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::archive;
use crate::error::{CoreError, Result};
use crate::ignore::IgnoreRules;
use crate::values::Values;

/// Chart schema version written to every published chart
pub const CHART_API_VERSION: &str = "v2";

/// Default values file
pub const VALUES_FILE: &str = "values.yaml";

/// Release notes attached to published root charts
pub const RELEASE_NOTES_FILE: &str = "RELEASE.md";

const CHART_FILE: &str = "Chart.yaml";
const LOCK_FILE: &str = "Chart.lock";
const TEMPLATES_DIR: &str = "templates/";
const CHARTS_DIR: &str = "charts/";

/// Chart.yaml contents
///
/// Fields the mirror does not touch are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart API version (v1 or v2)
    pub api_version: String,

    /// Chart name
    pub name: String,

    /// Chart version (SemVer, no prefix)
    pub version: String,

    /// Chart description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ChartDependency>,

    /// Everything else (appVersion, maintainers, annotations, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ChartMetadata {
    /// Minimal v2 metadata
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_version: CHART_API_VERSION.to_string(),
            name: name.into(),
            version: version.into(),
            description: None,
            dependencies: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Get a declared dependency by name
    pub fn dependency(&self, name: &str) -> Option<&ChartDependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("apiVersion", &self.api_version),
            ("name", &self.name),
            ("version", &self.version),
        ] {
            if value.is_empty() {
                return Err(CoreError::MissingField {
                    field: format!("{CHART_FILE} {field}"),
                });
            }
        }
        Ok(())
    }
}

/// Dependency entry in Chart.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDependency {
    /// Dependency name
    pub name: String,

    /// Version constraint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Repository URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Values path that toggles the dependency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Default state; omitted from Chart.yaml when false
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub enabled: bool,

    /// Tags, alias, import-values, ...
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ChartDependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            repository: None,
            condition: None,
            enabled: false,
            extra: BTreeMap::new(),
        }
    }
}

/// A named file inside a chart, path relative to the chart root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl ChartFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// One chart in a dependency tree
#[derive(Debug, Clone, PartialEq)]
pub struct ChartNode {
    /// Chart.yaml
    pub metadata: ChartMetadata,

    /// Parsed values.yaml
    pub values: Values,

    /// Non-template files (values.yaml, README.md, RELEASE.md, crds/...)
    pub files: Vec<ChartFile>,

    /// Files below templates/
    pub templates: Vec<ChartFile>,

    /// Subcharts, owned exclusively by this node
    pub dependencies: Vec<ChartNode>,
}

impl ChartNode {
    /// Create an empty chart with the given metadata
    pub fn new(metadata: ChartMetadata) -> Self {
        Self {
            metadata,
            values: Values::new(),
            files: Vec::new(),
            templates: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Get a raw file by name
    pub fn file(&self, name: &str) -> Option<&ChartFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Replace the contents of a raw file, adding it if missing
    pub fn set_file(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        match self.files.iter_mut().find(|f| f.name == name) {
            Some(file) => file.data = data,
            None => self.files.push(ChartFile::new(name, data)),
        }
    }

    /// Re-serialize `values` into the values.yaml raw file
    pub fn sync_values_file(&mut self) -> Result<()> {
        let yaml = self.values.to_yaml()?;
        self.set_file(VALUES_FILE, yaml);
        Ok(())
    }

    /// Get a direct dependency by name
    pub fn dependency(&self, name: &str) -> Option<&ChartNode> {
        self.dependencies.iter().find(|d| d.name() == name)
    }

    /// Number of charts in this tree, including the root
    pub fn tree_size(&self) -> usize {
        1 + self
            .dependencies
            .iter()
            .map(ChartNode::tree_size)
            .sum::<usize>()
    }

    /// Load an unpacked chart directory
    ///
    /// Symlinks are followed, so charts that link shared templates from
    /// elsewhere in the upstream repository load completely. Paths excluded
    /// by the chart's `.helmignore` are skipped.
    pub fn load_dir(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: path.display().to_string(),
            });
        }
        let ignore = IgnoreRules::load(path)?;

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let relative = e.path().strip_prefix(path).unwrap_or(e.path());
                let name = relative_name(relative).unwrap_or_default();
                e.file_name() != ".git" && !ignore.ignored(&name, e.file_type().is_dir())
            })
        {
            let entry = entry.map_err(|e| CoreError::InvalidChart {
                message: format!("cannot walk {}: {}", path.display(), e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            let name = relative_name(relative)?;
            files.insert(name, std::fs::read(entry.path())?);
        }

        let chart = Self::from_files(files).map_err(|e| match e {
            CoreError::InvalidChart { message } => CoreError::InvalidChart {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })?;
        debug!(
            path = %path.display(),
            chart = chart.name(),
            charts = chart.tree_size(),
            "loaded chart directory"
        );
        Ok(chart)
    }

    /// Build a chart from a flat map of root-relative paths to contents
    pub fn from_files(files: BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let chart_yaml = files.get(CHART_FILE).ok_or_else(|| CoreError::InvalidChart {
            message: format!("{CHART_FILE} not found"),
        })?;
        let metadata: ChartMetadata = serde_yaml::from_slice(chart_yaml)?;
        metadata.validate()?;

        let mut chart = ChartNode::new(metadata);
        let mut subcharts: BTreeMap<String, BTreeMap<String, Vec<u8>>> = BTreeMap::new();

        for (name, data) in files {
            if name == CHART_FILE || name == LOCK_FILE {
                continue;
            }

            if name.starts_with(TEMPLATES_DIR) {
                chart.templates.push(ChartFile::new(name, data));
            } else if let Some(rest) = name.strip_prefix(CHARTS_DIR) {
                match rest.split_once('/') {
                    Some((dir, inner)) => {
                        subcharts
                            .entry(dir.to_string())
                            .or_default()
                            .insert(inner.to_string(), data);
                    }
                    None if rest.ends_with(".tgz") => {
                        chart
                            .dependencies
                            .push(archive::read_archive(data.as_slice())?);
                    }
                    None => chart.files.push(ChartFile::new(name, data)),
                }
            } else {
                if name == VALUES_FILE {
                    let text = String::from_utf8_lossy(&data);
                    chart.values = Values::from_yaml(&text)?;
                }
                chart.files.push(ChartFile::new(name, data));
            }
        }

        for (_, subchart_files) in subcharts {
            chart.dependencies.push(Self::from_files(subchart_files)?);
        }

        Ok(chart)
    }

    /// Flatten the tree into root-relative paths and contents
    ///
    /// Subcharts are placed under `charts/<name>/`. A values.yaml is always
    /// present, generated from `values` when no raw file exists.
    pub fn to_files(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut out = BTreeMap::new();
        out.insert(
            CHART_FILE.to_string(),
            serde_yaml::to_string(&self.metadata)?.into_bytes(),
        );

        if self.file(VALUES_FILE).is_none() {
            out.insert(VALUES_FILE.to_string(), self.values.to_yaml()?.into_bytes());
        }

        for file in self.files.iter().chain(&self.templates) {
            out.insert(file.name.clone(), file.data.clone());
        }

        for dep in &self.dependencies {
            for (name, data) in dep.to_files()? {
                out.insert(format!("{CHARTS_DIR}{}/{}", dep.name(), name), data);
            }
        }

        Ok(out)
    }

    /// Write the chart into `dest/<name>/`, returning the chart directory
    pub fn save_dir(&self, dest: &Path) -> Result<PathBuf> {
        let root = dest.join(self.name());
        for (name, data) in self.to_files()? {
            let path = root.join(&name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, data)?;
        }
        Ok(root)
    }
}

/// Convert a relative filesystem path into a `/`-separated chart path
pub(crate) fn relative_name(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(CoreError::InvalidChart {
                    message: format!("illegal path in chart: {}", relative.display()),
                });
            }
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn create_test_chart(dir: &Path) {
        write(
            dir,
            "Chart.yaml",
            r#"apiVersion: v1
name: controlplane
version: 0.1.0
description: Gardener control plane
appVersion: "1.70"
keywords:
  - gardener
"#,
        );
        write(dir, "values.yaml", "global:\n  apiserver:\n    replicaCount: 1\n");
        write(dir, "README.md", "# controlplane\n");
        write(dir, "templates/_helpers.tpl", "{{/* helpers */}}\n");
        write(
            dir,
            "charts/application/Chart.yaml",
            "apiVersion: v1\nname: application\nversion: 0.1.0\n",
        );
        write(dir, "charts/application/templates/rbac.yaml", "kind: ClusterRole\n");
        write(
            dir,
            "charts/runtime/Chart.yaml",
            "apiVersion: v1\nname: runtime\nversion: 0.1.0\n",
        );
    }

    #[test]
    fn test_load_dir() {
        let temp = TempDir::new().unwrap();
        create_test_chart(temp.path());

        let chart = ChartNode::load_dir(temp.path()).unwrap();

        assert_eq!(chart.name(), "controlplane");
        assert_eq!(chart.version(), "0.1.0");
        assert_eq!(chart.metadata.api_version, "v1");
        assert_eq!(chart.metadata.extra["appVersion"], "1.70");
        assert_eq!(chart.values.get("global.apiserver.replicaCount").unwrap(), 1);
        assert!(chart.file("README.md").is_some());
        assert!(chart.file(VALUES_FILE).is_some());
        assert_eq!(chart.templates.len(), 1);
        assert_eq!(chart.templates[0].name, "templates/_helpers.tpl");

        let deps: Vec<_> = chart.dependencies.iter().map(|d| d.name()).collect();
        assert_eq!(deps, vec!["application", "runtime"]);
        assert_eq!(chart.dependency("application").unwrap().templates.len(), 1);
        assert_eq!(chart.tree_size(), 3);
    }

    #[test]
    fn test_load_dir_honours_helmignore() {
        let temp = TempDir::new().unwrap();
        create_test_chart(temp.path());
        write(temp.path(), ".helmignore", "*.orig\nci/\n");
        write(temp.path(), "values.yaml.orig", "stale: true\n");
        write(&temp.path().join("ci"), "test-values.yaml", "a: 1\n");
        write(&temp.path().join("templates"), ".deployment.yaml.swp", "x");

        let chart = ChartNode::load_dir(temp.path()).unwrap();

        assert!(chart.file("values.yaml.orig").is_none());
        assert!(chart.file("ci/test-values.yaml").is_none());
        assert!(chart.file(".helmignore").is_some());
        assert_eq!(chart.templates.len(), 1);
        assert_eq!(chart.tree_size(), 3);
    }

    #[test]
    fn test_load_missing_dir() {
        let err = ChartNode::load_dir(Path::new("/nonexistent/chart")).unwrap_err();
        assert!(matches!(err, CoreError::ChartNotFound { .. }));
    }

    #[test]
    fn test_load_without_chart_yaml() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "values.yaml", "a: 1\n");

        let err = ChartNode::load_dir(temp.path()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }

    #[test]
    fn test_load_requires_version() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Chart.yaml", "apiVersion: v2\nname: x\nversion: \"\"\n");

        let err = ChartNode::load_dir(temp.path()).unwrap_err();
        assert!(matches!(err, CoreError::MissingField { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_follows_symlinks() {
        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("shared");
        write(&shared, "_shared.tpl", "{{/* shared */}}\n");

        let chart_dir = temp.path().join("chart");
        write(&chart_dir, "Chart.yaml", "apiVersion: v2\nname: linked\nversion: 1.0.0\n");
        std::fs::create_dir_all(chart_dir.join("templates")).unwrap();
        std::os::unix::fs::symlink(
            shared.join("_shared.tpl"),
            chart_dir.join("templates/_shared.tpl"),
        )
        .unwrap();

        let chart = ChartNode::load_dir(&chart_dir).unwrap();
        assert_eq!(chart.templates[0].data, b"{{/* shared */}}\n");
    }

    #[test]
    fn test_save_dir_layout() {
        let temp = TempDir::new().unwrap();
        create_test_chart(&temp.path().join("src"));
        let chart = ChartNode::load_dir(&temp.path().join("src")).unwrap();

        let out = chart.save_dir(&temp.path().join("out")).unwrap();

        assert_eq!(out, temp.path().join("out/controlplane"));
        assert!(out.join("Chart.yaml").exists());
        assert!(out.join("values.yaml").exists());
        assert!(out.join("templates/_helpers.tpl").exists());
        assert!(out.join("charts/application/Chart.yaml").exists());
        assert!(out.join("charts/application/templates/rbac.yaml").exists());

        let reloaded = ChartNode::load_dir(&out).unwrap();
        assert_eq!(reloaded.metadata, chart.metadata);
        assert_eq!(reloaded.dependencies.len(), 2);
    }

    #[test]
    fn test_set_file_replaces() {
        let mut chart = ChartNode::new(ChartMetadata::new("x", "1.0.0"));
        chart.set_file(VALUES_FILE, "a: 1\n");
        chart.set_file(VALUES_FILE, "a: 2\n");

        assert_eq!(chart.files.len(), 1);
        assert_eq!(chart.file(VALUES_FILE).unwrap().data, b"a: 2\n");
    }

    #[test]
    fn test_generated_values_file() {
        let mut chart = ChartNode::new(ChartMetadata::new("x", "1.0.0"));
        chart.values.set("values", serde_json::json!({})).unwrap();

        let files = chart.to_files().unwrap();
        let values = String::from_utf8(files[VALUES_FILE].clone()).unwrap();
        assert!(values.contains("values: {}"));
    }

    #[test]
    fn test_disabled_dependency_omits_enabled_field() {
        let mut metadata = ChartMetadata::new("parent", "1.0.0");
        let mut dep = ChartDependency::new("child");
        dep.condition = Some("child.enabled".to_string());
        metadata.dependencies.push(dep);

        let yaml = serde_yaml::to_string(&metadata).unwrap();
        assert!(yaml.contains("condition: child.enabled"));
        assert!(!yaml.contains("enabled: false"));
    }
}
