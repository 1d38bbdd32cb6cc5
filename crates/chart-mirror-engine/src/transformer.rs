//! Chart tree normalization
//!
//! Rewrites an imported chart tree so it can be released standalone: every
//! node gets the v2 schema and the source's version, known charts get their
//! image tags pinned, and every subchart is declared with a condition and
//! switched off by default so consumers opt into components individually.

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use chart_mirror_core::{CHART_API_VERSION, ChartDependency, ChartNode, CoreError, SourceSpec};

use crate::error::{EngineError, Result};

/// Values paths that carry the image tag of known charts
const IMAGE_TAG_PATCHES: &[(&str, &[&str])] = &[
    ("dashboard", &["image.tag"]),
    ("gardenlet", &["global.gardenlet.image.tag"]),
    (
        "gardener-controlplane",
        &[
            "global.apiserver.image.tag",
            "global.admission.image.tag",
            "global.controller.image.tag",
            "global.scheduler.image.tag",
        ],
    ),
];

/// Image tag paths patched for a chart name (empty for unknown charts)
pub fn image_tag_paths(chart: &str) -> &'static [&'static str] {
    IMAGE_TAG_PATCHES
        .iter()
        .find(|(name, _)| *name == chart)
        .map(|(_, paths)| *paths)
        .unwrap_or(&[])
}

/// Condition key toggling a dependency
pub fn condition_for(dependency: &str) -> String {
    format!("{dependency}.enabled")
}

/// Normalize `root` and all of its dependencies for `source`
///
/// Applying it again to its own output changes nothing.
pub fn normalize(root: &mut ChartNode, source: &SourceSpec) -> Result<()> {
    normalize_node(root, source.chart_version())
}

fn normalize_node(node: &mut ChartNode, version: &str) -> Result<()> {
    node.metadata.api_version = CHART_API_VERSION.to_string();
    node.metadata.version = version.to_string();

    for path in image_tag_paths(node.name()) {
        node.values
            .set(path, JsonValue::String(version.to_string()))
            .map_err(|e| EngineError::transform(node.name(), e))?;
    }

    if node.dependencies.is_empty() {
        node.sync_values_file()?;
        return Ok(());
    }

    let names: Vec<String> = node
        .dependencies
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    for name in &names {
        declare_dependency(node, name, version);
        disable_dependency(node, name)?;
    }
    node.sync_values_file()?;
    debug!(chart = node.name(), dependencies = names.len(), "disabled subcharts");

    for dependency in &mut node.dependencies {
        normalize_node(dependency, version)?;
    }
    Ok(())
}

/// Add or update the Chart.yaml entry of a bundled dependency
fn declare_dependency(node: &mut ChartNode, name: &str, version: &str) {
    let condition = condition_for(name);
    match node
        .metadata
        .dependencies
        .iter_mut()
        .find(|d| d.name == name)
    {
        Some(existing) => {
            existing.version = version.to_string();
            existing.condition = Some(condition);
            existing.enabled = false;
        }
        None => {
            let mut dependency = ChartDependency::new(name);
            dependency.version = version.to_string();
            dependency.condition = Some(condition);
            node.metadata.dependencies.push(dependency);
        }
    }
}

/// Set `<name>.enabled: false`, keeping the dependency's other values
fn disable_dependency(node: &mut ChartNode, name: &str) -> Result<()> {
    let chart = node.name().to_string();
    let root = &mut node.values.0;
    if root.is_null() {
        *root = JsonValue::Object(Map::new());
    }

    let invalid = |segment: &str| {
        EngineError::transform(
            &chart,
            CoreError::ValuesPath {
                path: condition_for(name),
                segment: segment.to_string(),
            },
        )
    };

    let JsonValue::Object(map) = root else {
        return Err(invalid("<root>"));
    };
    let entry = map
        .entry(name.to_string())
        .or_insert_with(|| JsonValue::Object(Map::new()));
    if entry.is_null() {
        *entry = JsonValue::Object(Map::new());
    }
    match entry {
        JsonValue::Object(values) => {
            values.insert("enabled".to_string(), JsonValue::Bool(false));
            Ok(())
        }
        _ => Err(invalid(name)),
    }
}
