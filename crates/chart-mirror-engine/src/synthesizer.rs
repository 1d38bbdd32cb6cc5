//! Extension chart synthesis
//!
//! Extension projects publish a `controller-registration.yaml` manifest
//! bundle instead of a chart. The synthesized chart wraps that bundle in a
//! single template and lets users inject `values.values` into the
//! `ControllerDeployment`.

use serde_json::json;
use tracing::{debug, info, warn};

use chart_mirror_core::{ChartFile, ChartMetadata, ChartNode, Settings, SourceSpec, Values};
use chart_mirror_repo::{ManifestFetcher, RepoError};

use crate::error::{EngineError, Result};

/// Name of every synthesized chart
pub const CONTROLLER_CHART: &str = "controller";

/// Template holding the patched manifest bundle
pub const CONTROLLER_TEMPLATE: &str = "templates/controller-registration.yaml";

const MANIFEST: &str = "controller-registration.yaml";
const DEPLOYMENT_KIND: &str = "ControllerDeployment";
const VALUES_BLOCK: &str = "{{- if .Values.values }}\n{{- toYaml .Values.values | nindent 4 }}\n{{- end }}\n";

/// Locations of the manifest bundle, in the order they are tried
pub fn manifest_urls(source: &SourceSpec, settings: &Settings) -> Vec<String> {
    vec![
        settings.raw_file_url(&source.repo, &source.version, &format!("examples/{MANIFEST}")),
        settings.raw_file_url(&source.repo, &source.version, &format!("example/{MANIFEST}")),
        settings.release_asset_url(&source.repo, &source.version, MANIFEST),
    ]
}

/// Build the controller chart of `source` from its upstream manifest bundle
pub async fn synthesize(
    source: &SourceSpec,
    settings: &Settings,
    fetcher: &dyn ManifestFetcher,
) -> Result<ChartNode> {
    let urls = manifest_urls(source, settings);
    let manifest = fetch_first(source, settings, fetcher, &urls).await?;
    let manifest = String::from_utf8(manifest).map_err(|e| EngineError::Fetch {
        message: format!("{MANIFEST} of {} is not UTF-8: {}", source.name, e),
    })?;

    if !manifest.contains(DEPLOYMENT_KIND) {
        warn!(source = %source.name, version = %source.version, "no ControllerDeployment in manifest, chart takes no values");
    }

    let mut metadata = ChartMetadata::new(CONTROLLER_CHART, source.chart_version());
    metadata.description = Some(format!(
        "Helmchart for controllerregistration of {}",
        source.name
    ));

    let mut chart = ChartNode::new(metadata);
    chart.values = Values(json!({ "values": {} }));
    chart.sync_values_file()?;
    chart.templates.push(ChartFile::new(
        CONTROLLER_TEMPLATE,
        inject_values_block(&manifest),
    ));
    Ok(chart)
}

async fn fetch_first(
    source: &SourceSpec,
    settings: &Settings,
    fetcher: &dyn ManifestFetcher,
    urls: &[String],
) -> Result<Vec<u8>> {
    for url in urls {
        let result = match tokio::time::timeout(settings.timeout, fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(RepoError::DeadlineExceeded {
                operation: format!("GET {url}"),
                seconds: settings.timeout.as_secs(),
            }),
        };
        match result {
            Ok(Some(data)) => {
                info!(source = %source.name, url = %url, "fetched controller registration");
                return Ok(data);
            }
            Ok(None) => debug!(url = %url, "not found"),
            Err(e) => debug!(url = %url, error = %e, "fetch failed"),
        }
    }

    Err(EngineError::Fetch {
        message: format!(
            "no {MANIFEST} for {} at {} ({} locations tried)",
            source.name,
            source.version,
            urls.len()
        ),
    })
}

/// Append the values block to every document declaring a ControllerDeployment
///
/// Documents are separated by lines consisting of `---` only.
pub fn inject_values_block(manifest: &str) -> String {
    let mut out = String::with_capacity(manifest.len() + VALUES_BLOCK.len());
    let mut document = String::new();

    for line in manifest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            push_document(&mut out, &document);
            out.push_str(line);
            document.clear();
        } else {
            document.push_str(line);
        }
    }
    push_document(&mut out, &document);
    out
}

fn push_document(out: &mut String, document: &str) {
    out.push_str(document);
    if document.contains(DEPLOYMENT_KIND) {
        if !document.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(VALUES_BLOCK);
    }
}
