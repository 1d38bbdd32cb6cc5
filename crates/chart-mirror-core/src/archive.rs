//! Chart archives (`<name>-<version>.tgz`)
//!
//! Archives hold a single top-level directory named after the chart, the
//! layout `helm package` produces and `charts/*.tgz` dependencies use.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};

use crate::chart::{ChartNode, relative_name};
use crate::error::{CoreError, Result};

/// File name Helm expects for a packaged chart
#[must_use]
pub fn archive_name(chart: &ChartNode) -> String {
    format!("{}-{}.tgz", chart.name(), chart.version())
}

/// Package a chart into `output_dir`, returning the archive path
pub fn create_archive(chart: &ChartNode, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(archive_name(chart));
    let file = File::create(&path)?;
    write_archive(chart, file)?;
    Ok(path)
}

/// Write a chart as a gzipped tarball
pub fn write_archive<W: Write>(chart: &ChartNode, writer: W) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);

    for (name, data) in chart.to_files()? {
        let archive_path = format!("{}/{}", chart.name(), name);
        add_bytes_to_archive(&mut builder, &archive_path, &data)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Load a chart from an archive file
pub fn load_archive(path: &Path) -> Result<ChartNode> {
    let file = File::open(path)?;
    read_archive(file)
}

/// Read a chart from a gzipped tarball
pub fn read_archive<R: Read>(reader: R) -> Result<ChartNode> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut root: Option<String> = None;
    let mut files = BTreeMap::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let path = relative_name(&entry.path()?).map_err(|e| CoreError::Archive {
            message: e.to_string(),
        })?;
        let (top, inner) = path.split_once('/').ok_or_else(|| CoreError::Archive {
            message: format!("entry outside chart directory: {}", path),
        })?;

        match &root {
            Some(existing) if existing != top => {
                return Err(CoreError::Archive {
                    message: format!("multiple top-level directories: {} and {}", existing, top),
                });
            }
            Some(_) => {}
            None => root = Some(top.to_string()),
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        files.insert(inner.to_string(), data);
    }

    if files.is_empty() {
        return Err(CoreError::Archive {
            message: "archive is empty".to_string(),
        });
    }

    ChartNode::from_files(files)
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0); // reproducible archives
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartFile, ChartMetadata};
    use tempfile::TempDir;

    fn sample_chart() -> ChartNode {
        let mut root = ChartNode::new(ChartMetadata::new("gardener", "1.70.0"));
        root.values.set("gardenlet.enabled", false.into()).unwrap();
        root.sync_values_file().unwrap();

        let mut child = ChartNode::new(ChartMetadata::new("gardenlet", "1.70.0"));
        child
            .templates
            .push(ChartFile::new("templates/deployment.yaml", "kind: Deployment\n"));
        root.dependencies.push(child);
        root
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name(&sample_chart()), "gardener-1.70.0.tgz");
    }

    #[test]
    fn test_create_and_load_archive() {
        let temp = TempDir::new().unwrap();
        let chart = sample_chart();

        let path = create_archive(&chart, temp.path()).unwrap();
        assert_eq!(path, temp.path().join("gardener-1.70.0.tgz"));

        let loaded = load_archive(&path).unwrap();
        assert_eq!(loaded.metadata, chart.metadata);
        assert_eq!(loaded.values, chart.values);

        let child = loaded.dependency("gardenlet").unwrap();
        assert_eq!(child.templates[0].name, "templates/deployment.yaml");
    }

    #[test]
    fn test_archive_is_reproducible() {
        let chart = sample_chart();
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_archive(&chart, &mut first).unwrap();
        write_archive(&chart, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_archived_dependency_in_charts_dir() {
        let temp = TempDir::new().unwrap();
        let dep = ChartNode::new(ChartMetadata::new("etcd", "3.5.0"));
        let mut tgz = Vec::new();
        write_archive(&dep, &mut tgz).unwrap();

        let chart_dir = temp.path().join("parent");
        std::fs::create_dir_all(chart_dir.join("charts")).unwrap();
        std::fs::write(
            chart_dir.join("Chart.yaml"),
            "apiVersion: v2\nname: parent\nversion: 1.0.0\n",
        )
        .unwrap();
        std::fs::write(chart_dir.join("charts/etcd-3.5.0.tgz"), tgz).unwrap();

        let parent = ChartNode::load_dir(&chart_dir).unwrap();
        assert_eq!(parent.dependencies.len(), 1);
        assert_eq!(parent.dependencies[0].name(), "etcd");
        assert_eq!(parent.dependencies[0].version(), "3.5.0");
    }

    #[test]
    fn test_empty_archive_rejected() {
        let mut buffer = Vec::new();
        {
            let encoder = GzEncoder::new(&mut buffer, Compression::default());
            let builder = Builder::new(encoder);
            builder.into_inner().unwrap().finish().unwrap();
        }
        assert!(matches!(
            read_archive(buffer.as_slice()),
            Err(CoreError::Archive { .. })
        ));
    }
}
