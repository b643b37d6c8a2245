//! Manifest and tabular file sources.
//!
//! The analyzer and the manifest service only see the two traits below. The
//! filesystem adapters treat a local directory as object storage: each
//! top-level subdirectory is a container and blob paths are relative paths
//! inside it.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use inv_common::{Manifest, ManifestLocator};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from manifest and tabular file retrieval.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("blob not found: {container}/{path}")]
    NotFound { container: String, path: String },

    #[error("invalid locator '{locator}': {message}")]
    InvalidLocator { locator: String, message: String },

    #[error("invalid blob path '{0}'")]
    InvalidPath(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fetches and deserializes one manifest.
///
/// Missing and malformed manifests are reported as `Ok(None)`.
pub trait ManifestReader: Send + Sync {
    fn read_manifest(&self, locator: &str) -> Result<Option<Manifest>, SourceError>;
}

/// Opens forward-only byte streams over tabular export files.
pub trait TabularFileSource: Send + Sync {
    fn open_stream(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Box<dyn Read + Send>, SourceError>;
}

/// Resolve `container/path` under `root`, refusing anything that would escape
/// the container directory.
fn blob_path(root: &Path, container: &str, path: &str) -> Result<PathBuf, SourceError> {
    let mut resolved = root.to_path_buf();
    for part in [container, path] {
        let relative = Path::new(part);
        if part.is_empty() {
            return Err(SourceError::InvalidPath(format!("{container}/{path}")));
        }
        for component in relative.components() {
            match component {
                Component::Normal(segment) => resolved.push(segment),
                Component::CurDir => {}
                _ => return Err(SourceError::InvalidPath(format!("{container}/{path}"))),
            }
        }
    }
    Ok(resolved)
}

/// Reads manifests from `<root>/<container>/<blob path>`.
#[derive(Debug, Clone)]
pub struct FsManifestReader {
    root: PathBuf,
}

impl FsManifestReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ManifestReader for FsManifestReader {
    fn read_manifest(&self, locator: &str) -> Result<Option<Manifest>, SourceError> {
        let parsed =
            ManifestLocator::parse(locator).map_err(|e| SourceError::InvalidLocator {
                locator: locator.to_string(),
                message: e.to_string(),
            })?;
        let path = blob_path(&self.root, parsed.container(), parsed.blob_path())?;

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "manifest blob not found");
                return Ok(None);
            }
            Err(e) => return Err(SourceError::Io { path, source: e }),
        };

        match Manifest::from_slice(&bytes) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                warn!(locator, error = %e, "manifest is not valid inventory JSON");
                Ok(None)
            }
        }
    }
}

/// Opens tabular files from `<root>/<container>/<path>`.
#[derive(Debug, Clone)]
pub struct FsTabularSource {
    root: PathBuf,
}

impl FsTabularSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TabularFileSource for FsTabularSource {
    fn open_stream(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Box<dyn Read + Send>, SourceError> {
        let full = blob_path(&self.root, container, path)?;
        match File::open(&full) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SourceError::NotFound {
                container: container.to_string(),
                path: path.to_string(),
            }),
            Err(e) => Err(SourceError::Io {
                path: full,
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "destinationContainer": "dest",
        "files": [{ "blob": "run/part-1.csv", "size": 10 }],
        "inventoryStartTime": "2024-01-01T00:00:00Z",
        "inventoryCompletionTime": "2024-01-01T01:00:00Z"
    }"#;

    fn storage() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("inv/run")).unwrap();
        std::fs::write(dir.path().join("inv/run/manifest.json"), MANIFEST).unwrap();
        std::fs::write(dir.path().join("inv/run/broken.json"), "{").unwrap();
        std::fs::create_dir_all(dir.path().join("dest/run")).unwrap();
        std::fs::write(dir.path().join("dest/run/part-1.csv"), "a,b\n").unwrap();
        dir
    }

    #[test]
    fn test_reads_manifest_by_bare_and_url_locator() {
        let dir = storage();
        let reader = FsManifestReader::new(dir.path());
        let bare = reader.read_manifest("inv/run/manifest.json").unwrap();
        let url = reader
            .read_manifest("https://acct.blob.core.windows.net/inv/run/manifest.json")
            .unwrap();
        assert_eq!(bare.as_ref().map(|m| m.files.len()), Some(1));
        assert_eq!(bare, url);
    }

    #[test]
    fn test_missing_and_malformed_manifest_are_none() {
        let dir = storage();
        let reader = FsManifestReader::new(dir.path());
        assert!(reader.read_manifest("inv/run/absent.json").unwrap().is_none());
        assert!(reader.read_manifest("inv/run/broken.json").unwrap().is_none());
    }

    #[test]
    fn test_invalid_locator_is_error() {
        let dir = storage();
        let reader = FsManifestReader::new(dir.path());
        assert!(matches!(
            reader.read_manifest("inv"),
            Err(SourceError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn test_open_stream_reads_bytes() {
        let dir = storage();
        let source = FsTabularSource::new(dir.path());
        let mut content = String::new();
        source
            .open_stream("dest", "run/part-1.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "a,b\n");
    }

    #[test]
    fn test_open_stream_missing_blob() {
        let dir = storage();
        let source = FsTabularSource::new(dir.path());
        assert!(matches!(
            source.open_stream("dest", "run/part-9.csv"),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_paths_cannot_escape_container() {
        let dir = storage();
        let source = FsTabularSource::new(dir.path());
        assert!(matches!(
            source.open_stream("dest", "../inv/run/manifest.json"),
            Err(SourceError::InvalidPath(_))
        ));
        assert!(matches!(
            source.open_stream("dest", "/etc/passwd"),
            Err(SourceError::InvalidPath(_))
        ));
        assert!(matches!(
            source.open_stream("", "x.csv"),
            Err(SourceError::InvalidPath(_))
        ));
    }
}
