//! Manifest locator parsing.
//!
//! A locator names the manifest blob either as a full object URL
//! (`https://account.blob.core.windows.net/container/path/manifest.json`) or
//! as a bare `container/path/manifest.json` string. Path segments of URL-form
//! locators are percent-decoded; bare locators are taken literally.

use crate::{Error, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Container and blob path extracted from a manifest locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestLocator {
    container: String,
    blob_path: String,
}

impl ManifestLocator {
    /// Build a locator from its parts.
    pub fn new(container: impl Into<String>, blob_path: impl Into<String>) -> Result<Self> {
        let container = container.into();
        let blob_path = blob_path.into();
        if container.is_empty() {
            return Err(Error::InvalidLocator("container name is empty".to_string()));
        }
        if blob_path.is_empty() {
            return Err(Error::InvalidLocator(format!(
                "no blob path after container '{container}'"
            )));
        }
        Ok(Self {
            container,
            blob_path,
        })
    }

    /// Parse a URL or `container/path` locator.
    pub fn parse(locator: &str) -> Result<Self> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidLocator("locator is empty".to_string()));
        }

        // Drop the scheme and authority of URL-form locators.
        let (path, is_url) = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                if scheme.is_empty() {
                    return Err(Error::InvalidLocator(format!("missing scheme in '{trimmed}'")));
                }
                match rest.split_once('/') {
                    Some((_host, path)) => (path, true),
                    None => ("", true),
                }
            }
            None => (trimmed, false),
        };

        // Query strings (SAS tokens) are not part of the blob name.
        let path = path.split(['?', '#']).next().unwrap_or_default();

        let mut segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                if is_url {
                    decode_segment(segment)
                } else {
                    Ok(Cow::Borrowed(segment))
                }
            });
        let container = segments
            .next()
            .ok_or_else(|| Error::InvalidLocator(format!("no container in '{trimmed}'")))??;
        let blob_path = segments.collect::<Result<Vec<_>>>()?.join("/");
        Self::new(container, blob_path)
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Blob path inside the container.
    pub fn blob_path(&self) -> &str {
        &self.blob_path
    }
}

fn decode_segment(segment: &str) -> Result<Cow<'_, str>> {
    percent_decode_str(segment)
        .decode_utf8()
        .map_err(|e| Error::InvalidLocator(format!("segment '{segment}' is not valid UTF-8: {e}")))
}

impl fmt::Display for ManifestLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.blob_path)
    }
}

impl std::str::FromStr for ManifestLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
