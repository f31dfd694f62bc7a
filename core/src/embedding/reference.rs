/*
 * reference.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Fermaglio.
 *
 * Fermaglio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Fermaglio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Fermaglio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! What can be embedded, and how its source identity is derived.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{EmailError, Result};
use crate::resolver::{file::canonical_existing, guess_content_type, ResolvedContent, ResourceResolver};

/// Raw content supplied by the caller, with its declared content type and an optional name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    name: Option<String>,
    content_type: String,
    content: Bytes,
}

impl DataSource {
    pub fn new(content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: None,
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Read a file into memory; name from the file name, content type from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)
            .map_err(|e| EmailError::not_found_caused_by(path.display().to_string(), e))?;
        let ds = Self::new(guess_content_type(path), content);
        Ok(match path.file_name() {
            Some(n) => ds.with_name(n.to_string_lossy()),
            None => ds,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// `data:<content-type>;name=<name>;sha256=<hex>`: equal for equal metadata and bytes.
    pub fn identity(&self) -> String {
        let digest = Sha256::digest(&self.content);
        let mut id = format!(
            "data:{};name={};sha256=",
            self.content_type,
            self.name.as_deref().unwrap_or("")
        );
        for b in digest.iter() {
            let _ = write!(id, "{:02x}", b);
        }
        id
    }
}

/// The data source's name, if any, becomes the origin; unnamed data has none.
impl From<DataSource> for ResolvedContent {
    fn from(ds: DataSource) -> Self {
        let content = ResolvedContent::new(ds.content_type, ds.content);
        match ds.name {
            Some(name) => content.with_origin(name),
            None => content,
        }
    }
}

/// A resource to embed.
#[derive(Debug, Clone)]
pub enum ResourceReference {
    /// Local file; identity is its canonical path.
    File(PathBuf),
    /// Absolute URL; identity is the URL string.
    Url(Url),
    /// Caller-supplied bytes; identity from [`DataSource::identity`].
    Data(DataSource),
    /// Name handed to the configured resolver; identity from [`ResourceResolver::identify`].
    Named(String),
    /// Content already resolved; identity is its origin, else derived from its bytes.
    Resolved(ResolvedContent),
}

impl ResourceReference {
    /// Canonical source identity used to detect naming conflicts.
    pub fn source_identity(&self, resolver: &dyn ResourceResolver) -> Result<String> {
        match self {
            ResourceReference::File(path) => {
                if path.as_os_str().is_empty() {
                    return Err(EmailError::invalid("file path must not be empty"));
                }
                canonical_existing(path)
            }
            ResourceReference::Url(url) => Ok(url.to_string()),
            ResourceReference::Data(ds) => Ok(ds.identity()),
            ResourceReference::Named(name) => resolver.identify(name),
            ResourceReference::Resolved(content) => Ok(match content.origin() {
                Some(origin) => origin.to_string(),
                None => DataSource::new(content.content_type(), content.content().clone()).identity(),
            }),
        }
    }

    /// Human-readable location for error messages.
    pub fn location(&self) -> String {
        match self {
            ResourceReference::File(path) => path.display().to_string(),
            ResourceReference::Url(url) => url.to_string(),
            ResourceReference::Data(ds) => ds.name().unwrap_or("data source").to_string(),
            ResourceReference::Named(name) => name.clone(),
            ResourceReference::Resolved(c) => c.origin().unwrap_or("resolved content").to_string(),
        }
    }
}

impl From<Url> for ResourceReference {
    fn from(url: Url) -> Self {
        ResourceReference::Url(url)
    }
}

impl From<PathBuf> for ResourceReference {
    fn from(path: PathBuf) -> Self {
        ResourceReference::File(path)
    }
}

impl From<&Path> for ResourceReference {
    fn from(path: &Path) -> Self {
        ResourceReference::File(path.to_path_buf())
    }
}

impl From<DataSource> for ResourceReference {
    fn from(ds: DataSource) -> Self {
        ResourceReference::Data(ds)
    }
}

impl From<ResolvedContent> for ResourceReference {
    fn from(content: ResolvedContent) -> Self {
        ResourceReference::Resolved(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resolver::FileResolver;

    #[test]
    fn data_identity_tracks_bytes_and_metadata() {
        let a = DataSource::new("text/plain", &b"one"[..]).with_name("a.txt");
        let same = DataSource::new("text/plain", &b"one"[..]).with_name("a.txt");
        let other_bytes = DataSource::new("text/plain", &b"two"[..]).with_name("a.txt");
        let other_name = DataSource::new("text/plain", &b"one"[..]).with_name("b.txt");
        assert_eq!(a.identity(), same.identity());
        assert_ne!(a.identity(), other_bytes.identity());
        assert_ne!(a.identity(), other_name.identity());
        assert!(a.identity().starts_with("data:text/plain;name=a.txt;sha256="));
    }

    #[test]
    fn missing_file_identity_is_not_found() {
        let r = FileResolver::default();
        let e = ResourceReference::File(PathBuf::from("/no/such/dir/file.gif"))
            .source_identity(&r)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
        let e = ResourceReference::File(PathBuf::new()).source_identity(&r).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidReference);
    }

    #[test]
    fn data_source_from_file_takes_name_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        std::fs::write(&path, b"png").unwrap();
        let ds = DataSource::from_file(&path).unwrap();
        assert_eq!(ds.name(), Some("chart.png"));
        assert_eq!(ds.content_type(), "image/png");
        let e = DataSource::from_file(dir.path().join("gone.png")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn unnamed_data_has_no_origin() {
        let content = ResolvedContent::from(DataSource::new("image/gif", &b"GIF89a"[..]));
        assert!(content.origin().is_none());
        assert!(content.file_name().is_none());
        let named = ResolvedContent::from(DataSource::new("image/gif", &b"GIF89a"[..]).with_name("logo.gif"));
        assert_eq!(named.file_name(), Some("logo.gif"));
    }
}
