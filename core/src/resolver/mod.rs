/*
 * mod.rs
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

//! Resource resolution: turn a name found in a message (relative path, absolute path, URL) into content.
//!
//! A resolver is configured once with a base (directory or URL) and a lenient flag. Lenient resolvers
//! report a resource that cannot be located as absent (`Ok(None)`) instead of `NotFound`; empty and
//! malformed names fail in both modes. `cid:` names always resolve to absent without any I/O.

mod composite;
pub(crate) mod file;
mod url;

pub use self::composite::CompositeResolver;
pub use self::file::FileResolver;
pub use self::url::{UrlResolver, DEFAULT_TIMEOUT};

use std::path::Path;

use bytes::Bytes;
use log::warn;

use crate::error::{EmailError, ErrorKind, Result};

/// Fallback content type when neither the transport nor the name tells us.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Looks up resources by name.
pub trait ResourceResolver: Send + Sync {
    /// Resolve `name` to its content. `html_context` is true when the name was found in HTML markup.
    /// Returns `Ok(None)` for `cid:` names and, in lenient mode, for resources that cannot be located.
    fn resolve(&self, name: &str, html_context: bool) -> Result<Option<ResolvedContent>>;

    /// Canonical source identity `name` would resolve to (absolute URL or absolute path). No I/O
    /// beyond path canonicalisation.
    fn identify(&self, name: &str) -> Result<String>;

    fn is_lenient(&self) -> bool;
}

impl std::fmt::Debug for dyn ResourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("lenient", &self.is_lenient())
            .finish()
    }
}

/// Content produced by a resolver: bytes, content type and where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    content_type: String,
    content: Bytes,
    origin: Option<String>,
}

impl ResolvedContent {
    pub fn new(content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            content: content.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Last path segment of the origin, if any (e.g. "logo.gif").
    pub fn file_name(&self) -> Option<&str> {
        let origin = self.origin.as_deref()?;
        let trimmed = origin.split(['?', '#']).next().unwrap_or(origin);
        trimmed
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
    }
}

/// Reject empty names. Never subject to leniency.
pub(crate) fn require_name(name: &str) -> Result<&str> {
    if name.trim().is_empty() {
        return Err(EmailError::invalid("resource name must not be empty"));
    }
    Ok(name)
}

/// Apply the lenient rule: `NotFound` becomes absent when lenient, everything else propagates.
pub(crate) fn absent_or_not_found(lenient: bool, err: EmailError) -> Result<Option<ResolvedContent>> {
    if lenient && err.kind() == ErrorKind::NotFound {
        warn!("lenient resolver treating as absent: {}", err);
        Ok(None)
    } else {
        Err(err)
    }
}

/// Content type from the file extension of `path`, or [`DEFAULT_CONTENT_TYPE`].
pub(crate) fn guess_content_type(path: impl AsRef<Path>) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_rejected() {
        assert_eq!(require_name("").unwrap_err().kind(), ErrorKind::InvalidReference);
        assert_eq!(require_name("  ").unwrap_err().kind(), ErrorKind::InvalidReference);
        assert_eq!(require_name("a.gif").unwrap(), "a.gif");
    }

    #[test]
    fn lenient_only_swallows_not_found() {
        let r = absent_or_not_found(true, EmailError::not_found("x")).unwrap();
        assert!(r.is_none());
        let e = absent_or_not_found(false, EmailError::not_found("x")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
        let e = absent_or_not_found(true, EmailError::malformed("?x", "no protocol")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MalformedReference);
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(guess_content_type("a/contentTypeTest.gif"), "image/gif");
        assert_eq!(guess_content_type("contentTypeTest.jpg"), "image/jpeg");
        assert_eq!(guess_content_type("contentTypeTest.png"), "image/png");
        assert_eq!(guess_content_type("noextension"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn file_name_from_origin() {
        let c = ResolvedContent::new("image/gif", vec![1u8, 2, 3])
            .with_origin("http://example.org/images/logo.gif?v=2");
        assert_eq!(c.file_name(), Some("logo.gif"));
        assert_eq!(c.len(), 3);
        let c = ResolvedContent::new("image/gif", Vec::new());
        assert_eq!(c.file_name(), None);
        assert!(c.is_empty());
    }
}
