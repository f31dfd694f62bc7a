/*
 * registry.rs
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

//! Identity cache for inline resources of one message under construction.
//!
//! Each logical name is bound to at most one source identity and one content id. Re-embedding the
//! same source under the same name returns the cached content id; a different source under a bound
//! name is a conflict. All checks run before anything is stored, so a failed call leaves the
//! registry as it was. Not synchronised: one registry belongs to one message and one writer.

use std::collections::HashMap;

use log::{debug, info};

use super::cid::{CidGenerator, RandomCidGenerator};
use super::reference::ResourceReference;
use crate::error::{EmailError, Result};
use crate::resolver::{FileResolver, ResolvedContent, ResourceResolver, UrlResolver};

/// One embedded resource: the inline part registered under a logical name.
#[derive(Debug, Clone)]
pub struct EmbeddingEntry {
    logical_name: String,
    source_identity: String,
    content_id: String,
    content: ResolvedContent,
}

impl EmbeddingEntry {
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn source_identity(&self) -> &str {
        &self.source_identity
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn content(&self) -> &ResolvedContent {
        &self.content
    }

    /// File name for the part's Content-Disposition: from the content origin, else the logical name.
    pub fn file_name(&self) -> &str {
        self.content.file_name().unwrap_or(&self.logical_name)
    }
}

pub struct EmbeddingRegistry {
    entries: Vec<EmbeddingEntry>,
    by_name: HashMap<String, usize>,
    generator: Box<dyn CidGenerator>,
    url_resolver: UrlResolver,
}

impl Default for EmbeddingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EmbeddingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingRegistry")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl EmbeddingRegistry {
    pub fn new() -> Self {
        Self::with_generator(Box::new(RandomCidGenerator::new()))
    }

    pub fn with_generator(generator: Box<dyn CidGenerator>) -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            generator,
            url_resolver: UrlResolver::new(None, false),
        }
    }

    /// Resolver used to fetch `Url` references (timeout, proxy). Strict and without base by default.
    pub fn set_url_resolver(&mut self, resolver: UrlResolver) {
        self.url_resolver = resolver;
    }

    pub fn url_resolver(&self) -> &UrlResolver {
        &self.url_resolver
    }

    /// Embed `reference` under `logical_name` and return its content id.
    ///
    /// `Named` references are resolved through `resolver` (with `html_context` passed on) and take
    /// the origin of the resolved content as their identity; an absent result is `NotFound`. `Url`
    /// references are fetched with [`url_resolver`](Self::url_resolver). `explicit_cid`, when
    /// given for a new name, is used verbatim;
    /// for a name already bound to the same source the cached content id wins.
    pub fn embed(
        &mut self,
        reference: ResourceReference,
        logical_name: &str,
        explicit_cid: Option<&str>,
        resolver: &dyn ResourceResolver,
        html_context: bool,
    ) -> Result<String> {
        let location = reference.location();
        self.embed_optional(reference, logical_name, explicit_cid, resolver, html_context)?
            .ok_or_else(|| EmailError::not_found(location))
    }

    /// As [`embed`](Self::embed), but a resource that resolves to absent yields `Ok(None)` and
    /// registers nothing.
    pub fn embed_optional(
        &mut self,
        reference: ResourceReference,
        logical_name: &str,
        explicit_cid: Option<&str>,
        resolver: &dyn ResourceResolver,
        html_context: bool,
    ) -> Result<Option<String>> {
        if logical_name.trim().is_empty() {
            return Err(EmailError::invalid("embedded name must not be empty"));
        }
        if explicit_cid.map_or(false, |c| c.trim().is_empty()) {
            return Err(EmailError::invalid("content id must not be empty"));
        }
        // Named references are resolved up front so the identity is that of the member that
        // actually produced the content.
        let (identity, prefetched) = match &reference {
            ResourceReference::Named(name) => match resolver.resolve(name, html_context)? {
                Some(content) => {
                    let identity = match content.origin() {
                        Some(origin) => origin.to_string(),
                        None => resolver.identify(name)?,
                    };
                    (identity, Some(content))
                }
                None => {
                    debug!("{} resolved to nothing, not embedding", logical_name);
                    return Ok(None);
                }
            },
            other => (other.source_identity(resolver)?, None),
        };

        if let Some(&idx) = self.by_name.get(logical_name) {
            let entry = &self.entries[idx];
            if entry.source_identity == identity {
                debug!("{} already embedded as {}", logical_name, entry.content_id);
                return Ok(Some(entry.content_id.clone()));
            }
            return Err(EmailError::NameConflict {
                name: logical_name.to_string(),
                existing: entry.source_identity.clone(),
                requested: identity,
            });
        }

        let content = match (prefetched, reference) {
            (Some(content), _) => Some(content),
            (None, ResourceReference::File(path)) => FileResolver::without_base_dir(false).read_path(&path)?,
            (None, ResourceReference::Url(url)) => self.url_resolver.resolve_url(&url)?,
            (None, ResourceReference::Data(ds)) => Some(ResolvedContent::from(ds)),
            (None, ResourceReference::Named(_)) => None,
            (None, ResourceReference::Resolved(content)) => Some(content),
        };
        let content = match content {
            Some(c) => c,
            None => {
                debug!("{} resolved to nothing, not embedding", logical_name);
                return Ok(None);
            }
        };

        let content_id = match explicit_cid {
            Some(cid) => cid.to_string(),
            None => self.generator.next_cid(),
        };
        info!(
            "embedding {} ({}, {} bytes) as cid {}",
            logical_name,
            content.content_type(),
            content.len(),
            content_id
        );
        self.by_name.insert(logical_name.to_string(), self.entries.len());
        self.entries.push(EmbeddingEntry {
            logical_name: logical_name.to_string(),
            source_identity: identity,
            content_id: content_id.clone(),
            content,
        });
        Ok(Some(content_id))
    }

    /// Drop every entry registered after the registry held `len` entries.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.entries.len() {
            return;
        }
        for entry in self.entries.drain(len..) {
            self.by_name.remove(&entry.logical_name);
        }
    }

    pub fn get(&self, logical_name: &str) -> Option<&EmbeddingEntry> {
        self.by_name.get(logical_name).map(|&i| &self.entries[i])
    }

    pub fn content_id(&self, logical_name: &str) -> Option<&str> {
        self.get(logical_name).map(EmbeddingEntry::content_id)
    }

    /// Inline parts in embedding order.
    pub fn entries(&self) -> &[EmbeddingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cid::CID_LENGTH;
    use crate::embedding::DataSource;
    use crate::error::ErrorKind;
    use crate::resolver::CompositeResolver;
    use std::fs;
    use std::path::PathBuf;

    struct Counter(u32);

    impl CidGenerator for Counter {
        fn next_cid(&mut self) -> String {
            self.0 += 1;
            format!("cid{:07}", self.0)
        }
    }

    fn registry() -> EmbeddingRegistry {
        EmbeddingRegistry::with_generator(Box::new(Counter(0)))
    }

    fn data(bytes: &'static [u8]) -> ResourceReference {
        DataSource::new("text/plain", bytes).into()
    }

    #[test]
    fn same_name_same_source_is_idempotent() {
        let mut reg = registry();
        let r = FileResolver::default();
        let a = reg.embed(data(b"x"), "testname", None, &r, false).unwrap();
        let b = reg.embed(data(b"x"), "testname", None, &r, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn distinct_names_get_distinct_cids() {
        let mut reg = EmbeddingRegistry::new();
        let r = FileResolver::default();
        let a = reg.embed(data(b"x"), "n1", None, &r, false).unwrap();
        let b = reg.embed(data(b"x"), "n2", None, &r, false).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), CID_LENGTH);
        assert_eq!(b.len(), CID_LENGTH);
    }

    #[test]
    fn conflicting_source_leaves_binding_unchanged() {
        let mut reg = registry();
        let r = FileResolver::default();
        let cid = reg.embed(data(b"x"), "testname", None, &r, false).unwrap();
        let e = reg.embed(data(b"y"), "testname", None, &r, false).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NameConflict);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.content_id("testname"), Some(cid.as_str()));
        assert_eq!(reg.get("testname").unwrap().content().content().as_ref(), b"x");
    }

    #[test]
    fn empty_name_always_invalid() {
        let mut reg = registry();
        for lenient in [true, false] {
            let r = FileResolver::new(".", lenient);
            let e = reg.embed(data(b"x"), "", None, &r, false).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::InvalidReference);
            let e = reg
                .embed_optional(ResourceReference::Named("a".into()), "", None, &r, false)
                .unwrap_err();
            assert_eq!(e.kind(), ErrorKind::InvalidReference);
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn explicit_cid_is_verbatim_and_authoritative() {
        let mut reg = registry();
        let r = FileResolver::default();
        let cid = reg.embed(data(b"x"), "logo", Some("Test CID"), &r, false).unwrap();
        assert_eq!(cid, "Test CID");
        let again = reg.embed(data(b"x"), "logo", None, &r, false).unwrap();
        assert_eq!(again, "Test CID");
        let e = reg.embed(data(b"x"), "other", Some(""), &r, false).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidReference);
    }

    #[test]
    fn named_resources_go_through_resolver() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logo.gif"), b"GIF89a").unwrap();
        let mut reg = registry();

        let strict = FileResolver::new(dir.path(), false);
        let cid = reg
            .embed(ResourceReference::Named("logo.gif".into()), "logo", None, &strict, true)
            .unwrap();
        assert_eq!(cid, "cid0000001");
        assert_eq!(reg.get("logo").unwrap().file_name(), "logo.gif");

        let e = reg
            .embed(ResourceReference::Named("gone.gif".into()), "gone", None, &strict, true)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);

        let lenient = FileResolver::new(dir.path(), true);
        let absent = reg
            .embed_optional(ResourceReference::Named("gone.gif".into()), "gone", None, &lenient, true)
            .unwrap();
        assert!(absent.is_none());
        let e = reg
            .embed(ResourceReference::Named("gone.gif".into()), "gone", None, &lenient, true)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn files_keyed_by_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("f.txt"), b"f").unwrap();
        let mut reg = registry();
        let r = FileResolver::default();
        let direct = reg
            .embed(sub.join("f.txt").into(), "f.txt", None, &r, false)
            .unwrap();
        let roundabout: PathBuf = sub.join("..").join("a").join("f.txt");
        let again = reg.embed(roundabout.into(), "f.txt", None, &r, false).unwrap();
        assert_eq!(direct, again);
    }

    #[test]
    fn failed_resolution_does_not_consume_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = registry();
        let r = FileResolver::new(dir.path(), false);
        assert!(reg
            .embed(ResourceReference::Named("late.txt".into()), "late", None, &r, false)
            .is_err());
        fs::write(dir.path().join("late.txt"), b"now").unwrap();
        let cid = reg
            .embed(ResourceReference::Named("late.txt".into()), "late", None, &r, false)
            .unwrap();
        assert_eq!(cid, "cid0000001");
    }

    #[test]
    fn chained_lookup_records_identity_of_member_that_found_it() {
        let empty = tempfile::tempdir().unwrap();
        let full = tempfile::tempdir().unwrap();
        fs::create_dir(full.path().join("images")).unwrap();
        let logo = full.path().join("images/logo.gif");
        fs::write(&logo, b"GIF89a").unwrap();
        let chain = CompositeResolver::new(
            vec![
                Box::new(FileResolver::new(empty.path(), true)),
                Box::new(FileResolver::new(full.path(), true)),
            ],
            true,
        );
        let mut reg = registry();
        let cid = reg
            .embed(ResourceReference::Named("images/logo.gif".into()), "logo", None, &chain, false)
            .unwrap();
        let canonical = fs::canonicalize(&logo).unwrap();
        assert_eq!(reg.get("logo").unwrap().source_identity(), canonical.to_string_lossy());

        let again = reg.embed(logo.clone().into(), "logo", None, &chain, false).unwrap();
        assert_eq!(again, cid);

        // Same relative name in the first directory is a different source.
        fs::create_dir(empty.path().join("images")).unwrap();
        fs::write(empty.path().join("images/logo.gif"), b"GIF89a-other").unwrap();
        let e = reg
            .embed(ResourceReference::Named("images/logo.gif".into()), "logo", None, &chain, false)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NameConflict);
    }

    #[test]
    fn truncate_forgets_later_names() {
        let mut reg = registry();
        let r = FileResolver::default();
        reg.embed(data(b"a"), "a", None, &r, false).unwrap();
        reg.embed(data(b"b"), "b", None, &r, false).unwrap();
        reg.embed(data(b"c"), "c", None, &r, false).unwrap();
        reg.truncate(1);
        assert_eq!(reg.len(), 1);
        assert!(reg.get("b").is_none() && reg.get("c").is_none());
        let b = reg.embed(data(b"other"), "b", None, &r, false).unwrap();
        assert_eq!(reg.content_id("b"), Some(b.as_str()));
        reg.truncate(5);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn url_references_use_configured_resolver() {
        let mut reg = registry();
        assert_eq!(reg.url_resolver().timeout(), crate::resolver::DEFAULT_TIMEOUT);
        reg.set_url_resolver(UrlResolver::new(None, true).with_timeout(std::time::Duration::from_millis(250)));
        assert_eq!(reg.url_resolver().timeout(), std::time::Duration::from_millis(250));

        let dir = tempfile::tempdir().unwrap();
        let missing = url::Url::from_file_path(dir.path().join("gone.gif")).unwrap();
        let r = FileResolver::default();
        let absent = reg.embed_optional(missing.into(), "gone", None, &r, false).unwrap();
        assert!(absent.is_none());
        assert!(reg.is_empty());
    }
}
