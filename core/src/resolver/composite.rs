/*
 * composite.rs
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

//! Chain of resolvers tried in order.

use log::debug;

use super::{require_name, ResolvedContent, ResourceResolver};
use crate::error::{EmailError, ErrorKind, Result};
use crate::mime::is_cid;

/// Tries each resolver in turn and returns the first content found.
///
/// Strict chains stop at the first `NotFound` raised by a member and fail with `NotFound` when every
/// member reports absent; lenient chains skip members that cannot locate the resource and return
/// absent when none can. Malformed names always propagate.
pub struct CompositeResolver {
    resolvers: Vec<Box<dyn ResourceResolver>>,
    lenient: bool,
}

impl CompositeResolver {
    pub fn new(resolvers: Vec<Box<dyn ResourceResolver>>, lenient: bool) -> Self {
        Self { resolvers, lenient }
    }

    pub fn resolvers(&self) -> &[Box<dyn ResourceResolver>] {
        &self.resolvers
    }
}

impl std::fmt::Debug for CompositeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeResolver")
            .field("resolvers", &self.resolvers.len())
            .field("lenient", &self.lenient)
            .finish()
    }
}

impl ResourceResolver for CompositeResolver {
    fn resolve(&self, name: &str, html_context: bool) -> Result<Option<ResolvedContent>> {
        require_name(name)?;
        if is_cid(name) {
            return Ok(None);
        }
        for (i, resolver) in self.resolvers.iter().enumerate() {
            match resolver.resolve(name, html_context) {
                Ok(Some(content)) => {
                    debug!("{} resolved by chain member {}", name, i);
                    return Ok(Some(content));
                }
                Ok(None) => continue,
                Err(e) if self.lenient && e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        if self.lenient {
            Ok(None)
        } else {
            Err(EmailError::not_found(name))
        }
    }

    /// Identity reported by the first member able to identify `name`.
    fn identify(&self, name: &str) -> Result<String> {
        require_name(name)?;
        let mut last = None;
        for resolver in &self.resolvers {
            match resolver.identify(name) {
                Ok(identity) => return Ok(identity),
                Err(e) => last = Some(e),
            }
        }
        Err(last.unwrap_or_else(|| EmailError::not_found(name)))
    }

    fn is_lenient(&self) -> bool {
        self.lenient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{FileResolver, UrlResolver};
    use std::fs;

    fn two_dirs() -> (tempfile::TempDir, tempfile::TempDir) {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("first.txt"), b"first").unwrap();
        fs::write(b.path().join("second.txt"), b"second").unwrap();
        (a, b)
    }

    #[test]
    fn lenient_chain_falls_through_to_later_members() {
        let (a, b) = two_dirs();
        let chain = CompositeResolver::new(
            vec![
                Box::new(FileResolver::new(a.path(), false)),
                Box::new(FileResolver::new(b.path(), false)),
            ],
            true,
        );
        let c = chain.resolve("second.txt", false).unwrap().unwrap();
        assert_eq!(c.content().as_ref(), b"second");
        assert!(chain.resolve("third.txt", false).unwrap().is_none());
    }

    #[test]
    fn strict_chain_reports_not_found() {
        let (a, b) = two_dirs();
        let chain = CompositeResolver::new(
            vec![
                Box::new(FileResolver::new(a.path(), true)),
                Box::new(FileResolver::new(b.path(), true)),
            ],
            false,
        );
        assert!(chain.resolve("first.txt", false).unwrap().is_some());
        assert!(chain.resolve("second.txt", false).unwrap().is_some());
        let e = chain.resolve("third.txt", false).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn malformed_stops_lenient_chain() {
        let (a, _b) = two_dirs();
        let chain = CompositeResolver::new(
            vec![
                Box::new(UrlResolver::new(None, true)),
                Box::new(FileResolver::new(a.path(), true)),
            ],
            true,
        );
        let e = chain.resolve("first.txt", false).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MalformedReference);
    }

    #[test]
    fn identify_uses_first_capable_member() {
        let (a, _b) = two_dirs();
        let chain = CompositeResolver::new(
            vec![
                Box::new(UrlResolver::new(None, false)),
                Box::new(FileResolver::new(a.path(), false)),
            ],
            false,
        );
        let id = chain.identify("first.txt").unwrap();
        assert!(id.ends_with("first.txt"));
        assert_eq!(chain.resolvers().len(), 2);
    }
}
