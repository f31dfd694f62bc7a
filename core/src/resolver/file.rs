/*
 * file.rs
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

//! Resolver for files on the local filesystem, relative to an optional base directory.
//!
//! Names with `..` segments may leave the base directory; no containment is enforced.

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;

use super::{absent_or_not_found, guess_content_type, require_name, ResolvedContent, ResourceResolver};
use crate::error::{EmailError, Result};
use crate::mime::is_cid;

#[derive(Debug, Clone)]
pub struct FileResolver {
    base_dir: Option<PathBuf>,
    lenient: bool,
}

impl Default for FileResolver {
    /// Base directory ".", strict.
    fn default() -> Self {
        Self::new(".", false)
    }
}

impl FileResolver {
    pub fn new(base_dir: impl Into<PathBuf>, lenient: bool) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            lenient,
        }
    }

    /// Relative names resolve against the process working directory.
    pub fn without_base_dir(lenient: bool) -> Self {
        Self {
            base_dir: None,
            lenient,
        }
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Path `name` refers to: itself if absolute, else joined onto the base directory
    /// (or the working directory when there is none).
    pub fn locate(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let base = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        base.join(path)
    }

    /// Read the file at `path`. Missing or unreadable files follow the lenient rule.
    pub fn read_path(&self, path: &Path) -> Result<Option<ResolvedContent>> {
        match read_file(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) => absent_or_not_found(self.lenient, e),
        }
    }
}

impl ResourceResolver for FileResolver {
    fn resolve(&self, name: &str, _html_context: bool) -> Result<Option<ResolvedContent>> {
        require_name(name)?;
        if is_cid(name) {
            debug!("not resolving content-id reference {}", name);
            return Ok(None);
        }
        let path = self.locate(name);
        debug!("resolving {} as file {}", name, path.display());
        self.read_path(&path)
    }

    fn identify(&self, name: &str) -> Result<String> {
        require_name(name)?;
        Ok(canonical_identity(&self.locate(name)))
    }

    fn is_lenient(&self) -> bool {
        self.lenient
    }
}

/// Read a whole file, reporting the absolute path it was looked up at on failure.
pub(crate) fn read_file(path: &Path) -> Result<ResolvedContent> {
    let identity = canonical_identity(path);
    let content = fs::read(path).map_err(|e| EmailError::not_found_caused_by(identity.clone(), e))?;
    Ok(ResolvedContent::new(guess_content_type(path), content).with_origin(identity))
}

/// Canonical path of an existing file; `NotFound` naming the path otherwise.
pub(crate) fn canonical_existing(path: &Path) -> Result<String> {
    fs::canonicalize(path)
        .map(|p| p.to_string_lossy().into_owned())
        .map_err(|e| EmailError::not_found_caused_by(path.display().to_string(), e))
}

/// Canonical absolute path as a string: resolved through the filesystem when the file exists,
/// otherwise normalised lexically.
pub(crate) fn canonical_identity(path: &Path) -> String {
    match fs::canonicalize(path) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => normalize_lexically(path).to_string_lossy().into_owned(),
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
