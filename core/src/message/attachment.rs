/*
 * attachment.rs
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

//! Regular (non-inline) attachments.

use std::path::Path;

use bytes::Bytes;

use crate::error::{EmailError, Result};
use crate::resolver::guess_content_type;

/// Attachment (filename, MIME type, content), sent with `Content-Disposition: attachment`.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: Option<String>,
    pub mime_type: String,
    pub content: Bytes,
}

impl Attachment {
    pub fn new(filename: Option<String>, mime_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename,
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    /// Read a file; filename and MIME type come from the path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)
            .map_err(|e| EmailError::not_found_caused_by(path.display().to_string(), e))?;
        Ok(Self::new(
            path.file_name().map(|n| n.to_string_lossy().into_owned()),
            guess_content_type(path),
            content,
        ))
    }
}
