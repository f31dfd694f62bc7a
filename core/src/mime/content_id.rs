/*
 * content_id.rs
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

//! Content-ID (RFC 2045) and the `cid:` URL form that references it from HTML (RFC 2392).

use super::utils::encode_url;

/// Scheme prefix of a content-id URL.
pub const CID_SCHEME: &str = "cid:";

/// Content identifier of an inline part. Holds the bare token; the header form adds angle brackets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentID {
    token: String,
}

impl ContentID {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Form used in markup: `cid:` followed by the URL-encoded token.
    pub fn to_url(&self) -> String {
        cid_url(&self.token)
    }
}

impl std::fmt::Display for ContentID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.token)
    }
}

/// True if `reference` uses the `cid:` scheme (case-insensitive).
pub fn is_cid(reference: &str) -> bool {
    reference
        .get(..CID_SCHEME.len())
        .map_or(false, |p| p.eq_ignore_ascii_case(CID_SCHEME))
}

/// Compose `cid:<token>` for use in an HTML attribute.
pub fn cid_url(token: &str) -> String {
    format!("{}{}", CID_SCHEME, encode_url(token))
}
