/*
 * url.rs
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

//! Resolver for URLs: absolute `http`, `https` and `file` URLs, or names relative to a base URL.

use std::time::Duration;

use log::debug;
use once_cell::sync::OnceCell;
use url::{ParseError, Url};

use super::file::read_file;
use super::{absent_or_not_found, guess_content_type, require_name, ResolvedContent, ResourceResolver};
use crate::error::{EmailError, Result};
use crate::mime::is_cid;

/// Transport timeout for network fetches unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct UrlResolver {
    base_url: Option<Url>,
    lenient: bool,
    timeout: Duration,
    use_proxy: bool,
    client: OnceCell<reqwest::blocking::Client>,
}

impl UrlResolver {
    pub fn new(base_url: Option<Url>, lenient: bool) -> Self {
        Self {
            base_url,
            lenient,
            timeout: DEFAULT_TIMEOUT,
            use_proxy: true,
            client: OnceCell::new(),
        }
    }

    /// Parse `base_url` and build a resolver on it.
    pub fn with_base(base_url: &str, lenient: bool) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| EmailError::malformed(base_url, e.to_string()))?;
        Ok(Self::new(Some(base), lenient))
    }

    /// Timeout applied to the whole network request (connect, headers and body).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect directly, ignoring proxies from the environment.
    pub fn without_proxy(mut self) -> Self {
        self.use_proxy = false;
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL `name` resolves against, without I/O. Absolute URLs are taken as they are;
    /// relative names (with `&amp;` decoded) are joined onto the base URL.
    pub fn create_url(&self, name: &str) -> Result<Url> {
        require_name(name)?;
        match Url::parse(name) {
            Ok(url) => Ok(url),
            Err(ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(&name.replace("&amp;", "&"))
                    .map_err(|e| EmailError::malformed(name, e.to_string())),
                None => Err(EmailError::malformed(name, "no protocol")),
            },
            Err(e) => Err(EmailError::malformed(name, e.to_string())),
        }
    }

    /// Fetch an absolute URL. `cid:` URLs are absent; fetch failures follow the lenient rule;
    /// schemes other than http, https and file are malformed.
    pub fn resolve_url(&self, url: &Url) -> Result<Option<ResolvedContent>> {
        if url.scheme().eq_ignore_ascii_case("cid") {
            return Ok(None);
        }
        match self.fetch(url) {
            Ok(content) => Ok(Some(content)),
            Err(e) => absent_or_not_found(self.lenient, e),
        }
    }

    fn fetch(&self, url: &Url) -> Result<ResolvedContent> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| EmailError::malformed(url.as_str(), "not a local file URL"))?;
                let content = read_file(&path)?;
                Ok(ResolvedContent::new(content.content_type().to_string(), content.content().clone())
                    .with_origin(url.as_str()))
            }
            "http" | "https" => self.fetch_http(url),
            other => Err(EmailError::malformed(url.as_str(), format!("unsupported scheme {}", other))),
        }
    }

    fn fetch_http(&self, url: &Url) -> Result<ResolvedContent> {
        let client = self
            .client
            .get_or_try_init(|| {
                let builder = reqwest::blocking::Client::builder().timeout(self.timeout);
                let builder = if self.use_proxy { builder } else { builder.no_proxy() };
                builder.build()
            })
            .map_err(|e| EmailError::not_found_caused_by(url.as_str(), e))?;
        debug!("GET {}", url);
        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| EmailError::not_found_caused_by(url.as_str(), e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmailError::not_found(format!("{} (HTTP {})", url, status.as_u16())));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| guess_content_type(url.path()));
        let body = response
            .bytes()
            .map_err(|e| EmailError::not_found_caused_by(url.as_str(), e))?;
        Ok(ResolvedContent::new(content_type, body).with_origin(url.as_str()))
    }
}

impl ResourceResolver for UrlResolver {
    fn resolve(&self, name: &str, _html_context: bool) -> Result<Option<ResolvedContent>> {
        require_name(name)?;
        if is_cid(name) {
            debug!("not resolving content-id reference {}", name);
            return Ok(None);
        }
        let url = self.create_url(name)?;
        debug!("resolving {} as {}", name, url);
        self.resolve_url(&url)
    }

    fn identify(&self, name: &str) -> Result<String> {
        Ok(self.create_url(name)?.to_string())
    }

    fn is_lenient(&self) -> bool {
        self.lenient
    }
}
