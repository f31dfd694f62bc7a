/*
 * html_email.rs
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

//! HTML email under construction: addresses, bodies, attachments and embedded inline resources.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};
use url::Url;

use super::attachment::Attachment;
use super::build_mime::{build_rfc822, BuiltMessage, MessageParts};
use super::html_references::{find_references, rewrite_references};
use crate::embedding::{DataSource, EmbeddingRegistry, ResourceReference};
use crate::error::{EmailError, Result};
use crate::mime::{ContentID, EmailAddress};
use crate::resolver::{ResourceResolver, UrlResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unbuilt,
    Built,
}

/// An HTML email. Embeds are only accepted before [`build`](Self::build), which may run once.
///
/// One instance is meant for one writer; callers embedding from several threads must serialise
/// access themselves.
#[derive(Debug)]
pub struct HtmlEmail {
    from: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    cc: Vec<EmailAddress>,
    bcc: Vec<EmailAddress>,
    reply_to: Vec<EmailAddress>,
    subject: Option<String>,
    text_msg: Option<String>,
    html_msg: Option<String>,
    attachments: Vec<Attachment>,
    registry: EmbeddingRegistry,
    resolver: Option<Box<dyn ResourceResolver>>,
    default_resolver: UrlResolver,
    state: BuildState,
}

impl Default for HtmlEmail {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlEmail {
    pub fn new() -> Self {
        Self::with_registry(EmbeddingRegistry::new())
    }

    /// Use `registry` (e.g. one with a deterministic content-id generator).
    pub fn with_registry(registry: EmbeddingRegistry) -> Self {
        let default_resolver = registry.url_resolver().clone();
        Self {
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            subject: None,
            text_msg: None,
            html_msg: None,
            attachments: Vec::new(),
            registry,
            resolver: None,
            default_resolver,
            state: BuildState::Unbuilt,
        }
    }

    pub fn set_from(&mut self, address: &str) -> Result<&mut Self> {
        self.from = Some(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_to(&mut self, address: &str) -> Result<&mut Self> {
        self.to.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_cc(&mut self, address: &str) -> Result<&mut Self> {
        self.cc.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_bcc(&mut self, address: &str) -> Result<&mut Self> {
        self.bcc.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn add_reply_to(&mut self, address: &str) -> Result<&mut Self> {
        self.reply_to.push(EmailAddress::parse(address)?);
        Ok(self)
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn set_text_msg(&mut self, text: impl Into<String>) -> Result<&mut Self> {
        self.text_msg = Some(non_empty(text.into())?);
        Ok(self)
    }

    pub fn set_html_msg(&mut self, html: impl Into<String>) -> Result<&mut Self> {
        self.html_msg = Some(non_empty(html.into())?);
        Ok(self)
    }

    /// Set the text body and an HTML rendition of it (escaped, inside `<pre>`).
    pub fn set_msg(&mut self, text: impl Into<String>) -> Result<&mut Self> {
        let text = non_empty(text.into())?;
        let html = format!(
            "<html><body><pre>{}</pre></body></html>",
            html_escape::encode_text(&text)
        );
        self.text_msg = Some(text);
        self.html_msg = Some(html);
        Ok(self)
    }

    pub fn attach(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    /// Resolver for [`embed_resource`](Self::embed_resource) and for references found in the HTML
    /// body at build time.
    pub fn set_resolver(&mut self, resolver: Box<dyn ResourceResolver>) -> &mut Self {
        self.resolver = Some(resolver);
        self
    }

    /// Resolver for URL references and, without a resolver set, for named ones. Carries the
    /// network timeout and proxy settings.
    pub fn set_url_resolver(&mut self, resolver: UrlResolver) -> &mut Self {
        self.registry.set_url_resolver(resolver.clone());
        self.default_resolver = resolver;
        self
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn text_msg(&self) -> Option<&str> {
        self.text_msg.as_deref()
    }

    pub fn html_msg(&self) -> Option<&str> {
        self.html_msg.as_deref()
    }

    pub fn registry(&self) -> &EmbeddingRegistry {
        &self.registry
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Embed `reference` under `name`; returns the content id to use as `cid:<id>` in the HTML.
    pub fn embed(
        &mut self,
        reference: impl Into<ResourceReference>,
        name: &str,
        cid: Option<&str>,
    ) -> Result<String> {
        self.ensure_unbuilt()?;
        let resolver = active_resolver(&self.resolver, &self.default_resolver);
        self.registry.embed(reference.into(), name, cid, resolver, false)
    }

    /// As [`embed`](Self::embed), but a resource that resolves to absent yields `Ok(None)`.
    pub fn embed_optional(
        &mut self,
        reference: impl Into<ResourceReference>,
        name: &str,
        cid: Option<&str>,
    ) -> Result<Option<String>> {
        self.ensure_unbuilt()?;
        let resolver = active_resolver(&self.resolver, &self.default_resolver);
        self.registry
            .embed_optional(reference.into(), name, cid, resolver, false)
    }

    pub fn embed_url(&mut self, url: &Url, name: &str) -> Result<String> {
        self.embed(url.clone(), name, None)
    }

    /// Embed a file under its file name.
    pub fn embed_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let name = file_name(path)?;
        self.embed(path, &name, None)
    }

    /// Embed a file under its file name with a caller-chosen content id.
    pub fn embed_file_with_cid(&mut self, path: impl AsRef<Path>, cid: &str) -> Result<String> {
        let path = path.as_ref();
        let name = file_name(path)?;
        self.embed(path, &name, Some(cid))
    }

    pub fn embed_data(&mut self, data: DataSource, name: &str) -> Result<String> {
        self.embed(data, name, None)
    }

    pub fn embed_data_with_cid(&mut self, data: DataSource, name: &str, cid: &str) -> Result<String> {
        self.embed(data, name, Some(cid))
    }

    /// Embed whatever `location` resolves to through the configured resolver; without one,
    /// `location` must be an absolute URL.
    pub fn embed_resource(&mut self, location: &str, name: &str) -> Result<String> {
        self.embed(ResourceReference::Named(location.to_string()), name, None)
    }

    /// Embed every `<img src>` and `<script src>` reference in the HTML body that the configured
    /// resolver can find, and point the markup at the inline parts. Unresolved references are left
    /// as they are. Returns the number of references rewritten.
    ///
    /// The batch is all-or-nothing: if any reference fails, embeds made by this call are dropped
    /// and the HTML body is left untouched.
    pub fn embed_html_references(&mut self) -> Result<usize> {
        self.ensure_unbuilt()?;
        let html = match &self.html_msg {
            Some(h) => h.clone(),
            None => return Ok(0),
        };
        let resolver = active_resolver(&self.resolver, &self.default_resolver);
        let mark = self.registry.len();
        let mut replacements = HashMap::new();
        for location in find_references(&html) {
            let reference = ResourceReference::Named(location.clone());
            let embedded = self
                .registry
                .embed_optional(reference, &location, None, resolver, true);
            match embedded {
                Ok(Some(cid)) => {
                    replacements.insert(location, ContentID::new(cid).to_url());
                }
                Ok(None) => warn!("leaving unresolved reference {} in HTML body", location),
                Err(e) => {
                    self.registry.truncate(mark);
                    return Err(e);
                }
            }
        }
        if !replacements.is_empty() {
            self.html_msg = Some(rewrite_references(&html, &replacements));
        }
        Ok(replacements.len())
    }

    /// Assemble the message. Runs once: a second call fails with `BuildAlreadyFinalized`.
    /// With a resolver configured, references in the HTML body are embedded first.
    pub fn build(&mut self) -> Result<BuiltMessage> {
        self.ensure_unbuilt()?;
        let from = self
            .from
            .as_ref()
            .ok_or_else(|| EmailError::InvalidMessage("From address required".into()))?;
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(EmailError::InvalidMessage(
                "at least one receiver address required".into(),
            ));
        }
        let from = from.clone();
        if self.resolver.is_some() {
            self.embed_html_references()?;
        }
        let built = build_rfc822(&MessageParts {
            from: &from,
            to: &self.to,
            cc: &self.cc,
            bcc: &self.bcc,
            reply_to: &self.reply_to,
            subject: self.subject.as_deref(),
            body_plain: self.text_msg.as_deref(),
            body_html: self.html_msg.as_deref(),
            inline: self.registry.entries(),
            attachments: &self.attachments,
        });
        self.state = BuildState::Built;
        info!(
            "built message: {} bytes, {} inline parts, {} attachments",
            built.as_bytes().len(),
            self.registry.len(),
            self.attachments.len()
        );
        Ok(built)
    }

    fn ensure_unbuilt(&self) -> Result<()> {
        match self.state {
            BuildState::Unbuilt => Ok(()),
            BuildState::Built => Err(EmailError::BuildAlreadyFinalized),
        }
    }
}

fn active_resolver<'a>(
    configured: &'a Option<Box<dyn ResourceResolver>>,
    fallback: &'a UrlResolver,
) -> &'a dyn ResourceResolver {
    match configured {
        Some(r) => r.as_ref(),
        None => fallback,
    }
}

fn non_empty(s: String) -> Result<String> {
    if s.is_empty() {
        return Err(EmailError::InvalidMessage("message body must not be empty".into()));
    }
    Ok(s)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| EmailError::invalid(format!("{} has no file name", path.display())))
}
