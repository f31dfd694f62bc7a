/*
 * config.rs
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

//! Declarative resolver configuration. All XML read/write uses the quick_xml reader/writer.
//!
//! ```xml
//! <resolvers lenient="true">
//!   <file base-dir="./resources" lenient="true"/>
//!   <url base-url="http://example.org/" lenient="false" timeout-ms="5000"/>
//! </resolvers>
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use url::Url;

use crate::error::{EmailError, Result};
use crate::resolver::{CompositeResolver, FileResolver, ResourceResolver, UrlResolver, DEFAULT_TIMEOUT};

/// One configured resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverSpec {
    File {
        base_dir: Option<PathBuf>,
        lenient: bool,
    },
    Url {
        base_url: Option<Url>,
        lenient: bool,
        timeout: Duration,
    },
}

impl ResolverSpec {
    pub fn build(&self) -> Box<dyn ResourceResolver> {
        match self {
            ResolverSpec::File { base_dir: Some(dir), lenient } => Box::new(FileResolver::new(dir.clone(), *lenient)),
            ResolverSpec::File { base_dir: None, lenient } => Box::new(FileResolver::without_base_dir(*lenient)),
            ResolverSpec::Url { base_url, lenient, timeout } => {
                Box::new(UrlResolver::new(base_url.clone(), *lenient).with_timeout(*timeout))
            }
        }
    }
}

/// Ordered resolver chain. `lenient` applies to the chain as a whole when it has more than one member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolverConfig {
    pub resolvers: Vec<ResolverSpec>,
    pub lenient: bool,
}

impl ResolverConfig {
    /// A single resolver, or a [`CompositeResolver`] trying each in order.
    pub fn into_resolver(self) -> Result<Box<dyn ResourceResolver>> {
        match self.resolvers.len() {
            0 => Err(EmailError::Config("no resolvers configured".into())),
            1 => Ok(self.resolvers[0].build()),
            _ => {
                let members = self.resolvers.iter().map(ResolverSpec::build).collect();
                Ok(Box::new(CompositeResolver::new(members, self.lenient)))
            }
        }
    }

    /// The first configured URL resolver, for fetching URL references with its timeout.
    pub fn url_resolver(&self) -> Option<UrlResolver> {
        self.resolvers.iter().find_map(|spec| match spec {
            ResolverSpec::Url { base_url, lenient, timeout } => {
                Some(UrlResolver::new(base_url.clone(), *lenient).with_timeout(*timeout))
            }
            ResolverSpec::File { .. } => None,
        })
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut writer = Writer::new_with_indent(&mut out, b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        let mut root = BytesStart::new("resolvers");
        root.push_attribute(("lenient", bool_str(self.lenient)));
        writer.write_event(Event::Start(root)).map_err(xml_error)?;
        for spec in &self.resolvers {
            let element = match spec {
                ResolverSpec::File { base_dir, lenient } => {
                    let mut e = BytesStart::new("file");
                    if let Some(dir) = base_dir {
                        e.push_attribute(("base-dir", dir.to_string_lossy().as_ref()));
                    }
                    e.push_attribute(("lenient", bool_str(*lenient)));
                    e
                }
                ResolverSpec::Url { base_url, lenient, timeout } => {
                    let mut e = BytesStart::new("url");
                    if let Some(url) = base_url {
                        e.push_attribute(("base-url", url.as_str()));
                    }
                    e.push_attribute(("lenient", bool_str(*lenient)));
                    e.push_attribute(("timeout-ms", timeout.as_millis().to_string().as_str()));
                    e
                }
            };
            writer.write_event(Event::Empty(element)).map_err(xml_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("resolvers")))
            .map_err(xml_error)?;
        Ok(out)
    }
}

pub fn load_resolver_config(path: impl AsRef<Path>) -> Result<ResolverConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| EmailError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loading resolver configuration from {}", path.display());
    parse_resolver_config(&content)
}

/// Parse `<resolvers>` containing `<file>` and `<url>` elements, in order.
pub fn parse_resolver_config(content: &str) -> Result<ResolverConfig> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut state = ParseState::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(EmailError::Config(format!("XML parse error: {}", e))),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => state.open(&e, true)?,
            Ok(Event::Empty(e)) => state.open(&e, false)?,
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"resolvers" {
                    state.in_root = false;
                }
            }
            Ok(Event::Text(_)) => {
                return Err(EmailError::Config("unexpected text content".into()));
            }
            _ => {}
        }
        buf.clear();
    }
    if !state.seen_root {
        return Err(EmailError::Config("missing <resolvers> element".into()));
    }
    Ok(state.config)
}

#[derive(Default)]
struct ParseState {
    config: ResolverConfig,
    in_root: bool,
    seen_root: bool,
}

impl ParseState {
    fn open(&mut self, e: &BytesStart<'_>, has_children: bool) -> Result<()> {
        let name = e.name();
        match name.as_ref() {
            b"resolvers" if !self.seen_root => {
                self.seen_root = true;
                self.in_root = has_children;
                for (key, value) in attribute_pairs(e.attributes())? {
                    match key.as_str() {
                        "lenient" => self.config.lenient = parse_bool(&key, &value)?,
                        _ => return Err(unknown_attribute("resolvers", &key)),
                    }
                }
            }
            b"file" if self.in_root => self.config.resolvers.push(parse_file(e.attributes())?),
            b"url" if self.in_root => self.config.resolvers.push(parse_url(e.attributes())?),
            other => {
                return Err(EmailError::Config(format!(
                    "unexpected element <{}>",
                    String::from_utf8_lossy(other)
                )))
            }
        }
        Ok(())
    }
}

fn parse_file(attributes: Attributes<'_>) -> Result<ResolverSpec> {
    let mut base_dir = None;
    let mut lenient = false;
    for (key, value) in attribute_pairs(attributes)? {
        match key.as_str() {
            "base-dir" => base_dir = Some(PathBuf::from(value)),
            "lenient" => lenient = parse_bool(&key, &value)?,
            _ => return Err(unknown_attribute("file", &key)),
        }
    }
    Ok(ResolverSpec::File { base_dir, lenient })
}

fn parse_url(attributes: Attributes<'_>) -> Result<ResolverSpec> {
    let mut base_url = None;
    let mut lenient = false;
    let mut timeout = DEFAULT_TIMEOUT;
    for (key, value) in attribute_pairs(attributes)? {
        match key.as_str() {
            "base-url" => {
                let url = Url::parse(&value)
                    .map_err(|e| EmailError::Config(format!("base-url {:?}: {}", value, e)))?;
                base_url = Some(url);
            }
            "lenient" => lenient = parse_bool(&key, &value)?,
            "timeout-ms" => {
                let ms: u64 = value
                    .parse()
                    .map_err(|_| EmailError::Config(format!("timeout-ms {:?} is not a number", value)))?;
                timeout = Duration::from_millis(ms);
            }
            _ => return Err(unknown_attribute("url", &key)),
        }
    }
    Ok(ResolverSpec::Url {
        base_url,
        lenient,
        timeout,
    })
}

fn attribute_pairs(attributes: Attributes<'_>) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for attr in attributes {
        let attr = attr.map_err(|e| EmailError::Config(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| EmailError::Config(e.to_string()))?
            .trim()
            .to_string();
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(EmailError::Config(format!("{} {:?} is not a boolean", key, value))),
    }
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

fn unknown_attribute(element: &str, key: &str) -> EmailError {
    EmailError::Config(format!("unknown attribute {} on <{}>", key, element))
}

fn xml_error(e: impl std::fmt::Display) -> EmailError {
    EmailError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<resolvers lenient="true">
  <file base-dir="./resources" lenient="true"/>
  <url base-url="http://example.org/" lenient="false" timeout-ms="5000"/>
</resolvers>"#;

    #[test]
    fn parses_ordered_resolvers() {
        let config = parse_resolver_config(SAMPLE).unwrap();
        assert!(config.lenient);
        assert_eq!(
            config.resolvers,
            vec![
                ResolverSpec::File {
                    base_dir: Some(PathBuf::from("./resources")),
                    lenient: true,
                },
                ResolverSpec::Url {
                    base_url: Some(Url::parse("http://example.org/").unwrap()),
                    lenient: false,
                    timeout: Duration::from_millis(5000),
                },
            ]
        );
    }

    #[test]
    fn defaults_apply_to_missing_attributes() {
        let config = parse_resolver_config("<resolvers><url/></resolvers>").unwrap();
        assert!(!config.lenient);
        assert_eq!(
            config.resolvers,
            vec![ResolverSpec::Url {
                base_url: None,
                lenient: false,
                timeout: DEFAULT_TIMEOUT,
            }]
        );
    }

    #[test]
    fn url_resolver_carries_configured_timeout() {
        let config = parse_resolver_config(SAMPLE).unwrap();
        let url = config.url_resolver().unwrap();
        assert_eq!(url.timeout(), Duration::from_millis(5000));
        assert_eq!(url.base_url().map(Url::as_str), Some("http://example.org/"));
        let files_only = parse_resolver_config("<resolvers><file/></resolvers>").unwrap();
        assert!(files_only.url_resolver().is_none());
    }

    #[test]
    fn rejects_unknown_elements_and_bad_values() {
        for xml in [
            "<resolvers><ftp/></resolvers>",
            "<resolvers><file lenient=\"maybe\"/></resolvers>",
            "<resolvers><url timeout-ms=\"soon\"/></resolvers>",
            "<resolvers><url base-url=\"not a url\"/></resolvers>",
            "<resolvers><file colour=\"red\"/></resolvers>",
            "<file/>",
            "",
        ] {
            let e = parse_resolver_config(xml).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::Config, "{}", xml);
        }
    }

    #[test]
    fn empty_chain_cannot_become_resolver() {
        let config = parse_resolver_config("<resolvers/>").unwrap();
        assert_eq!(config.into_resolver().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn single_entry_keeps_its_leniency() {
        let config = parse_resolver_config("<resolvers><file base-dir=\".\" lenient=\"true\"/></resolvers>").unwrap();
        let resolver = config.into_resolver().unwrap();
        assert!(resolver.is_lenient());
        assert!(resolver.resolve("no-such-file.gif", false).unwrap().is_none());
    }

    #[test]
    fn written_xml_reads_back() {
        let config = parse_resolver_config(SAMPLE).unwrap();
        let xml = config.to_xml().unwrap();
        let again = parse_resolver_config(std::str::from_utf8(&xml).unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn load_reports_missing_file_as_io() {
        let dir = tempfile::tempdir().unwrap();
        let e = load_resolver_config(dir.path().join("resolvers.xml")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Io);
    }
}
