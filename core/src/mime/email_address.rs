/*
 * email_address.rs
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

//! RFC 5322 email address (mailbox) for From, To, Cc, Bcc and Reply-To.

use crate::error::{EmailError, Result};

use super::rfc2047::encode_header_value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub display_name: Option<String>,
    pub local_part: String,
    pub domain: String,
}

impl EmailAddress {
    pub fn new(
        display_name: Option<impl Into<String>>,
        local_part: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.map(|s| s.into()),
            local_part: local_part.into(),
            domain: domain.into(),
        }
    }

    /// Parse `local@domain` or `Display Name <local@domain>`.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(EmailError::InvalidMessage("empty address".into()));
        }
        let (display_name, addr) = match (value.rfind('<'), value.ends_with('>')) {
            (Some(lt), true) => {
                let dn = value[..lt].trim().trim_matches('"').trim();
                let dn = if dn.is_empty() { None } else { Some(dn.to_string()) };
                (dn, &value[lt + 1..value.len() - 1])
            }
            _ => (None, value),
        };
        let at = addr
            .rfind('@')
            .ok_or_else(|| EmailError::InvalidMessage(format!("address without domain: {}", value)))?;
        let local = addr[..at].trim();
        let domain = addr[at + 1..].trim();
        if local.is_empty() || domain.is_empty() || local.contains(char::is_whitespace) {
            return Err(EmailError::InvalidMessage(format!("invalid address: {}", value)));
        }
        Ok(Self::new(display_name, local, domain))
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Full mailbox address: local-part@domain.
    pub fn address(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }

    /// Envelope address for SMTP (same as address).
    pub fn envelope_address(&self) -> String {
        self.address()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_mailbox(self.display_name(), &self.local_part, &self.domain))
    }
}

/// Format a mailbox for RFC 5322 headers. Display names with specials are quoted,
/// non-ASCII display names become encoded-words.
pub fn format_mailbox(display_name: Option<&str>, local_part: &str, domain: &str) -> String {
    let addr = if domain.is_empty() {
        local_part.to_string()
    } else {
        format!("{}@{}", local_part, domain)
    };
    match display_name {
        Some(dn) if !dn.is_empty() => format!("{} <{}>", format_display_name(dn), addr),
        _ => format!("<{}>", addr),
    }
}

fn format_display_name(dn: &str) -> String {
    if !dn.is_ascii() {
        return encode_header_value(dn);
    }
    let needs_quote = dn.chars().any(|c| "()<>[]:;@\\,.\"".contains(c));
    if needs_quote {
        format!("\"{}\"", dn.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        dn.to_string()
    }
}
