/*
 * build_mime.rs
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

//! Build RFC 5322 / MIME bytes for an HTML email: body alternatives, inline parts, attachments.
//!
//! Layout, each level present only when needed:
//! multipart/mixed ⊃ multipart/related ⊃ multipart/alternative ⊃ text/plain + text/html,
//! inline parts inside related, attachments inside mixed.

use std::fs;
use std::path::Path;

use chrono::Local;

use super::attachment::Attachment;
use crate::embedding::EmbeddingEntry;
use crate::error::{EmailError, Result};
use crate::mime::{
    base64_encode_lines, encode_header_value, format_mailbox, new_boundary, quote_parameter,
    quoted_printable_encode, replace_end_of_line_characters_with_spaces, ContentID, EmailAddress,
};

/// Borrowed view of a composed message, ready for serialisation.
pub(crate) struct MessageParts<'a> {
    pub from: &'a EmailAddress,
    pub to: &'a [EmailAddress],
    pub cc: &'a [EmailAddress],
    pub bcc: &'a [EmailAddress],
    pub reply_to: &'a [EmailAddress],
    pub subject: Option<&'a str>,
    pub body_plain: Option<&'a str>,
    pub body_html: Option<&'a str>,
    pub inline: &'a [EmbeddingEntry],
    pub attachments: &'a [Attachment],
}

/// Wire bytes of a built message plus its SMTP envelope.
#[derive(Debug, Clone)]
pub struct BuiltMessage {
    bytes: Vec<u8>,
    sender: String,
    recipients: Vec<String>,
}

impl BuiltMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Envelope sender (MAIL FROM).
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Envelope recipients (RCPT TO): To, Cc and Bcc.
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Write the message to `path`, creating missing parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| EmailError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, &self.bytes).map_err(|source| EmailError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Serialise `parts`. Bcc recipients go to the envelope only.
pub(crate) fn build_rfc822(parts: &MessageParts<'_>) -> BuiltMessage {
    let mut out = Vec::new();

    append_address_header(&mut out, "From", std::slice::from_ref(parts.from));
    append_address_header(&mut out, "To", parts.to);
    append_address_header(&mut out, "Cc", parts.cc);
    append_address_header(&mut out, "Reply-To", parts.reply_to);
    if let Some(s) = parts.subject {
        append_header(&mut out, "Subject", &encode_header_value(s));
    }
    append_header(&mut out, "Date", &Local::now().to_rfc2822());
    append_header(&mut out, "MIME-Version", "1.0");

    if parts.attachments.is_empty() {
        append_related_or_body(&mut out, parts);
    } else {
        let boundary = new_boundary("mix");
        append_multipart_header(&mut out, "mixed", &boundary, None);
        open_part(&mut out, &boundary);
        append_related_or_body(&mut out, parts);
        for att in parts.attachments {
            open_part(&mut out, &boundary);
            append_attachment_part(&mut out, att);
        }
        close_multipart(&mut out, &boundary);
    }

    let recipients = parts
        .to
        .iter()
        .chain(parts.cc)
        .chain(parts.bcc)
        .map(EmailAddress::envelope_address)
        .collect();
    BuiltMessage {
        bytes: out,
        sender: parts.from.envelope_address(),
        recipients,
    }
}

fn append_address_header(out: &mut Vec<u8>, name: &str, addrs: &[EmailAddress]) {
    if addrs.is_empty() {
        return;
    }
    let values: Vec<String> = addrs
        .iter()
        .map(|a| format_mailbox(a.display_name(), a.local_part(), a.domain()))
        .collect();
    append_header(out, name, &values.join(", "));
}

fn append_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(replace_end_of_line_characters_with_spaces(value).as_bytes());
    out.extend_from_slice(b"\r\n");
}

fn append_multipart_header(out: &mut Vec<u8>, subtype: &str, boundary: &str, related_type: Option<&str>) {
    let mut value = format!("multipart/{}; boundary=\"{}\"", subtype, boundary);
    if let Some(t) = related_type {
        value.push_str(&format!("; type=\"{}\"", t));
    }
    append_header(out, "Content-Type", &value);
    out.extend_from_slice(b"\r\n");
}

fn open_part(out: &mut Vec<u8>, boundary: &str) {
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"\r\n");
}

fn close_multipart(out: &mut Vec<u8>, boundary: &str) {
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"--\r\n");
}

fn append_related_or_body(out: &mut Vec<u8>, parts: &MessageParts<'_>) {
    if parts.inline.is_empty() {
        append_body_parts(out, parts);
        return;
    }
    let boundary = new_boundary("rel");
    let root_type = match (parts.body_plain, parts.body_html) {
        (Some(_), Some(_)) => "multipart/alternative",
        (None, Some(_)) => "text/html",
        _ => "text/plain",
    };
    append_multipart_header(out, "related", &boundary, Some(root_type));
    open_part(out, &boundary);
    append_body_parts(out, parts);
    for entry in parts.inline {
        open_part(out, &boundary);
        append_inline_part(out, entry);
    }
    close_multipart(out, &boundary);
}

fn append_body_parts(out: &mut Vec<u8>, parts: &MessageParts<'_>) {
    match (parts.body_plain, parts.body_html) {
        (Some(plain), Some(html)) => {
            let boundary = new_boundary("alt");
            append_multipart_header(out, "alternative", &boundary, None);
            open_part(out, &boundary);
            append_text_part(out, "plain", plain);
            open_part(out, &boundary);
            append_text_part(out, "html", html);
            close_multipart(out, &boundary);
        }
        (None, Some(html)) => append_text_part(out, "html", html),
        (Some(plain), None) => append_text_part(out, "plain", plain),
        (None, None) => append_text_part(out, "plain", ""),
    }
}

fn append_text_part(out: &mut Vec<u8>, subtype: &str, body: &str) {
    append_header(out, "Content-Type", &format!("text/{}; charset=utf-8", subtype));
    append_header(out, "Content-Transfer-Encoding", "quoted-printable");
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&quoted_printable_encode(body.as_bytes()));
    out.extend_from_slice(b"\r\n");
}

fn append_inline_part(out: &mut Vec<u8>, entry: &EmbeddingEntry) {
    let name = quote_parameter(&encode_header_value(entry.file_name()));
    let content = entry.content();
    append_header(
        out,
        "Content-Type",
        &format!("{}; name={}", content.content_type(), name),
    );
    append_header(out, "Content-Transfer-Encoding", "base64");
    append_header(out, "Content-Disposition", &format!("inline; filename={}", name));
    append_header(out, "Content-ID", &ContentID::new(entry.content_id()).to_string());
    out.extend_from_slice(b"\r\n");
    base64_encode_lines(content.content(), out);
}

fn append_attachment_part(out: &mut Vec<u8>, att: &Attachment) {
    append_header(out, "Content-Type", &att.mime_type);
    match att.filename {
        Some(ref name) => append_header(
            out,
            "Content-Disposition",
            &format!("attachment; filename={}", quote_parameter(&encode_header_value(name))),
        ),
        None => append_header(out, "Content-Disposition", "attachment"),
    }
    append_header(out, "Content-Transfer-Encoding", "base64");
    out.extend_from_slice(b"\r\n");
    base64_encode_lines(&att.content, out);
}
