/*
 * base64.rs
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

//! Base64 encoder for Content-Transfer-Encoding (RFC 2045): 76-character lines, CRLF separated.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const LINE_LEN: usize = 76;

/// Append `content` base64-encoded to `out`, one CRLF-terminated line per 76 characters.
pub fn encode_lines(content: &[u8], out: &mut Vec<u8>) {
    let encoded = STANDARD.encode(content);
    for chunk in encoded.as_bytes().chunks(LINE_LEN) {
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_76() {
        let mut out = Vec::new();
        encode_lines(&[0u8; 100], &mut out);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(STANDARD.decode(lines.concat()).unwrap(), vec![0u8; 100]);
    }

    #[test]
    fn empty_content_writes_nothing() {
        let mut out = Vec::new();
        encode_lines(b"", &mut out);
        assert!(out.is_empty());
    }
}
