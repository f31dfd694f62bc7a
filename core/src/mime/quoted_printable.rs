/*
 * quoted_printable.rs
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

//! Quoted-Printable encoder for Content-Transfer-Encoding (RFC 2045).

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Maximum encoded line length, excluding CRLF.
const MAX_LINE: usize = 76;

/// Encode text as quoted-printable. Line breaks (LF or CRLF) in the input become CRLF hard breaks;
/// longer lines are split with soft breaks (=CRLF). Trailing whitespace before a break is encoded.
pub fn encode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() + src.len() / 8);
    let mut line_len = 0usize;
    let mut i = 0usize;
    while i < src.len() {
        let b = src[i];
        if b == b'\r' && src.get(i + 1) == Some(&b'\n') {
            i += 1;
            continue;
        }
        if b == b'\n' {
            out.extend_from_slice(b"\r\n");
            line_len = 0;
            i += 1;
            continue;
        }
        let at_break = match src.get(i + 1) {
            None => true,
            Some(&b'\n') => true,
            Some(&b'\r') => src.get(i + 2) == Some(&b'\n'),
            _ => false,
        };
        let literal = matches!(b, b'!'..=b'<' | b'>'..=b'~') || ((b == b' ' || b == b'\t') && !at_break);
        let width = if literal { 1 } else { 3 };
        // Keep room for the soft break '=' unless this is the last char of the line.
        let limit = if at_break { MAX_LINE } else { MAX_LINE - 1 };
        if line_len + width > limit {
            out.extend_from_slice(b"=\r\n");
            line_len = 0;
        }
        if literal {
            out.push(b);
        } else {
            out.push(b'=');
            out.push(HEX_UPPER[(b >> 4) as usize]);
            out.push(HEX_UPPER[(b & 0x0f) as usize]);
        }
        line_len += width;
        i += 1;
    }
    out
}
