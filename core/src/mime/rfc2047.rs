/*
 * rfc2047.rs
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

//! RFC 2047 encoded-word encoding (=?UTF-8?B?...?=) for non-ASCII header text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// An encoded-word may be at most 75 characters; "=?UTF-8?B?" + "?=" leaves 63 for payload.
const MAX_PAYLOAD_CHARS: usize = 63;

/// Encode an unstructured header value. ASCII-only printable text is returned unchanged;
/// otherwise the value becomes one or more B encoded-words separated by single spaces.
pub fn encode_header_value(value: &str) -> String {
    if value.bytes().all(|b| (0x20..0x7f).contains(&b) || b == b'\t') {
        return value.to_string();
    }
    // 63 base64 chars hold 45 bytes (rounded down to a multiple of 3); never split a UTF-8 sequence.
    let max_bytes = MAX_PAYLOAD_CHARS / 4 * 3;
    let mut words = Vec::new();
    let mut start = 0usize;
    let mut end = 0usize;
    for (idx, ch) in value.char_indices() {
        let next = idx + ch.len_utf8();
        if next - start > max_bytes {
            words.push(encode_word(&value[start..end]));
            start = end;
        }
        end = next;
    }
    if start < value.len() {
        words.push(encode_word(&value[start..]));
    }
    words.join(" ")
}

fn encode_word(chunk: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}
