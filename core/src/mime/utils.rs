/*
 * utils.rs
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

//! MIME building utilities (RFC 2045 token, RFC 2046 boundary, URL-encoding, header sanitising).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;

/// Characters left as-is by [`encode_url`]: alphanumerics plus these marks.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*')
    .remove(b'+')
    .remove(b'$')
    .remove(b'!')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b'@');

/// Checks if a character is valid in an RFC 2045 token.
#[inline]
pub fn is_token_char(c: u8) -> bool {
    matches!(c,
        b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' |
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'{' | b'|' | b'}' | b'~'
    )
}

/// Checks if the string is a valid RFC 2045 token (1+ token chars).
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

/// Checks if a character is valid in a MIME boundary (RFC 2046).
#[inline]
pub fn is_boundary_char(c: u8) -> bool {
    matches!(c,
        b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' |
        b'\'' | b'(' | b')' | b'+' | b'_' | b',' | b'-' | b'.' |
        b'/' | b':' | b'=' | b'?'
    )
}

/// Validates MIME boundary: 1-70 chars from boundary set (RFC 2046).
pub fn is_valid_boundary(boundary: &str) -> bool {
    let b = boundary.as_bytes();
    (1..=70).contains(&b.len()) && b.iter().copied().all(is_boundary_char)
}

/// Fresh multipart boundary with the given prefix (e.g. "rel"). Always passes [`is_valid_boundary`].
pub fn new_boundary(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let tail: String = (0..24)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect();
    format!("=_{}_{}", prefix, tail)
}

/// Format a parameter value: bare if it is a token, otherwise a quoted-string.
pub fn quote_parameter(value: &str) -> String {
    if is_token(value) {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Percent-encode (UTF-8, upper-case hex) everything but alphanumerics and `-_.*+$!'(),@`.
pub fn encode_url(input: &str) -> String {
    utf8_percent_encode(input, URL_SAFE).to_string()
}

/// Replace each CR and each LF with a space so a value cannot break out of its header line.
pub fn replace_end_of_line_characters_with_spaces(input: &str) -> String {
    input.replace(&['\r', '\n'][..], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_url_matches_safe_set() {
        assert_eq!(encode_url(""), "");
        assert_eq!(encode_url("abcdefg"), "abcdefg");
        assert_eq!(encode_url("0123456789"), "0123456789");
        assert_eq!(encode_url("Test CID"), "Test%20CID");
        assert_eq!(encode_url("joe.doe@apache.org"), "joe.doe@apache.org");
        assert_eq!(encode_url("joe+doe@apache.org"), "joe+doe@apache.org");
        assert_eq!(
            encode_url("peter&paul&mary@oldmusic.org"),
            "peter%26paul%26mary@oldmusic.org"
        );
        assert_eq!(encode_url("i)D#?KMQ.9XWv0p]Wz"), "i)D%23%3FKMQ.9XWv0p%5DWz");
    }

    #[test]
    fn end_of_line_characters_become_spaces() {
        assert_eq!(replace_end_of_line_characters_with_spaces(""), "");
        assert_eq!(replace_end_of_line_characters_with_spaces("   "), "   ");
        assert_eq!(replace_end_of_line_characters_with_spaces("abcdefg"), "abcdefg");
        assert_eq!(replace_end_of_line_characters_with_spaces("abc\rdefg"), "abc defg");
        assert_eq!(replace_end_of_line_characters_with_spaces("abc\ndefg"), "abc defg");
        assert_eq!(replace_end_of_line_characters_with_spaces("abc\r\ndefg"), "abc  defg");
        assert_eq!(replace_end_of_line_characters_with_spaces("abc\n\rdefg"), "abc  defg");
    }

    #[test]
    fn generated_boundaries_are_valid() {
        let a = new_boundary("rel");
        let b = new_boundary("rel");
        assert!(is_valid_boundary(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn parameters_quoted_when_needed() {
        assert_eq!(quote_parameter("logo.gif"), "logo.gif");
        assert_eq!(quote_parameter("my logo.gif"), "\"my logo.gif\"");
        assert_eq!(quote_parameter("a\"b"), "\"a\\\"b\"");
    }
}
