/*
 * mod.rs
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

//! MIME building blocks: Content-ID and cid URLs, transfer encodings, encoded-words, mailboxes.

mod base64;
mod content_id;
mod email_address;
mod quoted_printable;
mod rfc2047;
mod utils;

pub use self::base64::encode_lines as base64_encode_lines;
pub use content_id::{cid_url, is_cid, ContentID, CID_SCHEME};
pub use email_address::{format_mailbox, EmailAddress};
pub use quoted_printable::encode as quoted_printable_encode;
pub use rfc2047::encode_header_value;
pub use utils::{
    encode_url, is_boundary_char, is_token, is_token_char, is_valid_boundary, new_boundary,
    quote_parameter, replace_end_of_line_characters_with_spaces,
};
