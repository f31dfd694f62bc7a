/*
 * html_references.rs
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

//! Find resource references (`<img src>`, `<script src>`) in HTML and rewrite them to `cid:` URLs.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::mime::is_cid;

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<img\s*[^>]*?\s+src\s*=\s*["'])([^"']+?)(["'])"#).expect("img pattern")
});

static SCRIPT_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<script\s*[^>]*?\s+src\s*=\s*["'])([^"']+?)(["'])"#).expect("script pattern")
});

/// Distinct locations referenced by `html`, in order of first appearance.
/// `cid:` and `data:` references are already inline and are skipped.
pub(crate) fn find_references(html: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for pattern in [&*IMG_SRC, &*SCRIPT_SRC] {
        for caps in pattern.captures_iter(html) {
            let location = caps[2].trim();
            if location.is_empty() || is_cid(location) || is_data_url(location) {
                continue;
            }
            if !seen.iter().any(|s: &String| s == location) {
                seen.push(location.to_string());
            }
        }
    }
    seen
}

/// Replace each reference found in `replacements` with its new value; others are left alone.
pub(crate) fn rewrite_references(html: &str, replacements: &HashMap<String, String>) -> String {
    let replace = |caps: &Captures<'_>| -> String {
        match replacements.get(caps[2].trim()) {
            Some(new) => format!("{}{}{}", &caps[1], new, &caps[3]),
            None => caps[0].to_string(),
        }
    };
    let html = IMG_SRC.replace_all(html, replace);
    SCRIPT_SRC.replace_all(&html, replace).into_owned()
}

fn is_data_url(location: &str) -> bool {
    location
        .get(..5)
        .map_or(false, |p| p.eq_ignore_ascii_case("data:"))
}
