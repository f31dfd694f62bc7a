/*
 * lib.rs
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

//! C FFI for fermaglio core. Messages are identified by opaque non-zero handles.
//! Functions returning c_int give 0 on success or a negative FERMAGLIO_ERR_* code; details are
//! available from fermaglio_last_error on the calling thread.
//! All string parameters are UTF-8 NUL-terminated.

use libc::{c_char, c_int, size_t};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use fermaglio_core::config::load_resolver_config;
use fermaglio_core::{EmailError, ErrorKind, FileResolver, HtmlEmail, UrlResolver};

pub const FERMAGLIO_OK: c_int = 0;
pub const FERMAGLIO_ERR_INVALID_REFERENCE: c_int = -1;
pub const FERMAGLIO_ERR_MALFORMED_REFERENCE: c_int = -2;
pub const FERMAGLIO_ERR_NOT_FOUND: c_int = -3;
pub const FERMAGLIO_ERR_NAME_CONFLICT: c_int = -4;
pub const FERMAGLIO_ERR_BUILD_ALREADY_FINALIZED: c_int = -5;
pub const FERMAGLIO_ERR_INVALID_MESSAGE: c_int = -6;
pub const FERMAGLIO_ERR_IO: c_int = -7;
pub const FERMAGLIO_ERR_CONFIG: c_int = -8;
/// NULL or non-UTF-8 argument.
pub const FERMAGLIO_ERR_ARGUMENT: c_int = -9;
/// Unknown or freed message handle.
pub const FERMAGLIO_ERR_HANDLE: c_int = -10;

fn error_code(kind: ErrorKind) -> c_int {
    match kind {
        ErrorKind::InvalidReference => FERMAGLIO_ERR_INVALID_REFERENCE,
        ErrorKind::MalformedReference => FERMAGLIO_ERR_MALFORMED_REFERENCE,
        ErrorKind::NotFound => FERMAGLIO_ERR_NOT_FOUND,
        ErrorKind::NameConflict => FERMAGLIO_ERR_NAME_CONFLICT,
        ErrorKind::BuildAlreadyFinalized => FERMAGLIO_ERR_BUILD_ALREADY_FINALIZED,
        ErrorKind::InvalidMessage => FERMAGLIO_ERR_INVALID_MESSAGE,
        ErrorKind::Io => FERMAGLIO_ERR_IO,
        ErrorKind::Config => FERMAGLIO_ERR_CONFIG,
    }
}

/// Messages under construction keyed by handle. Each message sits behind its own lock so callers on
/// different threads serialise per message.
struct Registry {
    messages: RwLock<HashMap<u64, Arc<Mutex<HtmlEmail>>>>,
    counter: AtomicU64,
}

fn registry() -> &'static Registry {
    static REGISTRY: once_cell::sync::OnceCell<Registry> = once_cell::sync::OnceCell::new();
    REGISTRY.get_or_init(|| Registry {
        messages: RwLock::new(HashMap::new()),
        counter: AtomicU64::new(0),
    })
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
    static LAST_ERROR_CODE: Cell<c_int> = Cell::new(FERMAGLIO_OK);
}

fn set_last_error(code: c_int, msg: &str) -> c_int {
    let msg = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
    LAST_ERROR_CODE.with(|c| c.set(code));
    code
}

fn set_email_error(err: &EmailError) -> c_int {
    set_last_error(error_code(err.kind()), &err.to_string())
}

fn clear_last_error() -> c_int {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
    LAST_ERROR_CODE.with(|c| c.set(FERMAGLIO_OK));
    FERMAGLIO_OK
}

fn ptr_to_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

fn required_str(ptr: *const c_char, what: &str) -> Result<String, c_int> {
    ptr_to_str(ptr).ok_or_else(|| set_last_error(FERMAGLIO_ERR_ARGUMENT, &format!("{} is null or not valid UTF-8", what)))
}

/// Run `f` on the message behind `handle`, recording any error.
fn with_message<R>(handle: u64, f: impl FnOnce(&mut HtmlEmail) -> Result<R, EmailError>) -> Result<R, c_int> {
    let message = registry()
        .messages
        .read()
        .ok()
        .and_then(|m| m.get(&handle).cloned())
        .ok_or_else(|| set_last_error(FERMAGLIO_ERR_HANDLE, "message not found"))?;
    let mut guard = message
        .lock()
        .map_err(|_| set_last_error(FERMAGLIO_ERR_HANDLE, "message lock poisoned"))?;
    f(&mut *guard).map_err(|e| set_email_error(&e))
}

fn status(result: Result<(), c_int>) -> c_int {
    match result {
        Ok(()) => clear_last_error(),
        Err(code) => code,
    }
}

fn string_result(result: Result<String, c_int>) -> *mut c_char {
    match result.map(CString::new) {
        Ok(Ok(s)) => {
            clear_last_error();
            s.into_raw()
        }
        Ok(Err(_)) => {
            set_last_error(FERMAGLIO_ERR_ARGUMENT, "result contains NUL");
            ptr::null_mut()
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn fermaglio_version() -> *const c_char {
    b"0.1.0\0".as_ptr() as *const c_char
}

/// Last error message from a failed call on this thread. Valid until the next FFI call. Do not free.
#[no_mangle]
pub extern "C" fn fermaglio_last_error() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(|s| s.as_ptr()).unwrap_or(ptr::null()))
}

/// FERMAGLIO_ERR_* code of the last failed call on this thread, or FERMAGLIO_OK.
#[no_mangle]
pub extern "C" fn fermaglio_last_error_kind() -> c_int {
    LAST_ERROR_CODE.with(|c| c.get())
}

/// Free a string returned by fermaglio_message_embed_*. No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn fermaglio_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

/// Free message bytes returned by fermaglio_message_build. len must be the length it reported.
#[no_mangle]
pub unsafe extern "C" fn fermaglio_free_bytes(ptr: *mut u8, len: size_t) {
    if !ptr.is_null() {
        let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len));
    }
}

/// Create an empty message. Returns a non-zero handle (free with fermaglio_message_free).
#[no_mangle]
pub extern "C" fn fermaglio_message_new() -> u64 {
    let reg = registry();
    let handle = reg.counter.fetch_add(1, Ordering::Relaxed) + 1;
    match reg.messages.write() {
        Ok(mut m) => {
            m.insert(handle, Arc::new(Mutex::new(HtmlEmail::new())));
            clear_last_error();
            handle
        }
        Err(_) => {
            set_last_error(FERMAGLIO_ERR_HANDLE, "message registry poisoned");
            0
        }
    }
}

/// Release a message. Unknown handles are ignored.
#[no_mangle]
pub extern "C" fn fermaglio_message_free(handle: u64) {
    if let Ok(mut m) = registry().messages.write() {
        m.remove(&handle);
    }
}

#[no_mangle]
pub extern "C" fn fermaglio_message_set_from(handle: u64, address: *const c_char) -> c_int {
    status(required_str(address, "address").and_then(|a| with_message(handle, |m| m.set_from(&a).map(|_| ()))))
}

#[no_mangle]
pub extern "C" fn fermaglio_message_add_to(handle: u64, address: *const c_char) -> c_int {
    status(required_str(address, "address").and_then(|a| with_message(handle, |m| m.add_to(&a).map(|_| ()))))
}

#[no_mangle]
pub extern "C" fn fermaglio_message_set_subject(handle: u64, subject: *const c_char) -> c_int {
    status(required_str(subject, "subject").and_then(|s| {
        with_message(handle, |m| {
            m.set_subject(s);
            Ok(())
        })
    }))
}

#[no_mangle]
pub extern "C" fn fermaglio_message_set_text(handle: u64, text: *const c_char) -> c_int {
    status(required_str(text, "text").and_then(|t| with_message(handle, |m| m.set_text_msg(t).map(|_| ()))))
}

#[no_mangle]
pub extern "C" fn fermaglio_message_set_html(handle: u64, html: *const c_char) -> c_int {
    status(required_str(html, "html").and_then(|h| with_message(handle, |m| m.set_html_msg(h).map(|_| ()))))
}

/// Resolve names against base_dir (NULL: names must be absolute paths). lenient: non-zero to treat
/// missing files as absent.
#[no_mangle]
pub extern "C" fn fermaglio_message_set_resolver_file(handle: u64, base_dir: *const c_char, lenient: c_int) -> c_int {
    let resolver = match ptr_to_str(base_dir) {
        Some(dir) => FileResolver::new(dir, lenient != 0),
        None if base_dir.is_null() => FileResolver::without_base_dir(lenient != 0),
        None => return set_last_error(FERMAGLIO_ERR_ARGUMENT, "base_dir is not valid UTF-8"),
    };
    status(with_message(handle, |m| {
        m.set_resolver(Box::new(resolver));
        Ok(())
    }))
}

/// Resolve names against base_url (NULL: names must be absolute URLs).
#[no_mangle]
pub extern "C" fn fermaglio_message_set_resolver_url(handle: u64, base_url: *const c_char, lenient: c_int) -> c_int {
    let resolver = match ptr_to_str(base_url) {
        Some(url) => match UrlResolver::with_base(&url, lenient != 0) {
            Ok(r) => r,
            Err(e) => return set_email_error(&e),
        },
        None if base_url.is_null() => UrlResolver::new(None, lenient != 0),
        None => return set_last_error(FERMAGLIO_ERR_ARGUMENT, "base_url is not valid UTF-8"),
    };
    status(with_message(handle, |m| {
        m.set_resolver(Box::new(resolver));
        Ok(())
    }))
}

/// Configure the resolver chain from a `<resolvers>` XML file.
#[no_mangle]
pub extern "C" fn fermaglio_message_load_resolver_config(handle: u64, path: *const c_char) -> c_int {
    status(required_str(path, "path").and_then(|p| {
        with_message(handle, |m| {
            let config = load_resolver_config(&p)?;
            if let Some(url_resolver) = config.url_resolver() {
                m.set_url_resolver(url_resolver);
            }
            m.set_resolver(config.into_resolver()?);
            Ok(())
        })
    }))
}

/// Embed a file under its file name. Returns the content id (free with fermaglio_free_string), or NULL on error.
#[no_mangle]
pub extern "C" fn fermaglio_message_embed_file(handle: u64, path: *const c_char) -> *mut c_char {
    string_result(required_str(path, "path").and_then(|p| with_message(handle, |m| m.embed_file(&p))))
}

/// Embed an absolute URL under name. Returns the content id, or NULL on error.
#[no_mangle]
pub extern "C" fn fermaglio_message_embed_url(handle: u64, url: *const c_char, name: *const c_char) -> *mut c_char {
    let args = required_str(url, "url").and_then(|u| Ok((u, required_str(name, "name")?)));
    string_result(args.and_then(|(u, n)| {
        with_message(handle, |m| {
            let url = url::Url::parse(&u).map_err(|e| EmailError::MalformedReference {
                reference: u.clone(),
                reason: e.to_string(),
            })?;
            m.embed_url(&url, &n)
        })
    }))
}

/// Embed location as resolved by the message's resolver, under name. Returns the content id, or NULL on error.
#[no_mangle]
pub extern "C" fn fermaglio_message_embed_resource(
    handle: u64,
    location: *const c_char,
    name: *const c_char,
) -> *mut c_char {
    let args = required_str(location, "location").and_then(|l| Ok((l, required_str(name, "name")?)));
    string_result(args.and_then(|(l, n)| with_message(handle, |m| m.embed_resource(&l, &n))))
}

/// Build the message. On success returns the RFC 5322 bytes and stores their length in *out_len
/// (free with fermaglio_free_bytes); returns NULL on error. A message builds once.
#[no_mangle]
pub unsafe extern "C" fn fermaglio_message_build(handle: u64, out_len: *mut size_t) -> *mut u8 {
    if out_len.is_null() {
        set_last_error(FERMAGLIO_ERR_ARGUMENT, "out_len is null");
        return ptr::null_mut();
    }
    match with_message(handle, |m| m.build()) {
        Ok(built) => {
            let bytes = built.into_bytes().into_boxed_slice();
            *out_len = bytes.len();
            clear_last_error();
            Box::into_raw(bytes) as *mut u8
        }
        Err(_) => {
            *out_len = 0;
            ptr::null_mut()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn last_error() -> String {
        let p = fermaglio_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
    }

    #[test]
    fn build_once_through_handles() {
        let h = fermaglio_message_new();
        assert_ne!(h, 0);
        assert_eq!(fermaglio_message_set_from(h, c("a@example.org").as_ptr()), FERMAGLIO_OK);
        assert_eq!(fermaglio_message_add_to(h, c("b@example.org").as_ptr()), FERMAGLIO_OK);
        assert_eq!(fermaglio_message_set_subject(h, c("Hi").as_ptr()), FERMAGLIO_OK);
        assert_eq!(fermaglio_message_set_text(h, c("hello").as_ptr()), FERMAGLIO_OK);

        let mut len: size_t = 0;
        let bytes = unsafe { fermaglio_message_build(h, &mut len) };
        assert!(!bytes.is_null());
        let text = unsafe { std::slice::from_raw_parts(bytes, len) };
        assert!(String::from_utf8_lossy(text).contains("Subject: Hi"));
        unsafe { fermaglio_free_bytes(bytes, len) };

        let again = unsafe { fermaglio_message_build(h, &mut len) };
        assert!(again.is_null());
        assert_eq!(fermaglio_last_error_kind(), FERMAGLIO_ERR_BUILD_ALREADY_FINALIZED);
        fermaglio_message_free(h);
    }

    #[test]
    fn embed_errors_carry_kind_and_message() {
        let h = fermaglio_message_new();
        let cid = fermaglio_message_embed_resource(h, c("images/logo.gif").as_ptr(), c("logo").as_ptr());
        assert!(cid.is_null());
        assert_eq!(fermaglio_last_error_kind(), FERMAGLIO_ERR_MALFORMED_REFERENCE);
        assert!(last_error().contains("images/logo.gif"));

        assert_eq!(fermaglio_message_set_resolver_file(h, ptr::null(), 1), FERMAGLIO_OK);
        let cid = fermaglio_message_embed_file(h, c("/no/such/dir/logo.gif").as_ptr());
        assert!(cid.is_null());
        assert_eq!(fermaglio_last_error_kind(), FERMAGLIO_ERR_NOT_FOUND);

        assert_eq!(fermaglio_message_set_from(h, ptr::null()), FERMAGLIO_ERR_ARGUMENT);
        fermaglio_message_free(h);
        assert_eq!(fermaglio_message_set_text(h, c("x").as_ptr()), FERMAGLIO_ERR_HANDLE);
    }

    #[test]
    fn embedded_file_returns_content_id() {
        let dir = std::env::temp_dir().join(format!("fermaglio-ffi-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pixel.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let h = fermaglio_message_new();
        let p = c(path.to_str().unwrap());
        let first = fermaglio_message_embed_file(h, p.as_ptr());
        let second = fermaglio_message_embed_file(h, p.as_ptr());
        assert!(!first.is_null() && !second.is_null());
        unsafe {
            assert_eq!(CStr::from_ptr(first), CStr::from_ptr(second));
            fermaglio_free_string(first);
            fermaglio_free_string(second);
        }
        fermaglio_message_free(h);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
