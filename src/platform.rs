//! Objective-C bridging helpers shared by the macOS pasteboard and workspace code.
//!
//! All functions are `unsafe`: callers pass raw object pointers obtained from
//! `msg_send!` and must hold an autorelease pool when creating strings.

#![cfg(target_os = "macos")]

use std::ffi::{CStr, CString};

use objc::runtime::{Class, Object};
use objc::{msg_send, sel, sel_impl};

/// Uniform type identifier for RTF pasteboard data
pub const RTF_TYPE: &str = "public.rtf";

/// Uniform type identifier for UTF-8 plain text
pub const PLAIN_TEXT_TYPE: &str = "public.utf8-plain-text";

/// Convert an NSString to a Rust String.
pub unsafe fn string_from_ns(nsstring: *mut Object) -> Option<String> {
    if nsstring.is_null() {
        return None;
    }

    let utf8: *const std::os::raw::c_char = msg_send![nsstring, UTF8String];
    if utf8.is_null() {
        return None;
    }

    CStr::from_ptr(utf8).to_str().ok().map(|s| s.to_string())
}

/// Create an autoreleased NSString. `None` if the class is missing or `s` holds a NUL.
pub unsafe fn ns_string(s: &str) -> Option<*mut Object> {
    let class = Class::get("NSString")?;
    let cstr = CString::new(s).ok()?;
    let ns: *mut Object = msg_send![class, stringWithUTF8String: cstr.as_ptr()];
    (!ns.is_null()).then_some(ns)
}

/// Copy the contents of an NSData object.
pub unsafe fn bytes_from_nsdata(data: *mut Object) -> Option<Vec<u8>> {
    if data.is_null() {
        return None;
    }

    let length: usize = msg_send![data, length];
    let bytes: *const u8 = msg_send![data, bytes];
    if bytes.is_null() || length == 0 {
        return None;
    }

    Some(std::slice::from_raw_parts(bytes, length).to_vec())
}

/// Create an autoreleased NSData holding a copy of `bytes`.
pub unsafe fn nsdata_from_bytes(bytes: &[u8]) -> Option<*mut Object> {
    let class = Class::get("NSData")?;
    let data: *mut Object = msg_send![
        class,
        dataWithBytes: bytes.as_ptr() as *const std::os::raw::c_void
        length: bytes.len()
    ];
    (!data.is_null()).then_some(data)
}

/// `NSPasteboard.generalPasteboard`, or `None` when AppKit is unavailable.
pub unsafe fn general_pasteboard() -> Option<*mut Object> {
    let class = Class::get("NSPasteboard")?;
    let pasteboard: *mut Object = msg_send![class, generalPasteboard];
    (!pasteboard.is_null()).then_some(pasteboard)
}
