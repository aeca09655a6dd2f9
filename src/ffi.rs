//! FFI (Foreign Function Interface) bindings for cross-language interop.
//!
//! This module exposes discovery through C-compatible functions that can be
//! called from Swift (macOS) and C# (Windows).
//!
//! # Memory Management
//!
//! - Rust allocates memory and returns pointers to Swift/C#
//! - The calling code MUST call the corresponding `_free` functions to prevent leaks
//! - Strings are null-terminated UTF-8; entries are handed out as JSON objects
//!
//! # Usage from Swift (macOS)
//!
//! ```swift
//! let listPtr = appdepot_scan_uninstallers(nil)
//! defer { appdepot_free_entry_list(listPtr) }
//!
//! let count = appdepot_entry_list_count(listPtr)
//! for i in 0..<count {
//!     let json = appdepot_entry_list_get_json(listPtr, i)
//!     defer { appdepot_free_string(json) }
//!     // Decode entry...
//! }
//! ```

use crate::config::DiscoveryConfig;
use crate::discovery::{DiscoverySources, UninstallerDiscovery};
use crate::CandidateEntry;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

/// Opaque handle to a discovered entry list
pub struct CEntryList {
    entries: Vec<CandidateEntry>,
}

/// Discover installed applications.
/// `config_path` may be null for the default configuration.
/// Returns an opaque handle, or null if the config file cannot be loaded.
/// Caller MUST call appdepot_free_entry_list() when done.
#[no_mangle]
pub extern "C" fn appdepot_scan_uninstallers(config_path: *const c_char) -> *mut CEntryList {
    let config = if config_path.is_null() {
        DiscoveryConfig::default()
    } else {
        let path = match unsafe { CStr::from_ptr(config_path) }.to_str() {
            Ok(s) => s,
            Err(_) => return ptr::null_mut(),
        };
        match DiscoveryConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Error loading config: {:#}", e);
                return ptr::null_mut();
            }
        }
    };

    let sources = DiscoverySources::for_platform(&config);
    let mut discovery = UninstallerDiscovery::new(config, sources);
    let entries = discovery.run(&mut |_| {});

    Box::into_raw(Box::new(CEntryList { entries }))
}

/// Get the number of entries in a list.
#[no_mangle]
pub extern "C" fn appdepot_entry_list_count(list: *const CEntryList) -> c_int {
    if list.is_null() {
        return 0;
    }
    unsafe { (*list).entries.len() as c_int }
}

/// Get the entry at `index` as a JSON object.
/// Caller MUST call appdepot_free_string() when done.
#[no_mangle]
pub extern "C" fn appdepot_entry_list_get_json(list: *const CEntryList, index: c_int) -> *mut c_char {
    if list.is_null() || index < 0 {
        return ptr::null_mut();
    }

    let entries = unsafe { &(*list).entries };
    match entries.get(index as usize) {
        Some(entry) => string_to_c_char(&entry.summary_json().to_string()),
        None => ptr::null_mut(),
    }
}

/// Free a list returned by appdepot_scan_uninstallers().
#[no_mangle]
pub extern "C" fn appdepot_free_entry_list(list: *mut CEntryList) {
    if !list.is_null() {
        unsafe {
            let _ = Box::from_raw(list);
        }
    }
}

/// Free a string returned by FFI functions.
#[no_mangle]
pub extern "C" fn appdepot_free_string(s: *mut c_char) {
    free_c_char(s);
}

fn string_to_c_char(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn free_c_char(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}
