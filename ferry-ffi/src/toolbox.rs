/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Functions and macros that are not very specific to ferry, but come in handy.

use std::ffi::{c_char, CStr};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Macros

/// Debug output of the FFI layer, compiled in only with the `debug-log` feature.
#[cfg(feature = "debug-log")]
#[macro_export]
macro_rules! out {
    ()                          => ($crate::__tracing::debug!(target: "ferry::sys", ""));
    ($fmt:literal)              => ($crate::__tracing::debug!(target: "ferry::sys", $fmt));
    ($fmt:literal, $($arg:tt)*) => ($crate::__tracing::debug!(target: "ferry::sys", $fmt, $($arg)*));
}

/// Debug output of the FFI layer, compiled in only with the `debug-log` feature.
#[cfg(not(feature = "debug-log"))]
// Sink-writing keeps the arguments type-checked and "used" without any output.
#[macro_export]
macro_rules! out {
    ()                          => ({});
    ($fmt:literal)              => ({ use std::io::{sink, Write}; let _ = write!(sink(), $fmt); });
    ($fmt:literal, $($arg:tt)*) => ({ use std::io::{sink, Write}; let _ = write!(sink(), $fmt, $($arg)*); };)
}

/// Fetches a function from a validated [`ForeignInterface`](crate::ForeignInterface).
///
/// ```ignore
/// let id = interface_fn!(binding, object_get_instance_id)(obj);
/// ```
#[macro_export]
macro_rules! interface_fn {
    ($binding:expr, $name:ident) => {{
        match $binding.interface().$name {
            Some(f) => f,
            None => $crate::missing_interface_fn(stringify!($name)),
        }
    }};
}

#[doc(hidden)]
#[cold]
pub fn missing_interface_fn(name: &str) -> ! {
    panic!("foreign interface function `{name}` is not available; was the binding validated?")
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Utility functions

/// Explicitly cast away `const` from a pointer, similar to C++ `const_cast`.
///
/// The `as` conversion simultaneously does 10 other things, potentially causing unintended transmutations.
pub fn force_mut_ptr<T>(ptr: *const T) -> *mut T {
    ptr as *mut T
}

/// Add `const` to a mut ptr.
pub fn to_const_ptr<T>(ptr: *mut T) -> *const T {
    ptr as *const T
}

/// If `ptr` is not null, returns `Some(mapper(ptr))`; otherwise `None`.
#[inline]
pub fn ptr_then<T, R, F>(ptr: *mut T, mapper: F) -> Option<R>
where
    F: FnOnce(*mut T) -> R,
{
    if ptr.is_null() {
        None
    } else {
        Some(mapper(ptr))
    }
}

/// Reads a NUL-terminated string coming from the runtime, lossy on invalid UTF-8. Null yields an empty string.
///
/// # Safety
/// `ptr` must be null or point to a valid NUL-terminated string.
pub unsafe fn c_str_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }

    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}
