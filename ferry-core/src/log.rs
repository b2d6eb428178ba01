/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Printing and logging functionality.
//!
//! Every message becomes a `tracing` event with target `ferry`. Warnings and errors are additionally forwarded to the runtime's
//! own output, if a binding is installed and the runtime provides the corresponding print function.

use std::ffi::CString;

use crate::sys;

// https://stackoverflow.com/a/40234666
#[macro_export]
#[doc(hidden)]
macro_rules! inner_function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap_or(name)
    }};
}

#[macro_export]
#[doc(hidden)]
macro_rules! inner_ferry_msg {
    ($level:ident, $print_fn:ident; $fmt:literal $(, $args:expr)* $(,)?) => {{
        let msg = format!($fmt $(, $args)*);
        $crate::__tracing::$level!(target: "ferry", "{msg}");

        $crate::log::forward_to_runtime(
            |interface| interface.$print_fn,
            &msg,
            $crate::inner_function!(),
            file!(),
            line!(),
        );
    }};
}

/// Pushes a warning message to the runtime's output and to `tracing`.
#[macro_export]
macro_rules! ferry_warn {
    ($fmt:literal $(, $args:expr)* $(,)?) => {
        $crate::inner_ferry_msg!(warn, print_warning; $fmt $(, $args)*)
    };
}

/// Pushes an error message to the runtime's output and to `tracing`.
#[macro_export]
macro_rules! ferry_error {
    ($fmt:literal $(, $args:expr)* $(,)?) => {
        $crate::inner_ferry_msg!(error, print_error; $fmt $(, $args)*)
    };
}

/// Informational message. Goes to `tracing` only; the runtime has no channel for plain output.
#[macro_export]
macro_rules! ferry_print {
    ($fmt:literal $(, $args:expr)* $(,)?) => {
        $crate::__tracing::info!(target: "ferry", $fmt $(, $args)*)
    };
}

pub use crate::{ferry_error, ferry_print, ferry_warn};

/// Sends a message to the installed runtime. Without binding or without the selected print function, this is a no-op.
#[doc(hidden)]
pub fn forward_to_runtime(
    select: fn(&sys::ForeignInterface) -> Option<sys::PrintFn>,
    msg: &str,
    function: &str,
    file: &str,
    line: u32,
) {
    let Some(binding) = sys::installed() else {
        return;
    };
    let Some(print_fn) = select(binding.interface()) else {
        return;
    };

    let msg = to_c_string(msg);
    let function = to_c_string(function);
    let file = to_c_string(file);
    let line = i32::try_from(line).unwrap_or(i32::MAX);

    // SAFETY: all strings are valid and NUL-terminated for the duration of the call.
    unsafe {
        print_fn(
            msg.as_ptr(),
            function.as_ptr(),
            file.as_ptr(),
            line,
            sys::conv::SYS_FALSE,
        )
    };
}

// Interior NULs would cut the message short on the runtime side.
fn to_c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "\\0")).unwrap_or_default()
}
