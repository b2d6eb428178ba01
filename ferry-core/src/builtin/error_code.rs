/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::sys;

/// Result code returned in-band by many foreign methods.
///
/// These are ordinary values: a method returning `ErrorCode::FILE_NOT_FOUND` completed normally, and the code is surfaced to the caller
/// unchanged. Use [`into_result()`](Self::into_result) to bring it into `?` flow.
///
/// Unlike a Rust enum, this accepts codes unknown to this crate, so that a newer runtime cannot produce an invalid value.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
#[repr(transparent)]
pub struct ErrorCode {
    ord: i64,
}

macro_rules! error_codes {
    ($( $(#[$attr:meta])* $NAME:ident = $ord:literal, )*) => {
        impl ErrorCode {
            $(
                $(#[$attr])*
                pub const $NAME: Self = Self { ord: $ord };
            )*

            /// Name of the constant, if this is a known code.
            pub fn as_str(self) -> Option<&'static str> {
                match self.ord {
                    $( $ord => Some(stringify!($NAME)), )*
                    _ => None,
                }
            }
        }
    };
}

error_codes! {
    /// No error occurred.
    OK = 0,
    /// Generic error.
    FAILED = 1,
    UNAVAILABLE = 2,
    UNCONFIGURED = 3,
    UNAUTHORIZED = 4,
    PARAMETER_RANGE_ERROR = 5,
    OUT_OF_MEMORY = 6,
    FILE_NOT_FOUND = 7,
    FILE_BAD_DRIVE = 8,
    FILE_BAD_PATH = 9,
    FILE_NO_PERMISSION = 10,
    FILE_ALREADY_IN_USE = 11,
    FILE_CANT_OPEN = 12,
    FILE_CANT_WRITE = 13,
    FILE_CANT_READ = 14,
    FILE_UNRECOGNIZED = 15,
    FILE_CORRUPT = 16,
    FILE_MISSING_DEPENDENCIES = 17,
    FILE_EOF = 18,
    CANT_OPEN = 19,
    CANT_CREATE = 20,
    QUERY_FAILED = 21,
    ALREADY_IN_USE = 22,
    LOCKED = 23,
    TIMEOUT = 24,
    CANT_CONNECT = 25,
    CANT_RESOLVE = 26,
    CONNECTION_ERROR = 27,
    CANT_ACQUIRE_RESOURCE = 28,
    CANT_FORK = 29,
    INVALID_DATA = 30,
    INVALID_PARAMETER = 31,
    ALREADY_EXISTS = 32,
    DOES_NOT_EXIST = 33,
    DATABASE_CANT_READ = 34,
    DATABASE_CANT_WRITE = 35,
    COMPILATION_FAILED = 36,
    METHOD_NOT_FOUND = 37,
    LINK_FAILED = 38,
    SCRIPT_FAILED = 39,
    CYCLIC_LINK = 40,
    INVALID_DECLARATION = 41,
    DUPLICATE_SYMBOL = 42,
    PARSE_ERROR = 43,
    BUSY = 44,
    SKIP = 45,
    /// Used internally when the runtime is asked for its version or help text.
    HELP = 46,
    /// Implementation issue in the runtime.
    BUG = 47,
    /// Never returned by built-in methods.
    PRINTER_ON_FIRE = 48,
}

impl ErrorCode {
    pub const fn from_ord(ord: i64) -> Self {
        Self { ord }
    }

    pub const fn ord(self) -> i64 {
        self.ord
    }

    pub const fn is_ok(self) -> bool {
        self.ord == Self::OK.ord
    }

    /// `Ok(())` for [`OK`](Self::OK), `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), ErrorCode> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::OK
    }
}

impl fmt::Debug for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(name) => write!(f, "ErrorCode::{name}"),
            None => write!(f, "ErrorCode({})", self.ord),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(name) => write!(f, "{name} ({})", self.ord),
            None => write!(f, "unknown error code {}", self.ord),
        }
    }
}

impl std::error::Error for ErrorCode {}

// SAFETY: the runtime returns error codes as 64-bit integers; every i64 is a valid ErrorCode.
unsafe impl sys::WireType for ErrorCode {
    type Repr = i64;
    const KIND: sys::WireKind = sys::WireKind::Int64;

    #[inline]
    fn to_repr(self) -> i64 {
        self.ord
    }

    #[inline]
    fn from_repr(repr: i64) -> Self {
        Self::from_ord(repr)
    }
}
