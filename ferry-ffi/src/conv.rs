/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Conversions between Rust primitives and their representation in the C ABI.

use std::mem::size_of;

use crate as sys;
use crate::static_assert;

/// Infallibly convert `u32` into a `usize`.
///
/// Only targets where `u32` fits into `usize` are supported.
pub fn u32_to_usize(i: u32) -> usize {
    static_assert!(
        size_of::<u32>() <= size_of::<usize>(),
        "ferry only supports targets where u32 <= usize"
    );

    // SAFETY: The above static assert ensures that this can never fail.
    unsafe { i.try_into().unwrap_unchecked() }
}

/// Converts a Rust bool into a sys bool.
pub const fn bool_to_sys(value: bool) -> sys::Bool {
    value as sys::Bool
}

pub const SYS_TRUE: sys::Bool = bool_to_sys(true);
pub const SYS_FALSE: sys::Bool = bool_to_sys(false);

/// Length of a slice as the runtime's integer type.
pub fn len_to_int(len: usize) -> sys::Int {
    sys::Int::try_from(len).unwrap_or_else(|_| panic!("length {len} exceeds the runtime's integer range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_bool() {
        assert_eq!(bool_to_sys(true), SYS_TRUE);
        assert_eq!(bool_to_sys(false), SYS_FALSE);
    }

    #[test]
    fn u32_into_usize() {
        for value in [0, 123, 4444, u32::MAX, u16::MAX as u32, i32::MAX as u32] {
            assert_eq!(u32_to_usize(value), value as usize);
        }
    }

    #[test]
    fn len_into_int() {
        assert_eq!(len_to_int(0), 0);
        assert_eq!(len_to_int(17), 17);
    }
}
