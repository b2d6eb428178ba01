/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Compile-time assertions, and runtime assertions tied to safeguard levels.
//!
//! The `safeguards_*` cfgs are emitted by the build script of each crate expanding these macros (see `ferry-build`).

/// Verifies a condition at compile time.
#[macro_export]
macro_rules! static_assert {
    ($cond:expr) => {
        const _: () = assert!($cond);
    };
    ($cond:expr, $msg:literal) => {
        const _: () = assert!($cond, $msg);
    };
}

/// Verifies at compile time that `T` and `U` agree in size and alignment, e.g. a wire aggregate and its `glam` counterpart.
#[macro_export]
macro_rules! static_assert_eq_size_align {
    ($T:ty, $U:ty) => {
        $crate::static_assert!(
            std::mem::size_of::<$T>() == std::mem::size_of::<$U>()
                && std::mem::align_of::<$T>() == std::mem::align_of::<$U>()
        );
    };
}

/// `assert!` under `safeguards_strict` (default in debug builds), no-op otherwise.
#[macro_export]
macro_rules! strict_assert {
    ($($arg:tt)*) => {
        #[cfg(safeguards_strict)]
        assert!($($arg)*);
    };
}

/// `assert_eq!` under `safeguards_strict` (default in debug builds), no-op otherwise.
#[macro_export]
macro_rules! strict_assert_eq {
    ($actual:expr, $expected:expr) => {
        #[cfg(safeguards_strict)]
        assert_eq!($actual, $expected);
    };
    ($actual:expr, $expected:expr, $($arg:tt)*) => {
        #[cfg(safeguards_strict)]
        assert_eq!($actual, $expected, $($arg)*);
    };
}
