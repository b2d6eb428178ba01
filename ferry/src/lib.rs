/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The **ferry** library moves values between Rust and a foreign engine runtime that is reached through a C function table.
//!
//! # Building blocks
//!
//! 1. **Call frames** ([`sys::CallFrame`]): fixed-layout argument slots and a typed return slot. Only types implementing
//!    [`sys::WireType`] can be encoded, so a call with an unsupported argument does not compile. Indirect values (strings, arrays,
//!    objects...) travel by handle.
//!
//! 2. **Ownership tokens** ([`lifetime::Token`]): a handle to foreign memory plus who owns it. An owned token is released exactly
//!    once, either explicitly with `release()` or when dropped. Borrowed tokens are tied to the call they came from and are never
//!    released.
//!
//! 3. **Scopes** ([`lifetime::Scope`]): collect the tokens of one logical operation and release them in reverse order when the
//!    scope ends, on early return and panic too.
//!
//! 4. **Method handles** ([`sys::MethodHandle`]): foreign methods resolved once at startup (grouped in method tables) or on first
//!    use ([`sys::LazyMethodHandle`]). Calls go through [`meta::Signature`], which fills the frame from a Rust tuple.
//!
//! 5. **Trampolines** ([`registry::Trampoline`]): Rust closures exposed as foreign-callable function pointers. Host classes
//!    declare them with [`#[ferry_api]`](ferry_api); the runtime looks each override up once and then calls it through its
//!    userdata.
//!
//! # Getting started
//!
//! The runtime loads the library through one exported entry point, generated by [`#[bridge_library]`](bridge_library):
//!
//! ```ignore
//! use ferry::prelude::*;
//!
//! struct Demo;
//!
//! #[bridge_library]
//! unsafe impl BridgeLibrary for Demo {}
//! ```
//!
//! # Cargo features
//!
//! * **`serde`**: `Serialize`/`Deserialize` for the built-in aggregates.
//! * **`experimental-threads`**: allows accessing the installed binding from other threads than the main one.
//! * **`safeguards-strict`**, **`safeguards-balanced`**, **`safeguards-disengaged`**: how many runtime checks guard against
//!   misuse. Defaults to strict in debug builds and balanced in release builds.

#[doc(inline)]
pub use ferry_core::{builtin, lifetime, log, meta, obj, registry};

#[doc(hidden)]
pub use ferry_core::sys;

pub mod init {
    pub use ferry_core::init::*;

    // Re-exports
    pub use ferry_macros::bridge_library;
}

/// Export host classes and aggregates to the foreign runtime.
pub mod register {
    pub use ferry_macros::{ferry_api, WireType};
}

#[doc(hidden)]
pub use ferry_core::private;

pub use ferry_core::{engine_class, ferry_error, ferry_print, ferry_warn};
pub use ferry_macros::{bridge_library, ferry_api, WireType};

pub mod prelude;
