/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Marshaling core of ferry: ownership tokens and scopes, typed signatures, trampolines and the class registry.
//!
//! Builds on the raw layer in `ferry-ffi` (re-exported as [`sys`]).

#![cfg_attr(test, allow(unused))]

mod storage;

pub mod builtin;
pub mod init;
pub mod lifetime;
pub mod log;
pub mod meta;
pub mod obj;
pub mod registry;

#[doc(hidden)]
pub mod private;

pub use ferry_ffi as sys;

#[doc(hidden)]
pub use tracing as __tracing;

#[cfg(test)]
mod testing;
