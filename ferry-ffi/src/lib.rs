/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Low-level layer of ferry: the foreign runtime's C ABI, wire types, call frames and method handles.
//!
//! Nothing in here decides ownership of foreign memory; that happens in `ferry-core`, on top of the raw handles defined here.

#![cfg_attr(test, allow(unused))]

mod assertions;
mod binding;
mod error;
mod frame;
mod global;
mod handles;
mod init_level;
mod interface;
mod lifecycle;
mod opaque;
mod toolbox;
mod wire;

#[cfg(test)]
mod testing;

pub mod conv;
pub mod method;
#[doc(hidden)]
pub mod plugins;

// See https://github.com/dtolnay/paste/issues/69#issuecomment-962418430
// and https://users.rust-lang.org/t/proc-macros-using-third-party-crate/42465/4
#[doc(hidden)]
pub use paste;
#[doc(hidden)]
pub use tracing as __tracing;

pub use binding::{get_binding, install, installed, is_installed, Binding, BridgeConfig};
pub use error::BootstrapError;
pub use frame::{CallFrame, RetSlot, MAX_ARGS, SLOT_ALIGN, SLOT_BYTES};
pub use global::{Global, GlobalGuard};
pub use handles::*;
pub use init_level::InitLevel;
pub use interface::*;
pub use lifecycle::LifecycleTable;
pub use method::{
    bootstrap_failed, dispatch, dispatch_varcall, load_method_tables, LazyMethodHandle,
    MethodHandle, MethodKey, MethodTableLoader,
};
pub use opaque::Opaque;
pub use toolbox::*;
pub use wire::{read_arg, write_return, ResourceKind, WireKind, WireType};
