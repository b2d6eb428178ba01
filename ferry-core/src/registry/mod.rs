/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Host classes and virtual method dispatch.
//!
//! A [`Trampoline`] turns a closure into a function pointer plus userdata for the runtime. A [`VirtualTable`] collects the
//! trampolines of one class; [`class`] keeps the tables of all registered classes.

// Note: final re-exports used by generated code are in lib.rs, mod private.

pub mod callbacks;
pub mod class;
pub mod plugin;

mod trampoline;
mod virtuals;

pub use trampoline::{ForeignCallable, ForeignVarcallable, Invocation, Trampoline, TrampolineState, TrampolineWatch};
pub use virtuals::VirtualTable;
