/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Errors of the marshaling layer.
//!
//! Bootstrap failures live in [`sys::BootstrapError`](crate::sys::BootstrapError). In-band result codes of the foreign runtime are
//! plain values, see [`ErrorCode`](crate::builtin::ErrorCode).

mod call_error;
mod conversion_error;

pub use call_error::*;
pub use conversion_error::*;
