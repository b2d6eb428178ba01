/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Ownership of foreign resources.
//!
//! A [`Token`] wraps the raw handle of a foreign resource together with its [`Ownership`]. Only `Owned` tokens ever release foreign
//! memory, and they do so exactly once: tokens are linear (neither `Copy` nor `Clone`), release consumes them, and dropping an owned
//! token releases it.
//!
//! A [`Scope`] batches tokens of one logical operation, typically one call crossing the boundary, and releases them together in
//! reverse registration order. Scopes end on every exit path, since [`Scope::end()`] also runs on drop.

mod resource;
mod scope;
mod token;

pub use resource::Resource;
pub use scope::{Scope, Tracked};
pub use token::{Ownership, Token};
