/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::sys;

/// Marker for a kind of foreign resource, i.e. a value that refers to foreign-owned memory.
///
/// Implementors are uninhabited types in [`builtin::resources`](crate::builtin::resources); they only select the handle type and the
/// lifecycle functions used to copy and release it.
pub trait Resource: 'static {
    /// Raw bits that travel through call frames. Its wire kind must be [`KIND`](Self::KIND)'s wire kind.
    type Handle: sys::WireType + std::fmt::Debug;

    const KIND: sys::ResourceKind;
}
