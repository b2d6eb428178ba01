/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Often-imported symbols.

pub use super::builtin::resources::{Array, Dictionary, GString, RawObject, StringName, Variant};
pub use super::builtin::{
    real, Basis, Color, ErrorCode, Plane, Quaternion, Rect2, Rect2i, Transform2D, Transform3D, Vector2,
    Vector2i, Vector3, Vector3i, Vector4, Vector4i,
};
pub use super::init::{BridgeConfig, BridgeLibrary, InitLevel};
pub use super::lifetime::{Ownership, Scope, Token, Tracked};
pub use super::meta::error::{CallError, ConversionError};
pub use super::obj::{ForeignClass, HostClass, Inherits, InstanceId, NoBase, Object, ObjectRef};
pub use super::registry::Invocation;
pub use super::sys::{BootstrapError, CallFrame, MethodHandle, WireType};

// Re-export macros.
pub use super::{bridge_library, engine_class, ferry_api, ferry_error, ferry_print, ferry_warn, WireType};

// Make trait methods available.
pub use super::builtin::GlamConv as _;
