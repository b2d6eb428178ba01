/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Built-in wire types: vector algebra aggregates, in-band error codes and the markers of foreign resources.
//!
//! Aggregates are `#[repr(C)]` structs with the runtime's in-memory layout, so they travel through call frames by value. Each converts
//! to and from the corresponding [`glam`] type, which carries the actual math; only a few convenience methods are re-implemented here.
//!
//! Values that refer to foreign-owned memory (strings, arrays, dictionaries, variants, objects) are not structs, but
//! [resources](resources) handled through [`Token`](crate::lifetime::Token)s.

mod color;
mod error_code;
mod math;
mod plane;
mod quaternion;
mod rect;
mod transforms;
mod vectors;

pub mod resources;

pub use color::*;
pub use error_code::*;
pub use math::GlamConv;
pub use plane::*;
pub use quaternion::*;
pub use rect::*;
pub use transforms::*;
pub use vectors::*;

/// Floating-point type of all aggregates. The runtime uses 32-bit floats in its vector types.
#[allow(non_camel_case_types)]
pub type real = f32;

/// Implements `WireType` for built-in aggregates whose Rust layout is the wire layout.
macro_rules! impl_wire_aggregate {
    ($( $T:ty => $kind:ident, $size:expr; )*) => {
        $(
            // SAFETY: #[repr(C)] with the runtime's field order; every bit pattern of the float/int fields is valid.
            unsafe impl $crate::sys::WireType for $T {
                type Repr = Self;
                const KIND: $crate::sys::WireKind = $crate::sys::WireKind::$kind;

                #[inline]
                fn to_repr(self) -> Self {
                    self
                }

                #[inline]
                fn from_repr(repr: Self) -> Self {
                    repr
                }
            }

            $crate::sys::static_assert!(std::mem::size_of::<$T>() == $size);
        )*
    };
}

impl_wire_aggregate! {
    Vector2 => Vector2, 8;
    Vector2i => Vector2i, 8;
    Vector3 => Vector3, 12;
    Vector3i => Vector3i, 12;
    Vector4 => Vector4, 16;
    Vector4i => Vector4i, 16;
    Color => Color, 16;
    Rect2 => Rect2, 16;
    Rect2i => Rect2i, 16;
    Quaternion => Quaternion, 16;
    Plane => Plane, 16;
    Transform2D => Transform2D, 24;
    Basis => Basis, 36;
    Transform3D => Transform3D, 48;
}
