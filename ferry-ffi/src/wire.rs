/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::mem::{align_of, size_of};

use crate::{ConstTypePtr, ObjectPtr, TypePtr, WireKindSys, SLOT_ALIGN, SLOT_BYTES};

/// Shape of a value as understood by both sides of the call convention.
///
/// This set is closed: the runtime only knows these layouts. User-defined `#[repr(C)]` structs composed of wire types are reported as
/// [`Aggregate`](Self::Aggregate).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(u32)]
pub enum WireKind {
    Nil = 0,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,

    Vector2,
    Vector2i,
    Vector3,
    Vector3i,
    Vector4,
    Vector4i,
    Color,
    Rect2,
    Rect2i,
    Quaternion,
    Plane,
    Transform2D,
    Basis,
    Transform3D,
    Aggregate,

    Object,
    String,
    StringName,
    Array,
    Dictionary,
    Variant,
}

impl WireKind {
    pub const COUNT: usize = 33;

    /// All kinds, in tag order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Nil,
        Self::Bool,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::Vector2,
        Self::Vector2i,
        Self::Vector3,
        Self::Vector3i,
        Self::Vector4,
        Self::Vector4i,
        Self::Color,
        Self::Rect2,
        Self::Rect2i,
        Self::Quaternion,
        Self::Plane,
        Self::Transform2D,
        Self::Basis,
        Self::Transform3D,
        Self::Aggregate,
        Self::Object,
        Self::String,
        Self::StringName,
        Self::Array,
        Self::Dictionary,
        Self::Variant,
    ];

    pub const fn to_sys(self) -> WireKindSys {
        self as WireKindSys
    }

    pub fn from_sys(sys: WireKindSys) -> Option<Self> {
        Self::ALL.get(sys as usize).copied()
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Whether values of this kind refer to foreign-owned memory, and thus need release.
    pub fn is_indirect(self) -> bool {
        self.resource_kind().is_some()
    }

    pub fn resource_kind(self) -> Option<ResourceKind> {
        let kind = match self {
            Self::Object => ResourceKind::Object,
            Self::String => ResourceKind::String,
            Self::StringName => ResourceKind::StringName,
            Self::Array => ResourceKind::Array,
            Self::Dictionary => ResourceKind::Dictionary,
            Self::Variant => ResourceKind::Variant,
            _ => return None,
        };

        Some(kind)
    }
}

/// Indirect wire kinds: values that are handles to foreign-owned memory.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ResourceKind {
    Object,
    String,
    StringName,
    Array,
    Dictionary,
    Variant,
}

impl ResourceKind {
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Object,
        Self::String,
        Self::StringName,
        Self::Array,
        Self::Dictionary,
        Self::Variant,
    ];

    pub const fn wire_kind(self) -> WireKind {
        match self {
            Self::Object => WireKind::Object,
            Self::String => WireKind::String,
            Self::StringName => WireKind::StringName,
            Self::Array => WireKind::Array,
            Self::Dictionary => WireKind::Dictionary,
            Self::Variant => WireKind::Variant,
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// WireType

/// Types that can be placed into a call frame slot and read back from a return slot.
///
/// Implemented for fixed-width integers, floats, `bool`, `()`, object pointers and the raw handles of indirect kinds. Higher layers
/// add aggregates (vectors, colors, transforms) and `#[derive(WireType)]` covers user `#[repr(C)]` structs.
///
/// A type whose representation does not fit into a frame slot is rejected when the frame is instantiated with it, at compile time.
///
/// # Safety
/// `Repr` must have exactly the in-memory layout the foreign runtime uses for [`KIND`](Self::KIND), and every bit pattern the runtime
/// may write must be a valid `Repr`.
pub unsafe trait WireType: Copy + 'static {
    /// Layout shared with the foreign side.
    type Repr: Copy + 'static;

    const KIND: WireKind;

    fn to_repr(self) -> Self::Repr;

    fn from_repr(repr: Self::Repr) -> Self;

    #[doc(hidden)]
    const FITS_SLOT: () = assert!(
        size_of::<Self::Repr>() <= SLOT_BYTES && align_of::<Self::Repr>() <= SLOT_ALIGN,
        "wire type does not fit into a call frame slot"
    );
}

/// Reads argument `index` from a foreign argument array.
///
/// # Safety
/// `args` must point to at least `index + 1` pointers, and the one at `index` must point to a valid `T::Repr`.
#[inline]
pub unsafe fn read_arg<T: WireType>(args: *const ConstTypePtr, index: usize) -> T {
    let arg = *args.add(index);
    T::from_repr(arg.cast::<T::Repr>().read())
}

/// Writes `value` into a foreign return slot.
///
/// # Safety
/// `ret` must point to writable storage for a `T::Repr`. Any previous value is overwritten without being released.
#[inline]
pub unsafe fn write_return<T: WireType>(ret: TypePtr, value: T) {
    ret.cast::<T::Repr>().write(value.to_repr());
}

macro_rules! impl_wire_identity {
    ($($T:ty => $kind:ident),* $(,)?) => {
        $(
            // SAFETY: primitive with identical layout on both sides; all bit patterns are valid.
            unsafe impl WireType for $T {
                type Repr = $T;
                const KIND: WireKind = WireKind::$kind;

                #[inline]
                fn to_repr(self) -> Self::Repr {
                    self
                }

                #[inline]
                fn from_repr(repr: Self::Repr) -> Self {
                    repr
                }
            }
        )*
    };
}

impl_wire_identity! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    () => Nil,
    ObjectPtr => Object,
}

// The runtime's bool is one byte, but it may write values other than 0 and 1. Reading those as Rust `bool` would be UB.
// SAFETY: `u8` accepts every bit pattern.
unsafe impl WireType for bool {
    type Repr = u8;
    const KIND: WireKind = WireKind::Bool;

    #[inline]
    fn to_repr(self) -> u8 {
        crate::conv::bool_to_sys(self)
    }

    #[inline]
    fn from_repr(repr: u8) -> Self {
        repr != 0
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_kind_sys_roundtrip() {
        for (index, kind) in WireKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.to_sys() as usize, index);
        }

        for sys in 0..33 {
            let kind = WireKind::from_sys(sys).expect("valid kind");
            assert_eq!(kind.to_sys(), sys);
        }

        assert_eq!(WireKind::from_sys(33), None);
    }

    #[test]
    fn indirect_kinds() {
        assert!(WireKind::Variant.is_indirect());
        assert!(WireKind::Object.is_indirect());
        assert!(!WireKind::Transform3D.is_indirect());
        assert!(!WireKind::Int64.is_indirect());

        for kind in ResourceKind::ALL {
            assert_eq!(kind.wire_kind().resource_kind(), Some(kind));
        }
    }

    #[test]
    fn bool_accepts_foreign_truthy_bytes() {
        assert!(bool::from_repr(2));
        assert!(!bool::from_repr(0));
        assert_eq!(true.to_repr(), 1);
    }
}
