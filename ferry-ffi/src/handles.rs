/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Raw handles of indirect wire kinds.
//!
//! A handle is only the bits that travel through a call frame. Who releases the memory behind it is decided one layer up, by the
//! ownership token that wraps the handle.

use crate::{Opaque, WireKind, WireType};

/// Size of string, string name, array and dictionary handles: one pointer.
pub const POINTER_HANDLE_SIZE: usize = std::mem::size_of::<usize>();

/// Size of a variant: type tag plus 16 bytes payload, 8-aligned.
pub const VARIANT_HANDLE_SIZE: usize = 24;

macro_rules! raw_handles {
    ($(
        $(#[$attr:meta])*
        $Handle:ident($size:expr) => $kind:ident;
    )*) => {
        $(
            $(#[$attr])*
            #[repr(transparent)]
            #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
            pub struct $Handle(Opaque<{ $size }>);

            impl $Handle {
                pub const SIZE: usize = $size;

                pub const fn from_opaque(opaque: Opaque<{ $size }>) -> Self {
                    Self(opaque)
                }

                pub const fn opaque(&self) -> &Opaque<{ $size }> {
                    &self.0
                }

                /// Handle with all bits zero; the runtime's empty value.
                pub const fn nil() -> Self {
                    Self(Opaque::zeroed())
                }
            }

            // SAFETY: handles are plain bits owned by the runtime; the layout is the runtime's opaque storage of that size.
            unsafe impl WireType for $Handle {
                type Repr = Self;
                const KIND: WireKind = WireKind::$kind;

                #[inline]
                fn to_repr(self) -> Self {
                    self
                }

                #[inline]
                fn from_repr(repr: Self) -> Self {
                    repr
                }
            }
        )*
    };
}

raw_handles! {
    /// Handle of a foreign string.
    StringHandle(POINTER_HANDLE_SIZE) => String;

    /// Handle of an interned foreign string.
    StringNameHandle(POINTER_HANDLE_SIZE) => StringName;

    ArrayHandle(POINTER_HANDLE_SIZE) => Array;

    DictionaryHandle(POINTER_HANDLE_SIZE) => Dictionary;

    /// Handle of a variant. Unlike the others, this one is stored inline (tag + payload), but payloads may still own memory.
    VariantHandle(VARIANT_HANDLE_SIZE) => Variant;
}

// One-word handles are often plain integers or pointers on the runtime side.
macro_rules! word_conversions {
    ($($Handle:ident),*) => {
        $(
            impl $Handle {
                pub const fn from_word(word: usize) -> Self {
                    Self(Opaque::from_bytes(word.to_ne_bytes()))
                }

                pub const fn word(&self) -> usize {
                    usize::from_ne_bytes(*self.0.as_bytes())
                }
            }
        )*
    };
}

word_conversions!(StringHandle, StringNameHandle, ArrayHandle, DictionaryHandle);

impl VariantHandle {
    /// The first word of a variant is its type tag, in the runtime's numbering.
    pub fn tag(&self) -> u32 {
        let bytes = self.0.as_bytes();
        u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_words() {
        let h = ArrayHandle::from_word(0xdead_beef);
        assert_eq!(h.word(), 0xdead_beef);
        assert_eq!(ArrayHandle::nil().word(), 0);
        assert!(VariantHandle::nil().opaque().is_zeroed());
    }

    #[test]
    fn handle_sizes_match_runtime() {
        assert_eq!(std::mem::size_of::<StringHandle>(), POINTER_HANDLE_SIZE);
        assert_eq!(std::mem::size_of::<VariantHandle>(), VARIANT_HANDLE_SIZE);
    }
}
