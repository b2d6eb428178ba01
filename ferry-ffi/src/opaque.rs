/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

// Note: transmute not supported for const generics; see
// https://users.rust-lang.org/t/transmute-in-the-context-of-constant-generics/56827

/// Stores the bits of a foreign handle of a certain size, with very restricted operations.
///
/// The host never interprets these bytes; only the foreign runtime does. Due to `align(8)` and not `packed` repr, this type may be
/// bigger than `N` bytes, which is fine since the runtime only reads and writes those `N` bytes.
#[cfg_attr(target_pointer_width = "32", repr(C, align(4)))]
#[cfg_attr(target_pointer_width = "64", repr(C, align(8)))]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Opaque<const N: usize> {
    storage: [u8; N],
    marker: std::marker::PhantomData<*const u8>, // disable Send/Sync
}

impl<const N: usize> Opaque<N> {
    /// All-zero bits, which the runtime treats as the "nil"/empty value of every indirect kind.
    pub const fn zeroed() -> Self {
        Self::from_bytes([0; N])
    }

    pub const fn from_bytes(storage: [u8; N]) -> Self {
        Self {
            storage,
            marker: std::marker::PhantomData,
        }
    }

    pub const fn as_bytes(&self) -> &[u8; N] {
        &self.storage
    }

    pub fn is_zeroed(&self) -> bool {
        self.storage.iter().all(|&b| b == 0)
    }
}

impl<const N: usize> std::fmt::Debug for Opaque<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Opaque(0x")?;
        for byte in self.storage.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
