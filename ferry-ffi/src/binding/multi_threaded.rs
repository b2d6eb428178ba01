/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Binding storage accessible from any thread.
//!
//! Thread safety of individual runtime calls is then the caller's responsibility.

use std::sync::OnceLock;

use super::Binding;

pub(super) struct BindingStorage {
    binding: OnceLock<Binding>,
}

impl BindingStorage {
    #[inline(always)]
    fn storage() -> &'static Self {
        static BINDING: BindingStorage = BindingStorage {
            binding: OnceLock::new(),
        };

        &BINDING
    }

    #[must_use]
    pub fn initialize(binding: Binding) -> Option<&'static Binding> {
        let storage = Self::storage();
        storage.binding.set(binding).ok()?;
        storage.binding.get()
    }

    pub fn get() -> Option<&'static Binding> {
        Self::storage().binding.get()
    }

    /// # Safety
    /// The binding must be installed.
    #[inline(always)]
    pub unsafe fn get_unchecked() -> &'static Binding {
        match Self::storage().binding.get() {
            Some(binding) => binding,
            None => {
                crate::strict_assert!(false, "foreign runtime not available; is this a unit test without a mock binding?");
                // SAFETY: caller guarantees the binding is installed.
                unsafe { std::hint::unreachable_unchecked() }
            }
        }
    }
}
