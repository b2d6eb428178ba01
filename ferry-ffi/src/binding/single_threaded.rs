/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Binding storage bound to the thread that installed it.
//!
//! Used from another thread, [`BindingStorage::get_unchecked()`] panics with strict safeguards and is UB otherwise.

use std::sync::OnceLock;
use std::thread::ThreadId;

use super::Binding;

pub(super) struct BindingStorage {
    binding: OnceLock<Binding>,
    main_thread: OnceLock<ThreadId>,
}

impl BindingStorage {
    #[inline(always)]
    fn storage() -> &'static Self {
        static BINDING: BindingStorage = BindingStorage {
            binding: OnceLock::new(),
            main_thread: OnceLock::new(),
        };

        &BINDING
    }

    /// Returns `None` if a binding has already been installed.
    #[must_use]
    pub fn initialize(binding: Binding) -> Option<&'static Binding> {
        let storage = Self::storage();

        storage.binding.set(binding).ok()?;
        // Cannot fail: only set after a successful binding set, which happens once.
        let _ = storage.main_thread.set(std::thread::current().id());

        storage.binding.get()
    }

    pub fn get() -> Option<&'static Binding> {
        Self::storage().binding.get()
    }

    /// # Safety
    /// - Must be called from the main thread.
    /// - The binding must be installed.
    #[inline(always)]
    pub unsafe fn get_unchecked() -> &'static Binding {
        let storage = Self::storage();

        crate::strict_assert_eq!(
            storage.main_thread.get(),
            Some(&std::thread::current().id()),
            "binding accessed from a thread other than the main thread; enable the \"experimental-threads\" feature"
        );

        match storage.binding.get() {
            Some(binding) => binding,
            None => {
                crate::strict_assert!(false, "foreign runtime not available; is this a unit test without a mock binding?");
                // SAFETY: caller guarantees the binding is installed.
                unsafe { std::hint::unreachable_unchecked() }
            }
        }
    }
}
