/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Self-registration of method tables and host classes.
//!
//! Each declaration pushes an entry into a [`PluginRegistry`] from a static constructor, before `main` (or before the library entry
//! point, for a dynamic library). The init layer then walks the registry when a level is loaded, so no central list is needed.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Entries added by [`plugin_add!`], in link order.
pub struct PluginRegistry<T> {
    entries: Mutex<Vec<T>>,
}

impl<T> PluginRegistry<T> {
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, entry: T) {
        self.lock().push(entry);
    }

    /// Visits every entry. The registry stays locked meanwhile, so `visit` must not add entries.
    pub fn for_each(&self, mut visit: impl FnMut(&T)) {
        self.lock().iter().for_each(|entry| visit(entry));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while visiting leaves the entries intact.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Declares a registry named `$registry`, holding entries of type `$Type`.
#[doc(hidden)]
#[macro_export]
macro_rules! plugin_registry {
    ($vis:vis $registry:ident: $Type:ty) => {
        $crate::paste::paste! {
            #[used]
            #[allow(non_upper_case_globals)]
            #[doc(hidden)]
            $vis static [< __ferry_plugin_ $registry >]: $crate::plugins::PluginRegistry<$Type> = $crate::plugins::PluginRegistry::new();
        }
    };
}

#[doc(hidden)]
#[macro_export]
#[cfg_attr(rustfmt, rustfmt::skip)]
macro_rules! plugin_add_inner {
    ($registry:ident; $plugin:expr; $( $path_tt:tt )* ) => {
        const _: () = {
            // Static constructor: the loader runs everything in these sections before handing over control.
            #[allow(non_upper_case_globals)]
            #[used]
            #[cfg_attr(target_os = "windows", link_section = ".CRT$XCU")]
            #[cfg_attr(any(target_os = "macos", target_os = "ios"), link_section = "__DATA,__mod_init_func")]
            #[cfg_attr(
                any(
                    target_os = "linux",
                    target_os = "android",
                    target_os = "freebsd",
                    target_os = "netbsd",
                    target_os = "openbsd",
                    target_os = "dragonfly",
                ),
                link_section = ".init_array"
            )]
            static __register: extern "C" fn() = {
                #[cfg_attr(any(target_os = "linux", target_os = "android"), link_section = ".text.startup")]
                extern "C" fn __register_plugin() {
                    $crate::paste::paste!( $( $path_tt )* [< __ferry_plugin_ $registry >] ).add($plugin);
                }
                __register_plugin
            };
        };
    };
}

/// Adds an entry to a registry declared with [`plugin_registry!`], before `main` runs.
///
/// Use `REGISTRY in path::to::module` when the registry lives in another module or crate.
#[doc(hidden)]
#[macro_export]
macro_rules! plugin_add {
    ( $registry:ident; $plugin:expr ) => {
        $crate::plugin_add_inner!($registry; $plugin; );
    };

    ( $registry:ident in $path:path; $plugin:expr ) => {
        $crate::plugin_add_inner!($registry; $plugin; $path ::);
    };
}

/// Calls `$visit` with a reference to each entry of a registry, in unspecified order.
#[doc(hidden)]
#[macro_export]
#[cfg_attr(rustfmt, rustfmt::skip)]
macro_rules! plugin_foreach {
    ( $registry:ident; $visit:expr ) => {
        $crate::paste::paste!( [< __ferry_plugin_ $registry >] ).for_each($visit)
    };
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
