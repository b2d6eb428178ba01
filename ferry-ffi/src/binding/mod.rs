/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Explicit runtime context, and its optional process-wide installation.
//!
//! All marshaling code takes a [`Binding`] (or the [`LifecycleTable`] inside it) as a parameter. A binding is only *installed*
//! globally for extern "C" callbacks that receive nothing but userdata from the runtime, and for log forwarding.

use crate::{
    out, BootstrapError, ClassLibraryPtr, ForeignInterface, LifecycleTable,
};

#[cfg(feature = "experimental-threads")]
mod multi_threaded;
#[cfg(not(feature = "experimental-threads"))]
mod single_threaded;

#[cfg(feature = "experimental-threads")]
use multi_threaded::BindingStorage;
#[cfg(not(feature = "experimental-threads"))]
use single_threaded::BindingStorage;

/// Runtime behavior chosen by the library.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Validate that an object is still alive (via its instance ID) before calling methods on it.
    pub check_liveness: bool,

    /// Print failed calls (panics in host callbacks, rejected variant calls) to the runtime's error output.
    pub print_call_errors: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            check_liveness: cfg!(safeguards_balanced),
            print_call_errors: true,
        }
    }
}

/// Validated connection to the foreign runtime.
///
/// Created once in the startup phase with [`Binding::load()`]. Everything that needs the runtime receives it explicitly, which keeps
/// initialization order visible and lets tests run against fake runtimes side by side.
pub struct Binding {
    interface: ForeignInterface,
    library: ClassLibraryPtr,
    lifecycle: LifecycleTable,
    config: BridgeConfig,
}

// SAFETY: all fields are immutable after construction: function pointers, the static version string, and the library token which
// is only passed back to the runtime. Whether a runtime function may be *called* from another thread is up to the runtime.
unsafe impl Send for Binding {}
// SAFETY: see above.
unsafe impl Sync for Binding {}

impl Binding {
    /// Copies and validates the runtime's interface table, and resolves the lifecycle functions.
    ///
    /// # Safety
    /// `interface` must be null or point to a valid table whose function pointers stay callable for the lifetime of the binding.
    #[tracing::instrument(skip_all)]
    pub unsafe fn load(
        interface: *const ForeignInterface,
        library: ClassLibraryPtr,
        config: BridgeConfig,
    ) -> Result<Self, BootstrapError> {
        if interface.is_null() {
            return Err(BootstrapError::NullInterface);
        }

        let interface = *interface;
        validate_interface(&interface)?;
        let lifecycle = LifecycleTable::load(&interface)?;

        tracing::info!(
            target: "ferry::sys",
            version = %interface.version_string(),
            "foreign runtime interface loaded"
        );

        Ok(Self {
            interface,
            library,
            lifecycle,
            config,
        })
    }

    pub fn interface(&self) -> &ForeignInterface {
        &self.interface
    }

    pub fn library(&self) -> ClassLibraryPtr {
        self.library
    }

    pub fn lifecycle(&self) -> &LifecycleTable {
        &self.lifecycle
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("version", &self.interface.version_string())
            .field("library", &self.library)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

macro_rules! require_fns {
    ($interface:expr; $($name:ident),* $(,)?) => {
        $(
            if $interface.$name.is_none() {
                return Err(BootstrapError::MissingInterfaceFn { name: stringify!($name) });
            }
        )*
    };
}

fn validate_interface(interface: &ForeignInterface) -> Result<(), BootstrapError> {
    // print_error/print_warning are optional; logging falls back to tracing only.
    require_fns!(interface;
        get_method_bind,
        method_bind_ptrcall,
        method_bind_call,
        object_get_instance_id,
        object_get_instance_from_id,
        object_set_instance,
        get_release_fn,
        get_copy_fn,
        string_new_with_utf8,
        string_to_utf8,
        classdb_construct_object,
        classdb_register_class,
        classdb_unregister_class,
    );

    Ok(())
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Process-wide installation

/// Installs `binding` for the rest of the process and returns a static reference to it.
///
/// Only the library entry point does this. Without the `experimental-threads` feature, the installing thread becomes the main thread.
pub fn install(binding: Binding) -> Result<&'static Binding, BootstrapError> {
    let installed = BindingStorage::initialize(binding).ok_or(BootstrapError::AlreadyInstalled)?;
    out!("binding installed: {installed:?}");

    Ok(installed)
}

/// The installed binding, if any. Performs no thread check.
pub fn installed() -> Option<&'static Binding> {
    BindingStorage::get()
}

pub fn is_installed() -> bool {
    BindingStorage::get().is_some()
}

/// The installed binding, for callbacks invoked by the runtime.
///
/// # Safety
/// - A binding must have been installed.
/// - Without `experimental-threads`, must be called from the main thread.
#[inline(always)]
pub unsafe fn get_binding() -> &'static Binding {
    BindingStorage::get_unchecked()
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
