/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Library entry point and per-level initialization.

use std::ffi::c_void;

use crate::ferry_error;
use crate::registry::class;
use crate::sys;
use sys::out;

pub use sys::BridgeConfig;

#[doc(hidden)]
#[deny(unsafe_op_in_unsafe_fn)]
pub unsafe fn __ferry_load_library<E: BridgeLibrary>(
    interface: *const sys::ForeignInterface,
    library: sys::ClassLibraryPtr,
    init: *mut sys::Initialization,
) -> sys::Bool {
    let init_code = || {
        // Checked before anything is installed, so that a rejected load leaves no global state behind.
        if init.is_null() {
            ferry_error!("runtime passed null initialization record");
            return 0;
        }

        // SAFETY: the runtime passes its interface table, valid for the lifetime of the process.
        let binding = match unsafe { sys::Binding::load(interface, library, E::config()) } {
            Ok(binding) => binding,
            Err(err) => {
                ferry_error!("failed to load foreign interface: {err}");
                return 0;
            }
        };

        if let Err(err) = sys::install(binding) {
            ferry_error!("failed to install binding: {err}");
            return 0;
        }

        let init_params = sys::Initialization {
            minimum_level: E::min_level().to_sys(),
            userdata: std::ptr::null_mut(),
            initialize: Some(ffi_initialize_layer::<E>),
            deinitialize: Some(ffi_deinitialize_layer::<E>),
        };

        // SAFETY: checked for null; the runtime owns the record and expects it filled.
        unsafe { *init = init_params };

        1
    };

    let ctx = || "error when loading ferry library";
    crate::private::handle_panic(ctx, init_code).unwrap_or(0)
}

unsafe extern "C" fn ffi_initialize_layer<E: BridgeLibrary>(_userdata: *mut c_void, init_level: sys::InitLevelSys) {
    let level = InitLevel::from_sys(init_level);
    let ctx = || format!("failed to initialize ferry level `{level:?}`");

    // Swallow panics.
    let _ = crate::private::handle_panic(ctx, || {
        // SAFETY: the runtime calls this from the main thread, after __ferry_load_library() installed the binding.
        let binding = unsafe { sys::get_binding() };

        on_level_init(binding, level);
        E::on_level_init(level);
    });
}

unsafe extern "C" fn ffi_deinitialize_layer<E: BridgeLibrary>(_userdata: *mut c_void, init_level: sys::InitLevelSys) {
    let level = InitLevel::from_sys(init_level);
    let ctx = || format!("failed to deinitialize ferry level `{level:?}`");

    // Swallow panics.
    let _ = crate::private::handle_panic(ctx, || {
        E::on_level_deinit(level);
        on_level_deinit(level);
    });
}

/// Internal work upon loading a level. Runs before user code.
fn on_level_init(binding: &'static sys::Binding, level: InitLevel) {
    match sys::load_method_tables(binding, level) {
        Ok(count) => {
            out!("level {level:?}: {count} method tables loaded");
        }
        Err(err) => {
            // Generated code calls through these handles unchecked.
            ferry_error!("level {level:?}: {err}");
            std::process::abort();
        }
    }

    class::auto_register_classes(binding, level);
}

/// Internal work upon unloading a level. Runs after user code.
fn on_level_deinit(level: InitLevel) {
    class::unregister_classes(level);
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Defines the entry point of a ferry library.
///
/// Every library has exactly one implementation of this trait, always combined with the
/// `#[bridge_library]` attribute. Classes declared with `#[ferry_api]` are registered automatically.
///
/// ```ignore
/// struct MyLibrary;
///
/// #[bridge_library]
/// unsafe impl BridgeLibrary for MyLibrary {}
/// ```
///
/// # Safety
/// The library cannot check what the runtime or other loaded libraries do with the objects it hands out.
/// Implementing this trait means accepting that foreign code upholds the ownership contract of each call.
pub unsafe trait BridgeLibrary {
    /// Lowest level at which the library is loaded (`Scene` by default).
    fn min_level() -> InitLevel {
        InitLevel::Scene
    }

    /// Settings of the binding, read once when the library is loaded.
    fn config() -> BridgeConfig {
        BridgeConfig::default()
    }

    /// Custom logic when a level is loaded.
    ///
    /// Invoked for levels >= [`Self::min_level()`], in ascending order, after the classes of that level are registered.
    #[allow(unused_variables)]
    fn on_level_init(level: InitLevel) {
        // Nothing by default.
    }

    /// Custom logic when a level is unloaded.
    ///
    /// Invoked in descending order, before the classes of that level are unregistered.
    #[allow(unused_variables)]
    fn on_level_deinit(level: InitLevel) {
        // Nothing by default.
    }
}

/// Stage of the runtime's initialization. Deinitialization happens in reverse order.
pub type InitLevel = sys::InitLevel;
