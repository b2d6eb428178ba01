/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Method handles: foreign methods resolved once by name, then called through a cached pointer.

use std::ffi::CStr;
use std::sync::OnceLock;

use crate::{
    out, Binding, BootstrapError, CallErrorSys, CallFrame, ConstVariantPtr, InitLevel,
    MethodBindPtr, ObjectPtr, PtrcallFn, VarcallFn, VariantPtr,
};

/// Identifies a foreign method for resolution.
///
/// The hash encodes the method's signature on the runtime side. If the runtime's signature changed (version mismatch), resolution fails
/// instead of yielding a handle with a different call frame layout.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MethodKey {
    pub class: &'static CStr,
    pub method: &'static CStr,
    pub hash: i64,
}

impl MethodKey {
    pub const fn new(class: &'static CStr, method: &'static CStr, hash: i64) -> Self {
        Self {
            class,
            method,
            hash,
        }
    }
}

impl std::fmt::Display for MethodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}",
            self.class.to_string_lossy(),
            self.method.to_string_lossy()
        )
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// A resolved foreign method.
///
/// Holds the method bind together with the runtime's call entry points, so dispatching needs no access to any global state. Handles
/// are valid for the rest of the process once resolved, and cheap to copy.
#[derive(Copy, Clone)]
pub struct MethodHandle {
    bind: MethodBindPtr,
    ptrcall: PtrcallFn,
    varcall: Option<VarcallFn>,
}

// SAFETY: a method bind is an immutable, process-lifetime pointer on the runtime side; sharing the pointer value across threads is fine.
// Whether a given method may be *called* from another thread is up to the runtime and documented per method.
unsafe impl Send for MethodHandle {}
// SAFETY: see above.
unsafe impl Sync for MethodHandle {}

impl MethodHandle {
    /// Looks up a method by class, name and hash.
    ///
    /// This is the only place where strings are involved; call sites keep the returned handle.
    pub fn resolve(binding: &Binding, key: &MethodKey) -> Result<Self, BootstrapError> {
        let get_method_bind = crate::interface_fn!(binding, get_method_bind);

        // SAFETY: both names are valid NUL-terminated strings; the runtime copies what it needs.
        let bind = unsafe { get_method_bind(key.class.as_ptr(), key.method.as_ptr(), key.hash) };

        if bind.is_null() {
            return Err(BootstrapError::UnresolvedMethod {
                class: key.class.to_string_lossy().into_owned(),
                method: key.method.to_string_lossy().into_owned(),
                hash: key.hash,
            });
        }

        out!("resolved method {key} -> {bind:?}");

        Ok(Self {
            bind,
            ptrcall: crate::interface_fn!(binding, method_bind_ptrcall),
            varcall: binding.interface().method_bind_call,
        })
    }

    /// Assembles a handle from parts obtained elsewhere.
    ///
    /// # Safety
    /// `ptrcall` (and `varcall`, if given) must accept `bind` as method argument, for the rest of the process.
    pub unsafe fn from_raw(bind: MethodBindPtr, ptrcall: PtrcallFn, varcall: Option<VarcallFn>) -> Self {
        Self {
            bind,
            ptrcall,
            varcall,
        }
    }

    pub fn bind_ptr(&self) -> MethodBindPtr {
        self.bind
    }
}

impl std::fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodHandle({:p})", self.bind)
    }
}

/// Calls a method through its handle, with arguments and return slot in `frame`.
///
/// `receiver` is null for static methods. After this returns, the return slot reserved with [`CallFrame::ret()`] holds the result.
///
/// # Safety
/// - The frame's arguments and return slot must match the method's signature in count, order and wire type.
/// - `receiver` must be null (static methods only) or point to a live object of the method's class.
#[inline]
pub unsafe fn dispatch(handle: MethodHandle, receiver: ObjectPtr, frame: &mut CallFrame) {
    let args = frame.arg_ptrs();
    let ret = frame.ret_ptr();

    (handle.ptrcall)(handle.bind, receiver, args, ret);
    frame.mark_returned();
}

/// Calls a method with variant arguments. The runtime validates argument count and types, and reports failure through the returned
/// error struct (`error == CALL_OK` on success).
///
/// # Safety
/// - Each pointer in `args` must point to a valid variant.
/// - `ret` must point to storage for one variant, which the runtime initializes.
/// - `receiver` must be null or point to a live object.
pub unsafe fn dispatch_varcall(
    handle: MethodHandle,
    receiver: ObjectPtr,
    args: &[ConstVariantPtr],
    ret: VariantPtr,
) -> CallErrorSys {
    let Some(varcall) = handle.varcall else {
        crate::missing_interface_fn("method_bind_call");
    };

    let mut error = CallErrorSys::default();
    varcall(
        handle.bind,
        receiver,
        args.as_ptr(),
        crate::conv::len_to_int(args.len()),
        ret,
        &mut error,
    );

    error
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Method handle resolved on first use, then cached for the rest of the process.
///
/// Useful for methods called rarely enough that loading them eagerly with their whole table is not worth it.
pub struct LazyMethodHandle {
    key: MethodKey,
    cell: OnceLock<MethodHandle>,
}

impl LazyMethodHandle {
    pub const fn new(key: MethodKey) -> Self {
        Self {
            key,
            cell: OnceLock::new(),
        }
    }

    /// Returns the handle, resolving it if this is the first access.
    ///
    /// # Panics
    /// If resolution fails. A method that cannot be resolved means the runtime does not match the expected API; continuing would
    /// corrupt call frames.
    pub fn get(&self, binding: &Binding) -> MethodHandle {
        *self.cell.get_or_init(|| {
            MethodHandle::resolve(binding, &self.key).unwrap_or_else(|err| bootstrap_failed(err))
        })
    }

    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Reports a bootstrap failure and panics.
#[cold]
pub fn bootstrap_failed(err: BootstrapError) -> ! {
    tracing::error!(target: "ferry::sys", error = %err, "bootstrap failed");
    panic!("ferry bootstrap failed: {err}")
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Method tables

/// Registration of a method table, loaded when its init level starts.
#[derive(Copy, Clone, Debug)]
pub struct MethodTableLoader {
    pub name: &'static str,
    pub level: InitLevel,
    pub init: fn(&Binding) -> Result<(), BootstrapError>,
}

crate::plugin_registry!(pub METHOD_TABLES: MethodTableLoader);

/// Resolves all method tables registered for `level`.
///
/// Stops at the first method that fails to resolve.
#[tracing::instrument(skip(binding))]
pub fn load_method_tables(binding: &Binding, level: InitLevel) -> Result<usize, BootstrapError> {
    let mut loaders = Vec::new();
    crate::plugin_foreach!(METHOD_TABLES; |loader: &MethodTableLoader| {
        if loader.level == level {
            loaders.push(*loader);
        }
    });

    // Registration order depends on the linker; sort for reproducible logs and errors.
    loaders.sort_by_key(|loader| loader.name);

    for loader in &loaders {
        out!("load method table {} at {level:?}", loader.name);
        (loader.init)(binding)?;
    }

    Ok(loaders.len())
}

/// Declares a table of method handles, resolved together when an init level is loaded.
///
/// ```ignore
/// method_table! {
///     /// Methods of the `Node` class.
///     pub struct NodeMethods at Scene {
///         get_name => c"Node"::c"get_name" @ 2002593661,
///         add_child => c"Node"::c"add_child" @ 3863233950,
///     }
/// }
///
/// let handle = NodeMethods::get().get_name;
/// ```
#[macro_export]
macro_rules! method_table {
    (
        $(#[$attr:meta])*
        $vis:vis struct $Table:ident at $level:ident {
            $( $field:ident => $class:literal :: $method:literal @ $hash:literal ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        $vis struct $Table {
            $( pub $field: $crate::MethodHandle, )*
        }

        impl $Table {
            pub const KEYS: &'static [$crate::MethodKey] = &[
                $( $crate::MethodKey::new($class, $method, $hash), )*
            ];

            /// Resolves every method of the table.
            pub fn load(binding: &$crate::Binding) -> Result<Self, $crate::BootstrapError> {
                Ok(Self {
                    $( $field: $crate::MethodHandle::resolve(binding, &$crate::MethodKey::new($class, $method, $hash))?, )*
                })
            }

            fn __cell() -> &'static ::std::sync::OnceLock<$Table> {
                static CELL: ::std::sync::OnceLock<$Table> = ::std::sync::OnceLock::new();
                &CELL
            }

            /// Loads the table into its process-wide slot. Later calls, concurrent ones included, keep the first table and
            /// resolve nothing.
            pub fn init(binding: &$crate::Binding) -> Result<(), $crate::BootstrapError> {
                // Held across load(), so that only one caller resolves. A failed load leaves the slot empty for a retry.
                static LOADING: $crate::Global<()> = $crate::Global::default();
                let _loading = LOADING.lock();

                if Self::__cell().get().is_none() {
                    let table = Self::load(binding)?;
                    Self::__cell().get_or_init(|| table);
                }
                Ok(())
            }

            pub fn is_loaded() -> bool {
                Self::__cell().get().is_some()
            }

            /// # Panics
            /// If the table's init level has not been loaded yet.
            pub fn get() -> &'static Self {
                match Self::__cell().get() {
                    Some(table) => table,
                    None => panic!(
                        "method table `{}` used before init level {:?} was loaded",
                        stringify!($Table),
                        $crate::InitLevel::$level,
                    ),
                }
            }
        }

        $crate::plugin_add!(METHOD_TABLES in $crate::method; $crate::method::MethodTableLoader {
            name: stringify!($Table),
            level: $crate::InitLevel::$level,
            init: $Table::init,
        });
    };
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
