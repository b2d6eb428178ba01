/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! C ABI of the foreign runtime.
//!
//! Everything in this module mirrors the layout the runtime expects. Function pointers are `Option<...>` so that a missing entry is
//! a null pointer on the foreign side, and can be detected once during [`Binding::load()`](crate::Binding::load).

use std::ffi::{c_char, c_void};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Pointer aliases

/// Pointer to a foreign object.
pub type ObjectPtr = *mut c_void;

/// Pointer to a value of some wire type, writable.
pub type TypePtr = *mut c_void;

/// Pointer to a value of some wire type, read-only.
pub type ConstTypePtr = *const c_void;

/// Pointer to storage that the foreign side initializes (constructors, copy functions).
pub type UninitTypePtr = *mut c_void;

/// Pointer to a variant value.
pub type VariantPtr = *mut c_void;

/// Pointer to a read-only variant value.
pub type ConstVariantPtr = *const c_void;

/// Opaque pointer identifying a resolved foreign method.
pub type MethodBindPtr = *const c_void;

/// Pointer to host-side instance data, handed to the runtime when binding a host class to a foreign object.
pub type InstancePtr = *mut c_void;

/// Token identifying this library towards the runtime.
pub type ClassLibraryPtr = *mut c_void;

pub type Bool = u8;
pub type Int = i64;

/// Numeric representation of [`WireKind`](crate::WireKind).
pub type WireKindSys = u32;

/// Numeric representation of [`InitLevel`](crate::InitLevel).
pub type InitLevelSys = u32;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Function pointer types

/// Calls a method bind with pointer arguments.
pub type PtrcallFn = unsafe extern "C" fn(
    method: MethodBindPtr,
    receiver: ObjectPtr,
    args: *const ConstTypePtr,
    ret: TypePtr,
);

/// Calls a method bind with variant arguments; failure is reported through `error`.
pub type VarcallFn = unsafe extern "C" fn(
    method: MethodBindPtr,
    receiver: ObjectPtr,
    args: *const ConstVariantPtr,
    arg_count: Int,
    ret: VariantPtr,
    error: *mut CallErrorSys,
);

/// Releases a value of an indirect wire kind: destructor for builtins, reference decrement for objects.
pub type ReleaseFn = unsafe extern "C" fn(value: TypePtr);

/// Initializes `dst` with a new owned copy of `src`. For reference-counted values, this increments the count.
pub type CopyFn = unsafe extern "C" fn(dst: UninitTypePtr, src: ConstTypePtr);

/// Initializes the variant `dst` from a value of one wire kind. Indirect values are copied; `src` keeps its ownership.
pub type VariantFromTypeFn = unsafe extern "C" fn(dst: VariantPtr, src: ConstTypePtr);

/// Initializes `dst` with the payload of the variant `src`, which must hold the constructor's wire kind. Indirect payloads come out
/// as new owned values.
pub type VariantToTypeFn = unsafe extern "C" fn(dst: UninitTypePtr, src: ConstVariantPtr);

/// Entry point of a host-defined virtual method, invoked by the runtime with userdata obtained from `get_virtual_call_data`.
pub type CallVirtualFn = unsafe extern "C" fn(
    instance: InstancePtr,
    name: *const c_char,
    call_data: *mut c_void,
    args: *const ConstTypePtr,
    ret: TypePtr,
);

pub type PrintFn = unsafe extern "C" fn(
    description: *const c_char,
    function: *const c_char,
    file: *const c_char,
    line: i32,
    editor_notify: Bool,
);

/// Signature of the library entry point exported to the runtime.
pub type InitializationFn = unsafe extern "C" fn(
    interface: *const ForeignInterface,
    library: ClassLibraryPtr,
    init: *mut Initialization,
) -> Bool;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Structs

/// Error reported by a variant call.
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct CallErrorSys {
    pub error: CallErrorType,
    pub argument: i32,
    pub expected: i32,
}

pub type CallErrorType = u32;

pub const CALL_OK: CallErrorType = 0;
pub const CALL_ERROR_INVALID_METHOD: CallErrorType = 1;
pub const CALL_ERROR_INVALID_ARGUMENT: CallErrorType = 2;
pub const CALL_ERROR_TOO_MANY_ARGUMENTS: CallErrorType = 3;
pub const CALL_ERROR_TOO_FEW_ARGUMENTS: CallErrorType = 4;
pub const CALL_ERROR_INSTANCE_IS_NULL: CallErrorType = 5;
pub const CALL_ERROR_METHOD_NOT_CONST: CallErrorType = 6;

/// Error code used when the host itself fails a call (panic, reentrant borrow, ...). The `argument` field then carries an id into
/// the host's error registry.
pub const CALL_ERROR_HOST_CUSTOM: CallErrorType = 40;

/// Filled in by the library entry point.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct Initialization {
    pub minimum_level: InitLevelSys,
    pub userdata: *mut c_void,
    pub initialize: Option<unsafe extern "C" fn(userdata: *mut c_void, level: InitLevelSys)>,
    pub deinitialize: Option<unsafe extern "C" fn(userdata: *mut c_void, level: InitLevelSys)>,
}

/// Callbacks describing a host-defined class.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct ClassCreationInfo {
    pub class_userdata: *mut c_void,
    pub create_instance: Option<unsafe extern "C" fn(class_userdata: *mut c_void) -> ObjectPtr>,
    pub free_instance: Option<unsafe extern "C" fn(class_userdata: *mut c_void, instance: InstancePtr)>,

    /// Looked up once per (class, virtual name). Returns null if the class does not override that method.
    pub get_virtual_call_data:
        Option<unsafe extern "C" fn(class_userdata: *mut c_void, name: *const c_char) -> *mut c_void>,
    pub call_virtual_with_data: Option<CallVirtualFn>,
}

/// Function table provided by the foreign runtime.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct ForeignInterface {
    pub version_major: u32,
    pub version_minor: u32,
    pub version_string: *const c_char,

    pub get_method_bind: Option<
        unsafe extern "C" fn(class: *const c_char, method: *const c_char, hash: Int) -> MethodBindPtr,
    >,
    pub method_bind_ptrcall: Option<PtrcallFn>,
    pub method_bind_call: Option<VarcallFn>,

    pub object_get_instance_id: Option<unsafe extern "C" fn(object: ObjectPtr) -> u64>,
    pub object_get_instance_from_id: Option<unsafe extern "C" fn(instance_id: u64) -> ObjectPtr>,
    pub object_set_instance:
        Option<unsafe extern "C" fn(object: ObjectPtr, class: *const c_char, instance: InstancePtr)>,

    pub get_release_fn: Option<unsafe extern "C" fn(kind: WireKindSys) -> Option<ReleaseFn>>,
    pub get_copy_fn: Option<unsafe extern "C" fn(kind: WireKindSys) -> Option<CopyFn>>,

    /// Constructors between variants and typed values. `None` for kinds a variant cannot hold.
    pub get_variant_from_type_constructor:
        Option<unsafe extern "C" fn(kind: WireKindSys) -> Option<VariantFromTypeFn>>,
    pub get_variant_to_type_constructor:
        Option<unsafe extern "C" fn(kind: WireKindSys) -> Option<VariantToTypeFn>>,

    pub string_new_with_utf8:
        Option<unsafe extern "C" fn(dst: UninitTypePtr, chars: *const c_char, len: Int)>,

    /// Writes at most `capacity` bytes into `buffer`, returns the full length in bytes.
    pub string_to_utf8:
        Option<unsafe extern "C" fn(src: ConstTypePtr, buffer: *mut c_char, capacity: Int) -> Int>,

    pub classdb_construct_object: Option<unsafe extern "C" fn(class: *const c_char) -> ObjectPtr>,
    pub classdb_register_class: Option<
        unsafe extern "C" fn(
            library: ClassLibraryPtr,
            class: *const c_char,
            parent: *const c_char,
            info: *const ClassCreationInfo,
        ),
    >,
    pub classdb_unregister_class:
        Option<unsafe extern "C" fn(library: ClassLibraryPtr, class: *const c_char)>,

    pub print_error: Option<PrintFn>,
    pub print_warning: Option<PrintFn>,
}

impl ForeignInterface {
    /// Human-readable version of the runtime, if it reports one.
    pub fn version_string(&self) -> String {
        if self.version_string.is_null() {
            return format!("{}.{}", self.version_major, self.version_minor);
        }

        // SAFETY: non-null version strings are required to be valid, NUL-terminated and static.
        let cstr = unsafe { std::ffi::CStr::from_ptr(self.version_string) };
        cstr.to_string_lossy().into_owned()
    }
}
