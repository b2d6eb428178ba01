/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Minimal fake runtime for unit tests of this crate. The full mock lives in the `ferry` integration tests.

use std::cell::Cell;
use std::ffi::{c_char, CStr};

use crate::*;

thread_local! {
    pub static RESOLVE_CALLS: Cell<usize> = const { Cell::new(0) };
}

pub fn resolve_calls() -> usize {
    RESOLVE_CALLS.with(Cell::get)
}

// Any (class, method) resolves except class "Missing"; the bind pointer encodes the hash.
unsafe extern "C" fn get_method_bind(class: *const c_char, _method: *const c_char, hash: Int) -> MethodBindPtr {
    RESOLVE_CALLS.with(|c| c.set(c.get() + 1));

    if CStr::from_ptr(class) == c"Missing" {
        std::ptr::null()
    } else {
        hash as usize as MethodBindPtr
    }
}

// Returns the bind pointer (the hash) as i64.
unsafe extern "C" fn ptrcall(method: MethodBindPtr, _receiver: ObjectPtr, _args: *const ConstTypePtr, ret: TypePtr) {
    ret.cast::<i64>().write(method as usize as i64);
}

unsafe extern "C" fn varcall(
    _method: MethodBindPtr,
    _receiver: ObjectPtr,
    _args: *const ConstVariantPtr,
    _arg_count: Int,
    _ret: VariantPtr,
    error: *mut CallErrorSys,
) {
    (*error).error = CALL_ERROR_INVALID_METHOD;
}

unsafe extern "C" fn noop_release(_value: TypePtr) {}
unsafe extern "C" fn noop_copy(_dst: UninitTypePtr, _src: ConstTypePtr) {}

unsafe extern "C" fn get_release_fn(_kind: WireKindSys) -> Option<ReleaseFn> {
    Some(noop_release)
}

unsafe extern "C" fn get_copy_fn(_kind: WireKindSys) -> Option<CopyFn> {
    Some(noop_copy)
}

unsafe extern "C" fn get_no_release_fn(_kind: WireKindSys) -> Option<ReleaseFn> {
    None
}

unsafe extern "C" fn no_variant_from_type(_kind: WireKindSys) -> Option<VariantFromTypeFn> {
    None
}

unsafe extern "C" fn no_variant_to_type(_kind: WireKindSys) -> Option<VariantToTypeFn> {
    None
}

unsafe extern "C" fn instance_id(_object: ObjectPtr) -> u64 {
    0
}

unsafe extern "C" fn instance_from_id(_id: u64) -> ObjectPtr {
    std::ptr::null_mut()
}

unsafe extern "C" fn set_instance(_object: ObjectPtr, _class: *const c_char, _instance: InstancePtr) {}

unsafe extern "C" fn string_new(_dst: UninitTypePtr, _chars: *const c_char, _len: Int) {}

unsafe extern "C" fn string_to_utf8(_src: ConstTypePtr, _buffer: *mut c_char, _capacity: Int) -> Int {
    0
}

unsafe extern "C" fn construct(_class: *const c_char) -> ObjectPtr {
    std::ptr::null_mut()
}

unsafe extern "C" fn register(
    _library: ClassLibraryPtr,
    _class: *const c_char,
    _parent: *const c_char,
    _info: *const ClassCreationInfo,
) {
}

unsafe extern "C" fn unregister(_library: ClassLibraryPtr, _class: *const c_char) {}

pub fn fake_interface() -> ForeignInterface {
    ForeignInterface {
        version_major: 1,
        version_minor: 0,
        version_string: c"fake 1.0".as_ptr(),
        get_method_bind: Some(get_method_bind),
        method_bind_ptrcall: Some(ptrcall),
        method_bind_call: Some(varcall),
        object_get_instance_id: Some(instance_id),
        object_get_instance_from_id: Some(instance_from_id),
        object_set_instance: Some(set_instance),
        get_release_fn: Some(get_release_fn),
        get_copy_fn: Some(get_copy_fn),
        get_variant_from_type_constructor: Some(no_variant_from_type),
        get_variant_to_type_constructor: Some(no_variant_to_type),
        string_new_with_utf8: Some(string_new),
        string_to_utf8: Some(string_to_utf8),
        classdb_construct_object: Some(construct),
        classdb_register_class: Some(register),
        classdb_unregister_class: Some(unregister),
        print_error: None,
        print_warning: None,
    }
}

pub fn interface_without_release() -> ForeignInterface {
    ForeignInterface {
        get_release_fn: Some(get_no_release_fn),
        ..fake_interface()
    }
}

pub fn fake_binding() -> Binding {
    let interface = fake_interface();

    // SAFETY: all functions of the fake interface are callable.
    unsafe { Binding::load(&interface, std::ptr::null_mut(), BridgeConfig::default()) }
        .expect("fake interface is complete")
}
