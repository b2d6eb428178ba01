/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Callbacks that are passed as function pointers to the runtime during class registration.
//!
//! Every `extern "C"` function here runs its body through [`handle_panic`]: unwinding into the runtime is undefined behavior.

#![deny(unsafe_op_in_unsafe_fn)]

use std::ffi::{c_char, c_void, CStr};
use std::panic::AssertUnwindSafe;

use crate::obj::{cap, ForeignClass, HostClass};
use crate::private::handle_panic;
use crate::registry::class::ClassData;
use crate::registry::{trampoline, VirtualTable};
use crate::{storage, sys};

/// Creates an object of host class `T`: the runtime object of the nearest engine base, with a new `T` instance attached.
///
/// Returns null if `T::init()` panics; the half-constructed base object is then released again.
pub unsafe extern "C" fn create<T: HostClass>(class_userdata: *mut c_void) -> sys::ObjectPtr {
    // SAFETY: class_userdata is the ClassData registered together with this callback.
    let class = unsafe { ClassData::from_userdata(class_userdata) };
    let binding = class.binding;

    let base_class = <T::Base as ForeignClass>::CLASS_NAME;
    let construct = sys::interface_fn!(binding, classdb_construct_object);

    // SAFETY: class names are valid NUL-terminated strings.
    let object = unsafe { construct(base_class.as_ptr()) };
    if object.is_null() {
        crate::ferry_error!(
            "runtime failed to construct base `{}` of class `{}`",
            base_class.to_string_lossy(),
            T::CLASS_NAME.to_string_lossy()
        );
        return object;
    }

    let result = handle_panic(
        || format!("failed to create instance of {}", T::CLASS_NAME.to_string_lossy()),
        AssertUnwindSafe(|| {
            // SAFETY: `object` was just constructed as `T::Base`; the runtime owns it for the instance's lifetime.
            unsafe { storage::create_instance::<T>(binding, object) }
        }),
    );

    match result {
        Ok(instance) => {
            let set_instance = sys::interface_fn!(binding, object_set_instance);

            // SAFETY: live object; the instance was created for it.
            unsafe { set_instance(object, T::CLASS_NAME.as_ptr(), instance) };
            object
        }
        Err(_) => {
            let release = binding.lifecycle().release_fn(sys::ResourceKind::Object);
            let mut object = object;

            // SAFETY: the base object was constructed above and is not referenced by anything else.
            unsafe { release(std::ptr::from_mut(&mut object).cast()) };
            std::ptr::null_mut()
        }
    }
}

/// Destroys the instance attached to an object that the runtime is about to free.
pub unsafe extern "C" fn free<T: HostClass>(_class_userdata: *mut c_void, instance: sys::InstancePtr) {
    let _ = handle_panic(
        || format!("failed to free instance of {}", T::CLASS_NAME.to_string_lossy()),
        || {
            // SAFETY: the runtime passes the instance pointer attached by create::<T>(), once.
            unsafe { storage::destroy_storage::<T>(instance) };
        },
    );
}

/// Looks up the userdata of a virtual method. The runtime calls this once per (class, name) and caches the result.
///
/// Returns null if the class does not override `name`.
pub unsafe extern "C" fn get_virtual_call_data(class_userdata: *mut c_void, name: *const c_char) -> *mut c_void {
    // SAFETY: class_userdata is the ClassData registered together with this callback; name is a valid C string.
    let (class, name) = unsafe { (ClassData::from_userdata(class_userdata), CStr::from_ptr(name)) };

    let result = handle_panic(
        || format!("failed to look up virtual method {:?}", name),
        AssertUnwindSafe(|| match name.to_str() {
            Ok(name) => class.virtuals.call_data(name),
            Err(_) => std::ptr::null_mut(),
        }),
    );

    result.unwrap_or(std::ptr::null_mut())
}

/// Calls a virtual method through the userdata obtained from [`get_virtual_call_data()`].
///
/// Panics are caught inside the trampoline, which also fills the return slot.
pub unsafe extern "C" fn call_virtual_with_data(
    instance: sys::InstancePtr,
    name: *const c_char,
    call_data: *mut c_void,
    args: *const sys::ConstTypePtr,
    ret: sys::TypePtr,
) {
    // SAFETY: call_data was returned by get_virtual_call_data() for a class that is still registered.
    unsafe { trampoline::invoke_call_data(call_data, instance, name, args, ret) };
}

pub fn register_virtuals<T: cap::ImplementsVirtuals>(table: &mut VirtualTable) {
    T::__register_virtuals(table);
}
