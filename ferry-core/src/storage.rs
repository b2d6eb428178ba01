/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::type_name;
use std::cell;

use crate::obj::{HostClass, ObjectRef};
use crate::sys;

/// Manages storage of host class instances. Attached to the foreign object as its instance pointer.
pub struct InstanceStorage<T: HostClass> {
    user_instance: cell::RefCell<T>,
    base_ptr: sys::ObjectPtr,
}

impl<T: HostClass> InstanceStorage<T> {
    pub fn construct(user_instance: T, base_ptr: sys::ObjectPtr) -> Self {
        sys::out!("    Storage::construct             <{}>", type_name::<T>());

        Self {
            user_instance: cell::RefCell::new(user_instance),
            base_ptr,
        }
    }

    /// Whether a shared or exclusive borrow is currently alive.
    pub fn is_bound(&self) -> bool {
        // Needs to borrow mutably, otherwise it succeeds if shared borrows are alive.
        self.user_instance.try_borrow_mut().is_err()
    }

    pub fn base_ptr(&self) -> sys::ObjectPtr {
        self.base_ptr
    }

    pub fn try_bind(&self) -> Result<cell::Ref<'_, T>, cell::BorrowError> {
        self.user_instance.try_borrow()
    }

    /// Exclusive access to the instance. Fails instead of aliasing if the instance is already bound, e.g. when a callback re-enters
    /// the runtime, which calls back into the same instance.
    pub fn try_bind_mut(&self) -> Result<cell::RefMut<'_, T>, cell::BorrowMutError> {
        self.user_instance.try_borrow_mut()
    }

    pub(crate) fn into_raw(self) -> sys::InstancePtr {
        Box::into_raw(Box::new(self)).cast()
    }
}

impl<T: HostClass> Drop for InstanceStorage<T> {
    fn drop(&mut self) {
        sys::out!("    Storage::drop                  <{}>", type_name::<T>());
    }
}

/// Creates the instance of a host class for a freshly constructed base object.
///
/// # Safety
/// `base_ptr` must point to a live object of class `T::Base`, owned by the runtime for as long as the instance exists.
pub(crate) unsafe fn create_instance<T: HostClass>(binding: &sys::Binding, base_ptr: sys::ObjectPtr) -> sys::InstancePtr {
    // SAFETY: live object (caller contract); the base is borrowed, the runtime owns the object.
    let base = unsafe { ObjectRef::<T::Base>::from_borrowed_ptr(binding, base_ptr) };
    let user_instance = T::init(base);

    InstanceStorage::construct(user_instance, base_ptr).into_raw()
}

/// Interprets an opaque instance pointer as storage for `T`.
///
/// # Safety
/// `instance_ptr` must have been created by [`InstanceStorage::into_raw()`] for the same `T`, and not yet destroyed.
pub unsafe fn as_storage<'u, T: HostClass>(instance_ptr: sys::InstancePtr) -> &'u InstanceStorage<T> {
    // SAFETY: forwarded.
    unsafe { &*instance_ptr.cast::<InstanceStorage<T>>() }
}

/// # Safety
/// `instance_ptr` must have been created by [`InstanceStorage::into_raw()`] for the same `T`, and is invalid afterwards.
pub unsafe fn destroy_storage<T: HostClass>(instance_ptr: sys::InstancePtr) {
    let storage = instance_ptr.cast::<InstanceStorage<T>>();

    // Checked before taking ownership: on panic, a bound instance leaks instead of being freed under a live borrow.
    // SAFETY: forwarded.
    let bound = unsafe { (*storage).is_bound() };
    assert!(
        !bound,
        "instance of `{}` destroyed while bound; a callback is still running",
        type_name::<T>()
    );

    // SAFETY: forwarded.
    drop(unsafe { Box::from_raw(storage) });
}
