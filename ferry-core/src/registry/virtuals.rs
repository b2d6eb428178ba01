/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;

use crate::meta::error::CallError;
use crate::meta::{InParamTuple, IntoReturn};
use crate::obj::HostClass;
use crate::registry::{Invocation, Trampoline};
use crate::storage::as_storage;
use crate::{ferry_warn, sys};
use sys::LifecycleTable;

/// Virtual methods overridden by one host class, keyed by name.
///
/// Built once when the class is registered. The runtime asks for each name once (see
/// [`call_data()`](Self::call_data)) and then calls the trampoline directly, so name lookup is not on the call path.
pub struct VirtualTable {
    class_name: String,
    lifecycle: LifecycleTable,
    methods: HashMap<String, Trampoline>,
}

impl VirtualTable {
    pub fn new(class_name: &str, lifecycle: &LifecycleTable) -> Self {
        Self {
            class_name: class_name.to_string(),
            lifecycle: *lifecycle,
            methods: HashMap::new(),
        }
    }

    /// Adds a virtual method implemented by a method of the host class `T`.
    ///
    /// The instance is bound mutably for the duration of the call. If it is already bound, because the call re-entered the same
    /// instance through the runtime, the call fails with a [`CallError`] instead of creating an aliasing `&mut T`.
    pub fn add_method<T, P, R>(&mut self, name: &str, method: fn(&mut T, &Invocation<'_>, &P) -> R)
    where
        T: HostClass,
        P: InParamTuple + 'static,
        R: IntoReturn + 'static,
    {
        let trampoline = Trampoline::new_fallible(&self.class_name, name, &self.lifecycle, move |inv, params: &P| {
            if inv.instance().is_null() {
                return Err(inv.fail("instance is null"));
            }

            // SAFETY: the runtime passes instances of the class this table belongs to, created by storage::create_instance::<T>().
            let storage = unsafe { as_storage::<T>(inv.instance()) };

            let mut instance = storage.try_bind_mut().map_err(|_| {
                CallError::failed_reentrant_borrow(inv.call_ctx(), &T::CLASS_NAME.to_string_lossy())
            })?;

            Ok(method(&mut *instance, inv, params))
        });

        self.add(name, trampoline);
    }

    /// Adds a trampoline built elsewhere. Replaces an existing one of the same name.
    pub fn add(&mut self, name: &str, trampoline: Trampoline) {
        if self.methods.insert(name.to_string(), trampoline).is_some() {
            ferry_warn!("virtual method {}::{name} registered twice; keeping the last one", self.class_name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Trampoline> {
        self.methods.get(name)
    }

    /// Arms the trampoline registered for `name` and returns its userdata. Null if the class does not override `name`.
    pub fn call_data(&self, name: &str) -> *mut c_void {
        match self.methods.get(name) {
            Some(trampoline) if !trampoline.is_varcall() => trampoline.arm().userdata,
            Some(_) => {
                ferry_warn!(
                    "virtual method {}::{name} is a variant-call trampoline; not usable as override",
                    self.class_name
                );
                std::ptr::null_mut()
            }
            None => std::ptr::null_mut(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Lifecycle table the trampolines of this class are created with.
    pub fn lifecycle(&self) -> &LifecycleTable {
        &self.lifecycle
    }

    /// Names of all overridden methods, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for VirtualTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualTable")
            .field("class", &self.class_name)
            .field("methods", &self.method_names())
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
