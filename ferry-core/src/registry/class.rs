/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::ptr::NonNull;

use crate::meta::ClassId;
use crate::obj::{cap, HostClass};
use crate::registry::callbacks;
use crate::registry::plugin::{ClassPlugin, PluginItem};
use crate::registry::VirtualTable;
use crate::sys;
use crate::{ferry_error, ferry_warn};
use sys::{out, Binding, InitLevel};

// Flat registry of all loaded host classes, keyed by class ID. There is no actual concurrency here: the runtime registers and
// unregisters classes on the main thread. The mutex is just a casual way to keep this non-performance-critical path safe.
static LOADED_CLASSES: sys::Global<ClassRegistry> = sys::Global::default();

#[derive(Default)]
struct ClassRegistry {
    classes: HashMap<ClassId, LoadedClass>,

    // Registration order; unregistering goes backwards, so subclasses leave before their parents.
    order: Vec<ClassId>,
}

/// A class that is currently registered with the runtime.
struct LoadedClass {
    name: &'static CStr,
    parent_name: &'static CStr,
    init_level: InitLevel,
    binding: &'static Binding,

    // Both are referenced by the runtime until the class is unregistered, so they live at stable heap addresses.
    data: NonNull<ClassData>,

    // Only the runtime reads it, through the pointer passed at registration; Rust code reads it back in tests alone.
    #[cfg_attr(not(test), allow(dead_code))]
    creation_info: Box<sys::ClassCreationInfo>,
}

// SAFETY: classes are only registered, called and unregistered on the main thread. The registry lock moves entries between threads
// only in tests, where each test uses its own classes.
unsafe impl Send for LoadedClass {}

impl LoadedClass {
    fn data(&self) -> &ClassData {
        // SAFETY: allocated in register_class_raw(), freed only on drop.
        unsafe { self.data.as_ref() }
    }
}

impl Drop for LoadedClass {
    fn drop(&mut self) {
        // SAFETY: allocated with Box::into_raw in register_class_raw(); the runtime no longer refers to it once unregistered.
        drop(unsafe { Box::from_raw(self.data.as_ptr()) });
    }
}

/// Per-class data handed to the runtime as class userdata.
pub(crate) struct ClassData {
    pub(crate) binding: &'static Binding,
    pub(crate) virtuals: VirtualTable,
}

impl ClassData {
    /// # Safety
    /// `class_userdata` must be the userdata of a class that is still registered.
    pub(crate) unsafe fn from_userdata<'a>(class_userdata: *mut c_void) -> &'a ClassData {
        // SAFETY: forwarded.
        unsafe { &*class_userdata.cast::<ClassData>() }
    }
}

/// Snapshot of a registered class, for diagnostics and tests.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassInfo {
    pub name: &'static CStr,
    pub parent_name: &'static CStr,
    pub init_level: InitLevel,

    /// Names of the overridden virtual methods, sorted.
    pub virtual_methods: Vec<String>,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Registers a single host class, regardless of its init level.
///
/// Classes declared with `#[ferry_api]` are registered automatically, see [`auto_register_classes()`].
pub fn register_class<T: HostClass + cap::ImplementsVirtuals>(binding: &'static Binding) {
    out!("Manually register class {}", std::any::type_name::<T>());

    let plugin = ClassPlugin::new::<T>();
    let mut registry = LOADED_CLASSES.lock();
    register_class_raw(binding, &mut registry, &plugin);
}

/// Lets the runtime know about all classes of `init_level` that have self-registered through the plugin system.
///
/// Parents are registered before their subclasses.
pub fn auto_register_classes(binding: &'static Binding, init_level: InitLevel) {
    out!("Auto-register classes at level `{init_level:?}`...");

    let mut pending = Vec::new();
    crate::private::iterate_plugins(|plugin: &ClassPlugin| {
        // Filter per plugin, because all classes of all levels are mixed together in one list.
        if plugin.init_level == init_level {
            pending.push(plugin.clone());
        }
    });

    let mut registry = LOADED_CLASSES.lock();
    for plugin in order_parents_first(pending) {
        register_class_raw(binding, &mut registry, &plugin);
    }

    out!("All classes for level `{init_level:?}` auto-registered.");
}

/// Unregisters all classes of `init_level`, in reverse registration order.
///
/// Frees the virtual tables of these classes; their trampolines are torn down.
pub fn unregister_classes(init_level: InitLevel) {
    let mut registry = LOADED_CLASSES.lock();
    out!("Unregistering classes of level {init_level:?}...");

    let ClassRegistry { classes, order } = &mut *registry;
    let mut remaining = Vec::with_capacity(order.len());

    for class_id in order.drain(..).rev() {
        let matches_level = classes.get(&class_id).is_some_and(|class| class.init_level == init_level);

        if matches_level {
            if let Some(class) = classes.remove(&class_id) {
                unregister_class_raw(class);
            }
        } else {
            remaining.push(class_id);
        }
    }

    remaining.reverse();
    *order = remaining;
}

pub fn is_class_registered(class_id: ClassId) -> bool {
    LOADED_CLASSES.lock().classes.contains_key(&class_id)
}

pub fn class_info(class_id: ClassId) -> Option<ClassInfo> {
    let registry = LOADED_CLASSES.lock();
    let class = registry.classes.get(&class_id)?;

    Some(ClassInfo {
        name: class.name,
        parent_name: class.parent_name,
        init_level: class.init_level,
        virtual_methods: class.data().virtuals.method_names(),
    })
}

/// Creation info passed to the runtime, as the runtime sees it.
#[cfg(test)]
pub(crate) fn creation_info(class_id: ClassId) -> Option<sys::ClassCreationInfo> {
    let registry = LOADED_CLASSES.lock();
    registry.classes.get(&class_id).map(|class| *class.creation_info)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Implementation

fn register_class_raw(binding: &'static Binding, registry: &mut ClassRegistry, plugin: &ClassPlugin) {
    let class_id = plugin.class_id;
    if registry.classes.contains_key(&class_id) {
        ferry_error!("class `{class_id}` is registered more than once; skipping");
        return;
    }

    let PluginItem::Class {
        create_fn,
        free_fn,
        register_virtuals_fn,
    } = plugin.item;

    let mut virtuals = VirtualTable::new(&class_id.to_cow_str(), binding.lifecycle());
    (register_virtuals_fn.raw)(&mut virtuals);

    let data = NonNull::from(Box::leak(Box::new(ClassData { binding, virtuals })));

    let creation_info = Box::new(sys::ClassCreationInfo {
        class_userdata: data.as_ptr().cast(),
        create_instance: Some(create_fn),
        free_instance: Some(free_fn),
        get_virtual_call_data: Some(callbacks::get_virtual_call_data),
        call_virtual_with_data: Some(callbacks::call_virtual_with_data),
    });

    let register = sys::interface_fn!(binding, classdb_register_class);

    // SAFETY: names are valid C strings; the creation info and its userdata stay alive until the class is unregistered.
    unsafe {
        register(
            binding.library(),
            plugin.class_name.as_ptr(),
            plugin.parent_class_name.as_ptr(),
            std::ptr::from_ref(&*creation_info),
        )
    };

    out!("Register class:   {class_id} at level `{:?}`", plugin.init_level);

    registry.order.push(class_id);
    registry.classes.insert(
        class_id,
        LoadedClass {
            name: plugin.class_name,
            parent_name: plugin.parent_class_name,
            init_level: plugin.init_level,
            binding,
            data,
            creation_info,
        },
    );
}

fn unregister_class_raw(class: LoadedClass) {
    out!("Unregister class: {:?}", class.name);

    let unregister = sys::interface_fn!(class.binding, classdb_unregister_class);

    // SAFETY: the class was registered with this library under this name.
    unsafe { unregister(class.binding.library(), class.name.as_ptr()) };

    // Dropping `class` frees its data and virtual table now that the runtime no longer refers to them.
}

/// Sorts plugins so that classes come after their parents, if those are registered in the same batch.
fn order_parents_first(mut pending: Vec<ClassPlugin>) -> Vec<ClassPlugin> {
    // Plugin registration order is unspecified; sort by name for deterministic output.
    pending.sort_by(|a, b| a.class_name.cmp(b.class_name));

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|plugin| !pending.iter().any(|other| other.class_name == plugin.parent_class_name));

        match ready {
            Some(index) => ordered.push(pending.remove(index)),
            None => {
                // Only possible with an inheritance cycle, which the trait system already rules out.
                ferry_warn!("inheritance cycle among host classes; registering the rest in name order");
                ordered.append(&mut pending);
            }
        }
    }

    ordered
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
