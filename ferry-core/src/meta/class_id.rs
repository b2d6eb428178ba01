/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use crate::sys;
use sys::Global;

static CLASS_ID_CACHE: Global<ClassIdCache> = Global::new(ClassIdCache::new);

/// Globally unique ID of a class, host-defined or foreign.
///
/// Cheap to copy and compare. The class name is stored once in a global cache, not per ID.
///
/// IDs are **not** ordered lexicographically, and the order is not stable across runs.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClassId {
    global_index: u16,
}

impl ClassId {
    /// ID of the Rust type `T`, registering `name` on first use.
    ///
    /// Calling this for the same `T` with different names keeps the first one.
    pub fn new_cached<T: 'static>(name: impl FnOnce() -> String) -> Self {
        let type_id = TypeId::of::<T>();
        let mut cache = CLASS_ID_CACHE.lock();

        if let Some(&global_index) = cache.type_to_index.get(&type_id) {
            return Self { global_index };
        }

        cache.insert(Cow::Owned(name()), Some(type_id))
    }

    /// ID for a class known only by name, e.g. one defined on the foreign side. Equal names yield equal IDs.
    pub fn new_dynamic(class_name: impl Into<Cow<'static, str>>) -> Self {
        CLASS_ID_CACHE.lock().insert(class_name.into(), None)
    }

    /// The "no class" ID, with an empty name.
    pub fn none() -> Self {
        Self { global_index: 0 }
    }

    pub fn is_none(&self) -> bool {
        self.global_index == 0
    }

    pub fn to_cow_str(&self) -> Cow<'static, str> {
        let cache = CLASS_ID_CACHE.lock();
        cache.names[usize::from(self.global_index)].clone()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_cow_str().fmt(f)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.to_cow_str();

        if name.is_empty() {
            write!(f, "ClassId(none)")
        } else {
            write!(f, "ClassId({name:?})")
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

struct ClassIdCache {
    /// Index 0 is the empty name, meaning "no class".
    names: Vec<Cow<'static, str>>,
    type_to_index: HashMap<TypeId, u16>,
    string_to_index: HashMap<String, u16>,
}

impl ClassIdCache {
    fn new() -> Self {
        Self {
            names: vec![Cow::Borrowed("")],
            type_to_index: HashMap::new(),
            string_to_index: HashMap::from([(String::new(), 0)]),
        }
    }

    fn insert(&mut self, name: Cow<'static, str>, type_id: Option<TypeId>) -> ClassId {
        // A dynamic lookup may have created the entry before the type was known.
        if let Some(&global_index) = self.string_to_index.get(name.as_ref()) {
            if let Some(type_id) = type_id {
                self.type_to_index.entry(type_id).or_insert(global_index);
            }
            return ClassId { global_index };
        }

        let global_index = u16::try_from(self.names.len())
            .unwrap_or_else(|_| panic!("class ID cache exceeded maximum capacity of 65536 entries"));

        self.string_to_index.insert(name.to_string(), global_index);
        self.names.push(name);

        if let Some(type_id) = type_id {
            self.type_to_index.insert(type_id, global_index);
        }

        ClassId { global_index }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
