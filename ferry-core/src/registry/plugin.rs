/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::{c_void, CStr};
use std::fmt;

use crate::meta::ClassId;
use crate::obj::{cap, ForeignClass, HostClass};
use crate::registry::{callbacks, VirtualTable};
use crate::sys;
use sys::InitLevel;

/// Piece of information that is gathered by the self-registration ("plugin") system.
///
/// You should not manually construct this struct, but rather use [`ClassPlugin::new()`]. The `#[ferry_api]` macro does that.
#[derive(Clone, Debug)]
pub struct ClassPlugin {
    /// Registry key of the class.
    pub(crate) class_id: ClassId,

    pub(crate) class_name: &'static CStr,
    pub(crate) parent_class_name: &'static CStr,

    /// Which [`InitLevel`] this plugin should be registered at.
    pub(crate) init_level: InitLevel,

    /// The actual item being registered.
    pub(crate) item: PluginItem,
}

impl ClassPlugin {
    /// Creates the plugin of a host class, with names and init level taken from its [`ForeignClass`] impl.
    pub fn new<T: HostClass + cap::ImplementsVirtuals>() -> Self {
        Self {
            class_id: T::class_id(),
            class_name: T::CLASS_NAME,
            parent_class_name: <T::Base as ForeignClass>::CLASS_NAME,
            init_level: T::INIT_LEVEL,
            item: PluginItem::Class {
                create_fn: callbacks::create::<T>,
                free_fn: callbacks::free::<T>,
                register_virtuals_fn: ErasedRegisterFn {
                    raw: callbacks::register_virtuals::<T>,
                },
            },
        }
    }
}

/// Callbacks of one class, monomorphized for its type.
#[derive(Copy, Clone, Debug)]
pub enum PluginItem {
    /// Host class declared with `#[ferry_api]`.
    Class {
        /// Constructs the base object and attaches a new instance.
        create_fn: unsafe extern "C" fn(class_userdata: *mut c_void) -> sys::ObjectPtr,

        /// Destroys the instance attached to an object.
        free_fn: unsafe extern "C" fn(class_userdata: *mut c_void, instance: sys::InstancePtr),

        /// Fills the virtual table of the class.
        register_virtuals_fn: ErasedRegisterFn,
    },
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Type-erased values

/// Function filling a [`VirtualTable`] during class registration.
#[derive(Copy, Clone)]
pub struct ErasedRegisterFn {
    // Wrapper because Debug can't be derived on function pointers with reference parameters.
    pub raw: fn(&mut VirtualTable),
}

impl fmt::Debug for ErasedRegisterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:0>16x}", self.raw as usize)
    }
}
