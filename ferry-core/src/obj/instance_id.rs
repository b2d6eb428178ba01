/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::num::NonZeroU64;

use crate::meta::error::ConversionError;
use crate::sys;

/// Non-zero ID of a foreign object.
///
/// IDs are never reused by the runtime while the process lives, so a stored ID detects a freed object: looking it up yields null.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct InstanceId {
    value: NonZeroU64,
}

impl InstanceId {
    /// Constructs an instance ID from an integer, or `None` if the integer is zero.
    ///
    /// This does *not* check if the instance is valid.
    pub fn try_from_u64(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(|value| Self { value })
    }

    pub fn to_u64(self) -> u64 {
        self.value.get()
    }

    /// Queries the ID of a live object.
    ///
    /// # Safety
    /// `object` must point to a live foreign object.
    pub(crate) unsafe fn of_object(binding: &sys::Binding, object: sys::ObjectPtr) -> Result<Self, ConversionError> {
        let get_id = sys::interface_fn!(binding, object_get_instance_id);

        // SAFETY: object is live (caller contract).
        let id = unsafe { get_id(object) };
        Self::try_from(id)
    }

    /// Looks up the object with this ID. Null if it has been freed.
    pub(crate) fn lookup(self, binding: &sys::Binding) -> sys::ObjectPtr {
        let from_id = sys::interface_fn!(binding, object_get_instance_from_id);

        // SAFETY: the runtime accepts any ID; unknown ones yield null.
        unsafe { from_id(self.to_u64()) }
    }
}

impl TryFrom<u64> for InstanceId {
    type Error = ConversionError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::try_from_u64(id).ok_or(ConversionError::ZeroInstanceId)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.value)
    }
}

// SAFETY: the runtime passes instance IDs as plain u64. Zero is rejected in `from_repr`.
unsafe impl sys::WireType for InstanceId {
    type Repr = u64;
    const KIND: sys::WireKind = sys::WireKind::UInt64;

    fn to_repr(self) -> u64 {
        self.to_u64()
    }

    fn from_repr(repr: u64) -> Self {
        Self::try_from_u64(repr).unwrap_or_else(|| panic!("runtime passed instance ID 0"))
    }
}
