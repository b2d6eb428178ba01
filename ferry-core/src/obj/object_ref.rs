/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::marker::PhantomData;

use crate::builtin::resources::RawObject;
use crate::lifetime::{Ownership, Token};
use crate::meta::ToArg;
use crate::obj::{ForeignClass, Inherits, InstanceId};
use crate::sys;
use sys::{Binding, ObjectPtr};

/// Typed reference to a foreign object of class `T`.
///
/// Ownership follows the wrapped [`Token`]: an owned reference holds one reference count (or is the sole owner of a manually managed
/// object) and gives it up on drop; borrowed references never release.
///
/// The instance ID is captured on construction. With [`BridgeConfig::check_liveness`](sys::BridgeConfig::check_liveness) enabled,
/// [`checked_ptr()`](Self::checked_ptr) compares it against the runtime before every call, so a freed object is reported instead of
/// being dereferenced.
pub struct ObjectRef<'a, T: ForeignClass> {
    token: Token<'a, RawObject>,
    instance_id: Option<InstanceId>,
    _class: PhantomData<*const T>,
}

impl<T: ForeignClass> ObjectRef<'static, T> {
    /// Creates a new object of class `T` through the runtime's class database.
    ///
    /// # Panics
    /// If the runtime does not know the class.
    pub fn construct(binding: &Binding) -> Self {
        let construct = sys::interface_fn!(binding, classdb_construct_object);

        // SAFETY: class name is a valid NUL-terminated string.
        let object = unsafe { construct(T::CLASS_NAME.as_ptr()) };
        assert!(
            !object.is_null(),
            "runtime failed to construct object of class {}",
            T::CLASS_NAME.to_string_lossy()
        );

        // SAFETY: a freshly constructed object belongs to the caller.
        unsafe { Self::from_token(binding, Token::adopt(object, binding.lifecycle())) }
    }
}

impl<'a, T: ForeignClass> ObjectRef<'a, T> {
    /// Wraps an untyped object token.
    ///
    /// A null pointer yields a null reference, which is only caught when it is used.
    ///
    /// # Safety
    /// The object must be null, or live and of class `T` (or a subclass).
    pub unsafe fn from_token(binding: &Binding, token: Token<'a, RawObject>) -> Self {
        let object = token.handle();

        let instance_id = if object.is_null() {
            None
        } else {
            // SAFETY: live object (caller contract).
            unsafe { InstanceId::of_object(binding, object) }.ok()
        };

        Self {
            token,
            instance_id,
            _class: PhantomData,
        }
    }

    /// Borrows an object owned elsewhere.
    ///
    /// # Safety
    /// See [`from_token()`](Self::from_token).
    pub unsafe fn from_borrowed_ptr(binding: &Binding, object: ObjectPtr) -> Self {
        // SAFETY: forwarded.
        unsafe { Self::from_token(binding, Token::borrow(object)) }
    }

    /// ID captured on construction. `None` for null references.
    pub fn instance_id(&self) -> Option<InstanceId> {
        self.instance_id
    }

    pub fn ownership(&self) -> Ownership {
        self.token.ownership()
    }

    /// Raw pointer without any validation.
    pub fn raw_ptr(&self) -> ObjectPtr {
        self.token.handle()
    }

    /// Raw pointer for a call into the runtime.
    ///
    /// # Panics
    /// - "null object dereference" if this reference is null.
    /// - "use after free" if liveness checking is enabled and the object has been freed.
    pub fn checked_ptr(&self, binding: &Binding) -> ObjectPtr {
        let object = self.token.handle();
        let Some(instance_id) = self.instance_id else {
            panic!(
                "null object dereference: {} reference is null",
                T::CLASS_NAME.to_string_lossy()
            );
        };

        if binding.config().check_liveness && instance_id.lookup(binding) != object {
            panic!(
                "use after free: {} instance {instance_id} has been freed",
                T::CLASS_NAME.to_string_lossy()
            );
        }

        object
    }

    /// Converts into a reference to a base class. Same object, same ownership.
    pub fn upcast<Base>(self) -> ObjectRef<'a, Base>
    where
        Base: ForeignClass,
        T: Inherits<Base>,
    {
        ObjectRef {
            token: self.token,
            instance_id: self.instance_id,
            _class: PhantomData,
        }
    }

    /// New owned reference to the same object, through the runtime's copy function (reference increment).
    pub fn clone_owned(&self, binding: &Binding) -> ObjectRef<'static, T> {
        ObjectRef {
            token: self.token.clone_owned(binding.lifecycle()),
            instance_id: self.instance_id,
            _class: PhantomData,
        }
    }

    pub fn into_token(self) -> Token<'a, RawObject> {
        self.token
    }
}

impl<T: ForeignClass> ToArg for &ObjectRef<'_, T> {
    type Wire = ObjectPtr;

    fn to_arg(&self) -> ObjectPtr {
        self.raw_ptr()
    }
}

impl<T: ForeignClass> fmt::Debug for ObjectRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("class", &T::CLASS_NAME)
            .field("instance_id", &self.instance_id)
            .field("ownership", &self.token.ownership())
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
