/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::CStr;

use crate::meta::ClassId;
use crate::obj::ObjectRef;
use crate::sys;
use sys::InitLevel;

/// Class known to the foreign runtime: either one of the runtime's own classes, or a host class registered with it.
///
/// Engine classes are declared with [`engine_class!`](crate::engine_class); host classes implement this trait together with
/// [`HostClass`].
#[diagnostic::on_unimplemented(
    message = "only classes known to the foreign runtime are allowed in this context",
    note = "declare runtime classes with `engine_class!`, or implement `ForeignClass` + `HostClass` for your own structs"
)]
pub trait ForeignClass: Sized + 'static {
    /// The immediate superclass. [`NoBase`] for the root of the hierarchy.
    type Base: ForeignClass;

    /// Name under which the runtime knows the class.
    const CLASS_NAME: &'static CStr;

    /// Initialization level, during which this class is registered. Must not be less than `Base::INIT_LEVEL`.
    const INIT_LEVEL: InitLevel = <Self::Base as ForeignClass>::INIT_LEVEL;

    fn class_id() -> ClassId {
        ClassId::new_cached::<Self>(|| Self::CLASS_NAME.to_string_lossy().into_owned())
    }

    /// Returns whether `Self` inherits from `Base`. Reflexive.
    ///
    /// See also [`Inherits`] for a trait bound.
    fn inherits<Base: ForeignClass>() -> bool {
        if Self::class_id() == Base::class_id() {
            true
        } else if Self::Base::class_id() == <NoBase>::class_id() {
            false
        } else {
            Self::Base::inherits::<Base>()
        }
    }
}

/// Type representing the absence of a base class, at the root of the hierarchy.
///
/// This is an enum without any variants, as no instance of this class is ever constructed.
pub enum NoBase {}

impl ForeignClass for NoBase {
    type Base = NoBase;

    const CLASS_NAME: &'static CStr = c"";
    const INIT_LEVEL: InitLevel = InitLevel::Core; // arbitrary; never read.

    fn class_id() -> ClassId {
        ClassId::none()
    }
}

/// Non-strict inheritance relationship in the class hierarchy.
///
/// `Derived: Inherits<Base>` means that `Derived` is either a subclass of `Base`, or `Base` itself. Implemented transitively for all
/// ancestors by [`engine_class!`](crate::engine_class).
///
/// # Safety
/// Must only be implemented for subclasses of `Base`: upcasting an object of `Self` to `Base` must be valid.
pub unsafe trait Inherits<Base: ForeignClass>: ForeignClass {
    /// True iff `Self == Base`.
    const IS_SAME_CLASS: bool = false;
}

// SAFETY: Every class is a subclass of itself.
unsafe impl<T: ForeignClass> Inherits<T> for T {
    const IS_SAME_CLASS: bool = true;
}

/// Class defined in Rust and registered with the runtime.
///
/// Instances live inside the foreign object they extend: the runtime constructs an object of the nearest engine base class, the host
/// attaches the Rust value with [`init()`](Self::init), and frees it when the object is destroyed.
///
/// Virtual overrides are declared in an `impl` block annotated with `#[ferry_api]`, which also registers the class.
pub trait HostClass: ForeignClass + crate::private::You_forgot_the_attribute__ferry_api {
    /// Creates the Rust side of a new instance. `base` refers to the foreign object and stays valid as long as the instance exists.
    fn init(base: ObjectRef<'static, Self::Base>) -> Self;
}

/// Capability traits, implemented by the proc macros.
pub mod cap {
    use crate::registry::VirtualTable;

    /// Registers the virtual overrides of a class.
    #[doc(hidden)]
    pub trait ImplementsVirtuals: super::HostClass {
        fn __register_virtuals(table: &mut VirtualTable);
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Declares an engine class: an uninhabited type implementing [`ForeignClass`] and [`Inherits`] for its whole ancestry.
///
/// Ancestors are listed from the direct base upwards.
///
/// ```ignore
/// engine_class! {
///     pub struct Node: Object at Scene;
///     pub struct Node3D: Node, Object at Scene;
/// }
/// ```
#[macro_export]
macro_rules! engine_class {
    (@base) => { $crate::obj::NoBase };
    (@base $Base:ident) => { $Base };

    ($(
        $(#[$attr:meta])*
        $vis:vis struct $Name:ident $(: $Base:ident $(, $Ancestor:ident)*)? at $level:ident;
    )*) => {
        $(
            $(#[$attr])*
            #[derive(Debug)]
            $vis enum $Name {}

            impl $crate::obj::ForeignClass for $Name {
                type Base = $crate::engine_class!(@base $($Base)?);

                const CLASS_NAME: &'static ::std::ffi::CStr =
                    match ::std::ffi::CStr::from_bytes_with_nul(concat!(stringify!($Name), "\0").as_bytes()) {
                        Ok(name) => name,
                        Err(_) => panic!("class name contains NUL"),
                    };

                const INIT_LEVEL: $crate::sys::InitLevel = $crate::sys::InitLevel::$level;
            }

            $(
                // SAFETY: declared base class.
                unsafe impl $crate::obj::Inherits<$Base> for $Name {}
                $(
                    // SAFETY: declared ancestor.
                    unsafe impl $crate::obj::Inherits<$Ancestor> for $Name {}
                )*
            )?
        )*
    };
}

crate::engine_class! {
    /// Root of the class hierarchy.
    pub struct Object at Core;
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
