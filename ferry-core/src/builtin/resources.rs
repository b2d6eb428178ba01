/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Foreign resources: types whose values live in foreign memory and are accessed through [`Token`]s.
//!
//! ```ignore
//! let name: Token<GString> = Token::<GString>::from_str(&lifecycle, "player");
//! assert_eq!(name.to_string_lossy(&lifecycle), "player");
//!
//! let health = Token::<Variant>::from_value(&lifecycle, 100_i64)?;
//! assert_eq!(health.to_value::<i64>(&lifecycle)?, 100);
//! ```

use std::mem::MaybeUninit;

use crate::lifetime::{Resource, Token};
use crate::meta::error::ConversionError;
use crate::sys;
use sys::{LifecycleTable, ResourceKind, VariantHandle, WireKind, WireType};

macro_rules! resources {
    ($(
        $(#[$attr:meta])*
        $Name:ident => $Handle:ty, $kind:ident;
    )*) => {
        $(
            $(#[$attr])*
            #[derive(Debug)]
            pub enum $Name {}

            impl Resource for $Name {
                type Handle = $Handle;
                const KIND: ResourceKind = ResourceKind::$kind;
            }

            sys::static_assert!(matches!(<$Handle as sys::WireType>::KIND, sys::WireKind::$kind));
        )*
    };
}

resources! {
    /// Foreign string (UTF-32 or similar on the runtime side; converted at the boundary).
    GString => sys::StringHandle, String;

    /// Interned foreign string, used for identifiers.
    StringName => sys::StringNameHandle, StringName;

    Array => sys::ArrayHandle, Array;
    Dictionary => sys::DictionaryHandle, Dictionary;

    /// Dynamically typed value. Releasing a variant releases whatever its payload owns.
    Variant => sys::VariantHandle, Variant;

    /// Reference to a foreign object, untyped. Typed access goes through [`ObjectRef`](crate::obj::ObjectRef).
    RawObject => sys::ObjectPtr, Object;
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Strings

#[allow(clippy::should_implement_trait)]
impl Token<'static, GString> {
    /// Creates a new foreign string with the contents of `s`.
    pub fn from_str(lifecycle: &LifecycleTable, s: &str) -> Self {
        string_new::<GString>(lifecycle, s)
    }
}

#[allow(clippy::should_implement_trait)]
impl Token<'static, StringName> {
    pub fn from_str(lifecycle: &LifecycleTable, s: &str) -> Self {
        string_new::<StringName>(lifecycle, s)
    }
}

impl Token<'_, GString> {
    /// Copies the contents out of foreign memory.
    pub fn to_string(&self, lifecycle: &LifecycleTable) -> Result<String, ConversionError> {
        let handle = self.handle();
        string_to_utf8(lifecycle, std::ptr::from_ref(&handle).cast())
    }

    /// Like [`to_string()`](Self::to_string), replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self, lifecycle: &LifecycleTable) -> String {
        match self.to_string(lifecycle) {
            Ok(s) => s,
            Err(ConversionError::InvalidUtf8(err)) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl Token<'_, StringName> {
    pub fn to_string(&self, lifecycle: &LifecycleTable) -> Result<String, ConversionError> {
        let handle = self.handle();
        string_to_utf8(lifecycle, std::ptr::from_ref(&handle).cast())
    }
}

fn string_new<R>(lifecycle: &LifecycleTable, s: &str) -> Token<'static, R>
where
    R: Resource,
{
    let new_fn = lifecycle.string_new_with_utf8();
    let mut repr = std::mem::MaybeUninit::<<R::Handle as sys::WireType>::Repr>::uninit();

    // SAFETY: the runtime initializes `repr` with a new string of `len` bytes read from `s`; the ownership goes to the token.
    unsafe {
        new_fn(
            repr.as_mut_ptr().cast(),
            s.as_ptr().cast(),
            sys::conv::len_to_int(s.len()),
        );

        let handle = <R::Handle as sys::WireType>::from_repr(repr.assume_init());
        Token::adopt(handle, lifecycle)
    }
}

fn string_to_utf8(lifecycle: &LifecycleTable, src: sys::ConstTypePtr) -> Result<String, ConversionError> {
    let to_utf8 = lifecycle.string_to_utf8();

    // First call queries the length, second one copies.
    // SAFETY: `src` points to a live string handle; a zero capacity writes nothing.
    let len = unsafe { to_utf8(src, std::ptr::null_mut(), 0) };
    let len = usize::try_from(len).map_err(|_| ConversionError::NegativeLength { len })?;

    let mut buffer = vec![0_u8; len];
    // SAFETY: buffer has room for `len` bytes.
    unsafe { to_utf8(src, buffer.as_mut_ptr().cast(), sys::conv::len_to_int(len)) };

    Ok(String::from_utf8(buffer)?)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Variants

impl Token<'static, Variant> {
    /// Creates a new variant holding `value`, through the runtime's constructor for `T`'s wire kind.
    ///
    /// Handles of indirect kinds are copied into the variant; the source keeps its ownership.
    pub fn from_value<T: WireType>(lifecycle: &LifecycleTable, value: T) -> Result<Self, ConversionError> {
        let from_type = lifecycle
            .variant_from_type(T::KIND)
            .ok_or(ConversionError::NoVariantConstructor { kind: T::KIND })?;

        let src = value.to_repr();
        let mut dst = MaybeUninit::<<VariantHandle as WireType>::Repr>::uninit();

        // SAFETY: the constructor reads a T::Repr and initializes `dst` with a new variant, whose ownership goes to the token.
        unsafe {
            from_type(dst.as_mut_ptr().cast(), std::ptr::from_ref(&src).cast());
            Ok(Token::adopt(VariantHandle::from_repr(dst.assume_init()), lifecycle))
        }
    }

    /// Creates a new variant holding a copy of the resource behind `token`.
    pub fn from_token<R: Resource>(lifecycle: &LifecycleTable, token: &Token<'_, R>) -> Result<Self, ConversionError> {
        Self::from_value(lifecycle, token.handle())
    }
}

impl Token<'_, Variant> {
    /// Wire kind of the payload. Variant tags use the [`WireKind`] numbering.
    pub fn payload_kind(&self) -> Result<WireKind, ConversionError> {
        let tag = self.handle().tag();
        WireKind::from_sys(tag).ok_or(ConversionError::UnknownWireKind { sys: tag })
    }

    pub fn is_nil(&self) -> bool {
        self.handle().tag() == WireKind::Nil.to_sys()
    }

    /// Reads the payload as a plain value of type `T`.
    ///
    /// Fails if the variant holds another kind. Indirect payloads (strings, objects, ...) are refused; use
    /// [`to_token()`](Self::to_token), which takes over the new ownership.
    pub fn to_value<T: WireType>(&self, lifecycle: &LifecycleTable) -> Result<T, ConversionError> {
        if T::KIND.is_indirect() {
            return Err(ConversionError::ResourcePayload { kind: T::KIND });
        }

        let repr = self.extract::<T>(lifecycle)?;
        Ok(T::from_repr(repr))
    }

    /// Extracts an indirect payload as a new owned token; the variant keeps its own copy.
    pub fn to_token<R: Resource>(&self, lifecycle: &LifecycleTable) -> Result<Token<'static, R>, ConversionError> {
        let repr = self.extract::<R::Handle>(lifecycle)?;

        // SAFETY: to-type constructors hand out new values; the ownership goes to the token.
        Ok(unsafe { Token::adopt(R::Handle::from_repr(repr), lifecycle) })
    }

    fn extract<T: WireType>(&self, lifecycle: &LifecycleTable) -> Result<T::Repr, ConversionError> {
        let actual = self.payload_kind()?;
        if actual != T::KIND {
            return Err(ConversionError::KindMismatch {
                expected: T::KIND,
                actual,
            });
        }

        let to_type = lifecycle
            .variant_to_type(T::KIND)
            .ok_or(ConversionError::NoVariantConstructor { kind: T::KIND })?;

        let src = self.handle().to_repr();
        let mut dst = MaybeUninit::<T::Repr>::uninit();

        // SAFETY: the variant holds a T::KIND payload (checked above); the constructor initializes `dst` with it.
        unsafe {
            to_type(dst.as_mut_ptr().cast(), std::ptr::from_ref(&src).cast());
            Ok(dst.assume_init())
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
