/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

#![deny(unsafe_op_in_unsafe_fn)]

use crate::builtin::resources::{Array, Dictionary, GString, RawObject, StringName, Variant};
use crate::lifetime::{Resource, Token, Tracked};
use crate::meta::error::{CallError, CallResult, ConversionError};
use crate::meta::CallContext;
use crate::sys;
use sys::{CallFrame, LifecycleTable, WireType};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Single values

/// Value received as argument of an in-call (runtime calling host code).
///
/// Plain wire values are copied. Tokens are decoded as [`Borrowed`](crate::lifetime::Ownership::Borrowed): the caller keeps ownership,
/// and callbacks only ever see them behind a reference, so they cannot escape the call.
pub trait FromArg: Sized {
    type Wire: WireType;

    fn from_arg(wire: Self::Wire) -> Self;
}

/// Value returned from an in-call.
///
/// Ownership moves to the runtime. Returning a non-owned token hands out a fresh copy.
pub trait IntoReturn {
    type Wire: WireType;

    fn into_return(self, lifecycle: &LifecycleTable) -> Self::Wire;
}

/// Value returned by an out-call (host calling the runtime).
pub trait FromReturn: Sized {
    type Wire: WireType;

    /// # Safety
    /// For resource kinds, `wire` must be a handle the runtime returned as new; the result takes over its ownership.
    unsafe fn from_return(wire: Self::Wire, lifecycle: &LifecycleTable) -> Self;
}

/// Value passed as argument of an out-call. Encoded by handle only; ownership stays with the caller.
pub trait ToArg {
    type Wire: WireType;

    fn to_arg(&self) -> Self::Wire;
}

impl<T: WireType> FromArg for T {
    type Wire = T;

    fn from_arg(wire: T) -> Self {
        wire
    }
}

impl<T: WireType> IntoReturn for T {
    type Wire = T;

    fn into_return(self, _lifecycle: &LifecycleTable) -> T {
        self
    }
}

impl<T: WireType> FromReturn for T {
    type Wire = T;

    unsafe fn from_return(wire: T, _lifecycle: &LifecycleTable) -> Self {
        wire
    }
}

impl<T: WireType> ToArg for T {
    type Wire = T;

    fn to_arg(&self) -> T {
        *self
    }
}

impl<R: Resource> FromArg for Token<'static, R> {
    type Wire = R::Handle;

    fn from_arg(wire: R::Handle) -> Self {
        Token::borrow(wire)
    }
}

impl<R: Resource> IntoReturn for Token<'_, R> {
    type Wire = R::Handle;

    fn into_return(self, lifecycle: &LifecycleTable) -> R::Handle {
        if self.is_owned() {
            self.into_raw()
        } else {
            self.clone_owned(lifecycle).into_raw()
        }
    }
}

impl<R: Resource> FromReturn for Token<'static, R> {
    type Wire = R::Handle;

    unsafe fn from_return(wire: R::Handle, lifecycle: &LifecycleTable) -> Self {
        // SAFETY: the runtime returned a new value; its ownership moves into the token.
        unsafe { Token::adopt(wire, lifecycle) }
    }
}

impl<R: Resource> ToArg for &Token<'_, R> {
    type Wire = R::Handle;

    fn to_arg(&self) -> R::Handle {
        self.handle()
    }
}

impl<R: Resource> ToArg for &Tracked<'_, R> {
    type Wire = R::Handle;

    fn to_arg(&self) -> R::Handle {
        self.handle()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Variants

/// Value decoded from a variant argument, through the runtime's to-type constructors.
///
/// Resource tokens come out owned: the variant keeps its payload, the token holds a new copy.
pub trait FromVariant: Sized {
    fn from_variant(variant: &Token<'_, Variant>, lifecycle: &LifecycleTable) -> Result<Self, ConversionError>;
}

/// Value encoded into a new variant, through the runtime's from-type constructors.
pub trait ToVariant {
    fn to_variant(&self, lifecycle: &LifecycleTable) -> Result<Token<'static, Variant>, ConversionError>;
}

impl<T: WireType> FromVariant for T {
    fn from_variant(variant: &Token<'_, Variant>, lifecycle: &LifecycleTable) -> Result<Self, ConversionError> {
        variant.to_value(lifecycle)
    }
}

impl<T: WireType> ToVariant for T {
    fn to_variant(&self, lifecycle: &LifecycleTable) -> Result<Token<'static, Variant>, ConversionError> {
        Token::<Variant>::from_value(lifecycle, *self)
    }
}

macro_rules! impl_variant_resource {
    ($($R:ty),*) => {
        $(
            impl FromVariant for Token<'static, $R> {
                fn from_variant(variant: &Token<'_, Variant>, lifecycle: &LifecycleTable) -> Result<Self, ConversionError> {
                    variant.to_token::<$R>(lifecycle)
                }
            }

            impl ToVariant for Token<'_, $R> {
                fn to_variant(&self, lifecycle: &LifecycleTable) -> Result<Token<'static, Variant>, ConversionError> {
                    Token::<Variant>::from_token(lifecycle, self)
                }
            }
        )*
    };
}

impl_variant_resource!(GString, StringName, Array, Dictionary, RawObject);

// A variant parameter takes whatever was passed.
impl FromVariant for Token<'static, Variant> {
    fn from_variant(variant: &Token<'_, Variant>, lifecycle: &LifecycleTable) -> Result<Self, ConversionError> {
        Ok(variant.clone_owned(lifecycle))
    }
}

impl ToVariant for Token<'_, Variant> {
    fn to_variant(&self, lifecycle: &LifecycleTable) -> Result<Token<'static, Variant>, ConversionError> {
        Ok(self.clone_owned(lifecycle))
    }
}

fn decode_varcall_arg<P: FromVariant>(
    args: &[Token<'_, Variant>],
    index: usize,
    lifecycle: &LifecycleTable,
    call_ctx: &CallContext<'_>,
) -> CallResult<P> {
    // Runtime counts from 0; messages count from 1.
    P::from_variant(&args[index], lifecycle)
        .map_err(|err| CallError::failed_conversion(call_ctx, format!("parameter #{}", index + 1), err))
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tuples

/// Parameter list as Rust tuple, where each tuple element is one parameter.
///
/// The actual functionality is in [`InParamTuple`] and [`OutParamTuple`].
pub trait ParamTuple: Sized {
    /// The number of elements in this parameter list.
    const LEN: usize;
}

/// Parameter list received from the runtime, for host callbacks.
pub trait InParamTuple: ParamTuple {
    /// Decodes all arguments.
    ///
    /// # Safety
    /// `args` must point to an array of [`Self::LEN`](ParamTuple::LEN) pointers, where the `n`-th one points to a valid representation of
    /// the `n`-th element's wire type.
    #[doc(hidden)]
    unsafe fn from_ptrcall_args(args: *const sys::ConstTypePtr) -> Self;
}

/// Parameter list received as variants, for typed variant-call callbacks.
pub trait InVarcallTuple: ParamTuple {
    /// Checks the argument count, then converts each variant to its parameter type.
    fn from_varcall_args(
        args: &[Token<'_, Variant>],
        lifecycle: &LifecycleTable,
        call_ctx: &CallContext<'_>,
    ) -> CallResult<Self>;
}

/// Parameter list passed to the runtime, for out-calls.
pub trait OutParamTuple: ParamTuple {
    /// Appends all arguments to `frame`, in declaration order.
    fn encode(&self, frame: &mut CallFrame);
}

macro_rules! count_idents {
    () => { 0 };
    ($id:ident $($rest:ident)*) => { 1 + count_idents!($($rest)*)};
}

macro_rules! impl_param_tuple {
    ($(($n:tt): $P:ident),*) => {
        impl<$($P),*> ParamTuple for ($($P,)*) {
            const LEN: usize = count_idents!($($P)*);
        }

        impl<$($P),*> InParamTuple for ($($P,)*) where $($P: FromArg),* {
            #[allow(unused_variables, clippy::unused_unit)]
            unsafe fn from_ptrcall_args(args: *const sys::ConstTypePtr) -> Self {
                (
                    $(
                        // SAFETY: `args` has LEN elements and `$n < LEN`; element `$n` holds a `$P::Wire`.
                        <$P as FromArg>::from_arg(unsafe { sys::read_arg::<<$P as FromArg>::Wire>(args, $n) }),
                    )*
                )
            }
        }

        impl<$($P),*> InVarcallTuple for ($($P,)*) where $($P: FromVariant),* {
            #[allow(unused_variables)]
            fn from_varcall_args(
                args: &[Token<'_, Variant>],
                lifecycle: &LifecycleTable,
                call_ctx: &CallContext<'_>,
            ) -> CallResult<Self> {
                CallError::check_arg_count(call_ctx, args.len(), Self::LEN)?;

                Ok((
                    $( decode_varcall_arg::<$P>(args, $n, lifecycle, call_ctx)?, )*
                ))
            }
        }

        impl<$($P),*> OutParamTuple for ($($P,)*) where $($P: ToArg),* {
            #[allow(unused_variables)]
            fn encode(&self, frame: &mut CallFrame) {
                $(
                    frame.arg(self.$n.to_arg());
                )*
            }
        }
    };
}

impl_param_tuple!();
impl_param_tuple!((0): P0);
impl_param_tuple!((0): P0, (1): P1);
impl_param_tuple!((0): P0, (1): P1, (2): P2);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4, (5): P5);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4, (5): P5, (6): P6);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4, (5): P5, (6): P6, (7): P7);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4, (5): P5, (6): P6, (7): P7, (8): P8);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4, (5): P5, (6): P6, (7): P7, (8): P8, (9): P9);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4, (5): P5, (6): P6, (7): P7, (8): P8, (9): P9, (10): P10);
impl_param_tuple!((0): P0, (1): P1, (2): P2, (3): P3, (4): P4, (5): P5, (6): P6, (7): P7, (8): P8, (9): P9, (10): P10, (11): P11);

sys::static_assert!(<(u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8) as ParamTuple>::LEN <= sys::MAX_ARGS);

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::resources::GString;
    use crate::builtin::Vector3;
    use crate::testing::{fake_lifecycle, take_events, take_releases};
    use sys::StringHandle;

    #[test]
    fn tuple_len() {
        assert_eq!(<() as ParamTuple>::LEN, 0);
        assert_eq!(<(i64, bool, Vector3) as ParamTuple>::LEN, 3);
    }

    #[test]
    fn encode_then_decode_in_order() {
        let name = Token::<GString>::borrow(StringHandle::from_word(5));

        let mut frame = CallFrame::new();
        (7_i64, true, Vector3::new(1.0, 2.0, 3.0), &name).encode(&mut frame);
        assert_eq!(frame.arg_count(), 4);

        let args = frame.arg_ptrs();
        let (int, flag, vec, string) =
            unsafe { <(i64, bool, Vector3, Token<GString>)>::from_ptrcall_args(args) };

        assert_eq!(int, 7);
        assert!(flag);
        assert_eq!(vec, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(string.handle().word(), 5);
        assert!(!string.is_owned());
    }

    #[test]
    fn borrowed_return_is_copied() {
        take_events();
        let lifecycle = fake_lifecycle();

        let borrowed = Token::<GString>::borrow(StringHandle::from_word(3));
        let wire = borrowed.into_return(&lifecycle);
        assert_eq!(wire.word(), 3);
        assert_eq!(take_events().len(), 1, "one copy, no release");

        let owned = unsafe { Token::<GString>::adopt(StringHandle::from_word(4), &lifecycle) };
        let wire = owned.into_return(&lifecycle);
        assert_eq!(wire.word(), 4);
        assert!(take_events().is_empty(), "ownership moved out unchanged");
    }

    #[test]
    fn returned_token_is_owned() {
        take_events();
        let lifecycle = fake_lifecycle();

        let token = unsafe { <Token<GString> as FromReturn>::from_return(StringHandle::from_word(6), &lifecycle) };
        assert!(token.is_owned());
        drop(token);

        assert_eq!(take_releases(), vec![6]);
    }
}
