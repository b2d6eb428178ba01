/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::builtin::resources::Variant;
use crate::lifetime::Token;
use crate::meta::error::{CallError, CallResult};
use crate::meta::{FromReturn, OutParamTuple};
use crate::obj::ForeignClass;
use crate::sys;
use sys::{Binding, CallFrame, MethodHandle, ObjectPtr, WireType};

/// A full signature for a function.
///
/// For out-calls (host calling into the runtime), `Params` implements [`OutParamTuple`] and `Ret` implements [`FromReturn`].
/// In-calls go through [trampolines](crate::registry::Trampoline), which decode `Params` as [`InParamTuple`](crate::meta::InParamTuple).
///
/// ```ignore
/// type AddChild<'a> = Signature<(&'a Token<'a, RawObject>, bool), ()>;
///
/// unsafe {
///     AddChild::out_ptrcall(&binding, handle, "Node", "add_child", node_ptr, (&child, false));
/// }
/// ```
#[doc(hidden)]
pub struct Signature<Params, Ret> {
    _p: PhantomData<Params>,
    _r: PhantomData<Ret>,
}

/// Out-calls:
///
/// Calls going from Rust code to the foreign runtime.
#[deny(unsafe_op_in_unsafe_fn)]
impl<Params: OutParamTuple, Ret: FromReturn> Signature<Params, Ret> {
    /// Makes a ptrcall through a resolved method handle.
    ///
    /// Arguments are encoded in declaration order into a fresh [`CallFrame`]. Resource returns come back as owned tokens.
    ///
    /// # Safety
    /// - `handle` must expect the arguments `Params` and return a value of wire type `Ret::Wire`.
    /// - `receiver` must be null (static methods) or point to a live object of the method's class.
    #[inline]
    pub unsafe fn out_ptrcall(
        binding: &Binding,
        handle: MethodHandle,
        // Separate parameters to reduce tokens in generated class APIs.
        class_name: &'static str,
        method_name: &'static str,
        receiver: ObjectPtr,
        args: Params,
    ) -> Ret {
        let call_ctx = CallContext::outbound(class_name, method_name);
        sys::out!("out_ptrcall: {call_ctx}");

        #[cfg(feature = "trace")]
        trace::push(false, true, &call_ctx);

        let mut frame = CallFrame::new();
        args.encode(&mut frame);
        let ret = frame.ret::<Ret::Wire>();

        // SAFETY: frame layout matches the method signature (caller contract).
        unsafe { sys::dispatch(handle, receiver, &mut frame) };

        let wire = ret.get(&frame);

        // SAFETY: a ptrcall returns new values; ownership moves to the host.
        unsafe { Ret::from_return(wire, binding.lifecycle()) }
    }
}

/// Dynamic out-calls:
///
/// Variant arguments, validated by the runtime. Failures are reported through an error struct and come back as [`CallError`].
#[deny(unsafe_op_in_unsafe_fn)]
impl Signature<(), Token<'static, Variant>> {
    /// Makes a varcall through a resolved method handle.
    ///
    /// # Safety
    /// `receiver` must be null or point to a live object.
    pub unsafe fn out_varcall(
        binding: &Binding,
        handle: MethodHandle,
        class_name: &'static str,
        method_name: &'static str,
        receiver: ObjectPtr,
        args: &[&Token<'_, Variant>],
    ) -> CallResult<Token<'static, Variant>> {
        let call_ctx = CallContext::outbound(class_name, method_name);
        sys::out!("out_varcall: {call_ctx}");

        #[cfg(feature = "trace")]
        trace::push(false, false, &call_ctx);

        // Variants are passed by address; copies of the handles are as good as the originals for reading.
        let reprs: Vec<_> = args.iter().map(|arg| arg.handle().to_repr()).collect();
        let arg_ptrs: Vec<sys::ConstVariantPtr> = reprs.iter().map(|repr| std::ptr::from_ref(repr).cast()).collect();

        let mut ret = sys::VariantHandle::nil().to_repr();

        // SAFETY: all argument pointers refer to live variants; `ret` is storage for one variant.
        let err = unsafe {
            sys::dispatch_varcall(
                handle,
                receiver,
                &arg_ptrs,
                std::ptr::from_mut(&mut ret).cast(),
            )
        };

        CallError::check_out_varcall(&call_ctx, err, args)?;

        // SAFETY: on success the runtime initialized `ret` with a new variant.
        let ret = unsafe { Token::adopt(sys::VariantHandle::from_repr(ret), binding.lifecycle()) };
        Ok(ret)
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

// Lazy Display, so we don't create tens of thousands of extra string literals.
#[derive(Clone)]
#[doc(hidden)]
pub struct CallContext<'a> {
    pub(crate) class_name: Cow<'a, str>,
    pub(crate) function_name: &'a str,
}

impl<'a> CallContext<'a> {
    /// Call from the runtime into a host callback.
    pub const fn func(class_name: &'a str, function_name: &'a str) -> Self {
        Self {
            class_name: Cow::Borrowed(class_name),
            function_name,
        }
    }

    /// Outbound call from the host into the runtime.
    pub const fn outbound(class_name: &'a str, function_name: &'a str) -> Self {
        Self {
            class_name: Cow::Borrowed(class_name),
            function_name,
        }
    }

    /// Call on a method of class `T`.
    pub fn of<T: ForeignClass>(function_name: &'a str) -> Self {
        Self {
            class_name: T::CLASS_NAME.to_string_lossy(),
            function_name,
        }
    }
}

impl fmt::Display for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class_name, self.function_name)
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallContext({self})")
    }
}

#[cfg(feature = "trace")]
pub mod trace {
    use std::cell::Cell;

    use crate::meta::CallContext;

    /// Information about the last call crossing the boundary on this thread, for diagnostics and tests.
    #[derive(Debug)]
    pub struct CallReport {
        pub class: String,
        pub method: String,
        pub is_inbound: bool,
        pub is_ptrcall: bool,
    }

    pub fn pop() -> Option<CallReport> {
        TRACE.take()
    }

    pub(crate) fn push(inbound: bool, ptrcall: bool, call_ctx: &CallContext) {
        tracing::trace!(target: "ferry::trace", inbound, ptrcall, "{call_ctx}");

        let report = CallReport {
            class: call_ctx.class_name.to_string(),
            method: call_ctx.function_name.to_string(),
            is_inbound: inbound,
            is_ptrcall: ptrcall,
        };

        TRACE.set(Some(report));
    }

    thread_local! {
        static TRACE: Cell<Option<CallReport>> = Cell::default();
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
