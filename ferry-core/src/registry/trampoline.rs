/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

#![deny(unsafe_op_in_unsafe_fn)]

use std::cell::Cell;
use std::ffi::{c_char, c_void};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::builtin::resources::Variant;
use crate::lifetime::{Scope, Token};
use crate::meta::error::{CallError, CallResult};
use crate::meta::{CallContext, InParamTuple, InVarcallTuple, IntoReturn, ToVariant};
use crate::private::{handle_panic, handle_varcall_panic, has_error_print_level};
use crate::{ferry_error, sys};
use sys::{CallFrame, LifecycleTable, WireType};

/// Lifecycle of a [`Trampoline`]. There is no way back from [`TornDown`](Self::TornDown).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TrampolineState {
    /// Registered in a table; no entry point handed out yet.
    Created,

    /// The foreign side holds the entry point and userdata.
    Armed,

    /// Called at least once. Reentrant calls stay in this state.
    Invoked,

    /// Destroyed together with its owner; the userdata dangles from here on. Only visible through a [`TrampolineWatch`].
    TornDown,
}

/// Read-only view of a trampoline's state that outlives the trampoline itself.
///
/// Obtained with [`Trampoline::watch()`]. A trampoline that is dropped while one of its calls is still running is leaked instead
/// of freed, and its watch never reports [`TornDown`](TrampolineState::TornDown).
#[derive(Clone, Debug)]
pub struct TrampolineWatch {
    state: Rc<Cell<TrampolineState>>,
}

impl TrampolineWatch {
    pub fn state(&self) -> TrampolineState {
        self.state.get()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state() == TrampolineState::TornDown
    }
}

/// Adapter turning a host closure into a function the foreign runtime can call.
///
/// Each invocation
/// 1. opens a fresh [`Scope`],
/// 2. decodes the arguments as borrowed values (the caller keeps ownership),
/// 3. invokes the closure,
/// 4. encodes the return value, moving its ownership to the caller,
/// 5. ends the scope, releasing everything the closure tracked in it.
///
/// Calls may nest: a closure that calls back into the runtime can be re-entered, each level with its own scope.
///
/// Panics and [`CallError`]s do not cross the boundary. They are logged with the call context, and the return slot is zero-filled,
/// which is the default value of every wire type (`0`, `false`, null, nil handles).
///
/// The closure lives on the heap at a stable address, which serves as userdata. Dropping the trampoline frees it; the foreign side
/// must not call the entry point afterwards.
pub struct Trampoline {
    header: NonNull<Header>,
    free_fn: unsafe fn(NonNull<Header>),
}

impl Trampoline {
    /// Creates a trampoline for a ptrcall-style virtual method.
    pub fn new<P, R, F>(class_name: &str, method_name: &str, lifecycle: &LifecycleTable, closure: F) -> Self
    where
        P: InParamTuple,
        R: IntoReturn,
        F: Fn(&Invocation<'_>, &P) -> R + 'static,
    {
        Self::new_fallible(class_name, method_name, lifecycle, move |inv: &Invocation<'_>, params: &P| {
            Ok(closure(inv, params))
        })
    }

    /// Like [`new()`](Self::new), for closures that can fail with a [`CallError`].
    pub fn new_fallible<P, R, F>(class_name: &str, method_name: &str, lifecycle: &LifecycleTable, closure: F) -> Self
    where
        P: InParamTuple,
        R: IntoReturn,
        F: Fn(&Invocation<'_>, &P) -> CallResult<R> + 'static,
    {
        let entry = Entry::Ptrcall(ptrcall_entry::<P, R, F>);
        Self::from_parts(Header::new(entry, class_name, method_name, lifecycle), closure)
    }

    /// Creates a trampoline for variant calls: any number of variant arguments, one variant returned.
    ///
    /// The runtime learns about failures through the call error out-parameter, so errors returned by the closure reach the original
    /// caller as the [source](std::error::Error::source) of its [`CallError`].
    pub fn new_varcall<F>(class_name: &str, method_name: &str, lifecycle: &LifecycleTable, closure: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Token<'_, Variant>]) -> CallResult<Token<'static, Variant>> + 'static,
    {
        let entry = Entry::Varcall(varcall_entry::<F>);
        Self::from_parts(Header::new(entry, class_name, method_name, lifecycle), closure)
    }

    /// Creates a variant-call trampoline with typed parameters and return value.
    ///
    /// Arguments are converted from variants through the runtime's constructors before the closure runs. A wrong argument count or
    /// payload kind fails the call; the caller then sees a [`CallError`] whose source is the
    /// [`ConversionError`](crate::meta::error::ConversionError).
    pub fn new_varcall_typed<P, R, F>(class_name: &str, method_name: &str, lifecycle: &LifecycleTable, closure: F) -> Self
    where
        P: InVarcallTuple + 'static,
        R: ToVariant + 'static,
        F: Fn(&Invocation<'_>, &P) -> CallResult<R> + 'static,
    {
        Self::new_varcall(class_name, method_name, lifecycle, move |inv: &Invocation<'_>, args: &[Token<'_, Variant>]| {
            let params = P::from_varcall_args(args, inv.lifecycle(), inv.call_ctx())?;
            let ret = closure(inv, &params)?;

            ret.to_variant(inv.lifecycle())
                .map_err(|err| CallError::failed_conversion(inv.call_ctx(), "return value", err))
        })
    }

    fn from_parts<F: 'static>(header: Header, closure: F) -> Self {
        sys::out!("trampoline {} created", header.call_ctx());

        let data = Box::leak(Box::new(TrampolineData { header, closure }));

        Self {
            header: NonNull::from(data).cast::<Header>(),
            free_fn: free_data::<F>,
        }
    }

    /// Hands out the entry point for ptrcalls.
    ///
    /// # Panics
    /// If the trampoline was created with [`new_varcall()`](Self::new_varcall).
    pub fn arm(&self) -> ForeignCallable {
        let header = self.header();
        let Entry::Ptrcall(entry) = header.entry else {
            panic!("trampoline {} takes variant calls; use arm_varcall()", header.call_ctx());
        };

        header.mark_armed();
        ForeignCallable {
            entry,
            userdata: self.header.as_ptr().cast(),
        }
    }

    /// Hands out the entry point for variant calls.
    ///
    /// # Panics
    /// If the trampoline was created for ptrcalls.
    pub fn arm_varcall(&self) -> ForeignVarcallable {
        let header = self.header();
        let Entry::Varcall(entry) = header.entry else {
            panic!("trampoline {} takes ptrcalls; use arm()", header.call_ctx());
        };

        header.mark_armed();
        ForeignVarcallable {
            entry,
            userdata: self.header.as_ptr().cast_const().cast(),
        }
    }

    pub fn state(&self) -> TrampolineState {
        self.header().state.get()
    }

    /// Handle that keeps reporting the state after this trampoline is gone.
    pub fn watch(&self) -> TrampolineWatch {
        TrampolineWatch {
            state: Rc::clone(&self.header().state),
        }
    }

    /// Number of calls so far, nested ones included.
    pub fn invocations(&self) -> u64 {
        self.header().invocations.get()
    }

    /// Whether this trampoline takes variant calls, see [`new_varcall()`](Self::new_varcall).
    pub fn is_varcall(&self) -> bool {
        matches!(self.header().entry, Entry::Varcall(_))
    }

    /// Whether a call is currently running, possibly further up the stack.
    pub fn is_active(&self) -> bool {
        self.header().depth.get() > 0
    }

    fn header(&self) -> &Header {
        // SAFETY: allocated in from_parts(), freed only in drop().
        unsafe { self.header.as_ref() }
    }
}

impl Drop for Trampoline {
    fn drop(&mut self) {
        let header = self.header();
        if header.depth.get() > 0 {
            // Freeing would pull the closure out from under the running call. Leaking is the lesser evil.
            ferry_error!("trampoline {} dropped during its own invocation; leaking it", header.call_ctx());
            return;
        }

        header.state.set(TrampolineState::TornDown);
        sys::out!(
            "trampoline {} torn down after {} calls",
            header.call_ctx(),
            header.invocations.get()
        );

        // SAFETY: allocated by from_parts() with the same F; not used after this point.
        unsafe { (self.free_fn)(self.header) };
    }
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        f.debug_struct("Trampoline")
            .field("method", &header.call_ctx())
            .field("state", &header.state.get())
            .field("invocations", &header.invocations.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Foreign-side view

/// Entry point and userdata of an armed ptrcall trampoline, in the shape of a virtual method callback.
#[derive(Copy, Clone, Debug)]
pub struct ForeignCallable {
    pub entry: sys::CallVirtualFn,
    pub userdata: *mut c_void,
}

impl ForeignCallable {
    /// Invokes the entry point the way the runtime does, with arguments and return slot from `frame`.
    ///
    /// # Safety
    /// - The trampoline must still be alive.
    /// - The frame must match the trampoline's parameters and return type.
    pub unsafe fn invoke(&self, instance: sys::InstancePtr, frame: &mut CallFrame) {
        let args = frame.arg_ptrs();
        let ret = frame.ret_ptr();

        // SAFETY: forwarded.
        unsafe {
            (self.entry)(instance, std::ptr::null(), self.userdata, args, ret);
            frame.mark_returned();
        }
    }
}

/// Entry point and userdata of an armed varcall trampoline, in the shape of a method bind.
#[derive(Copy, Clone, Debug)]
pub struct ForeignVarcallable {
    pub entry: sys::VarcallFn,
    pub userdata: sys::MethodBindPtr,
}

impl ForeignVarcallable {
    /// Method handle through which the trampoline is reachable like any foreign method, for example from
    /// [`Signature::out_varcall()`](crate::meta::Signature::out_varcall).
    ///
    /// # Safety
    /// The trampoline must outlive every call made through the handle.
    pub unsafe fn method_handle(&self) -> sys::MethodHandle {
        // SAFETY: the entry accepts this userdata as method bind while the trampoline lives (caller contract).
        unsafe { sys::MethodHandle::from_raw(self.userdata, ptrcall_unsupported, Some(self.entry)) }
    }
}

/// Calls the ptrcall trampoline behind `call_data`, as handed out by [`Trampoline::arm()`].
///
/// # Safety
/// `call_data` must come from `arm()` of a live trampoline; `args` and `ret` must match its signature.
pub(crate) unsafe fn invoke_call_data(
    call_data: *mut c_void,
    instance: sys::InstancePtr,
    name: *const c_char,
    args: *const sys::ConstTypePtr,
    ret: sys::TypePtr,
) {
    // SAFETY: call_data points to a live TrampolineData<F>, whose first field is the header.
    let header = unsafe { &*call_data.cast::<Header>() };

    match header.entry {
        // SAFETY: forwarded.
        Entry::Ptrcall(entry) => unsafe { entry(instance, name, call_data, args, ret) },
        Entry::Varcall(_) => {
            ferry_error!("virtual call {} reached a variant-call trampoline; call ignored", header.call_ctx());
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Invocation

/// Context of one trampoline call, passed to the closure.
pub struct Invocation<'c> {
    instance: sys::InstancePtr,
    scope: &'c Scope,
    lifecycle: &'c LifecycleTable,
    call_ctx: &'c CallContext<'c>,
}

impl<'c> Invocation<'c> {
    /// Instance pointer passed by the runtime: the host instance for virtual calls, the receiver object for variant calls.
    pub fn instance(&self) -> sys::InstancePtr {
        self.instance
    }

    /// Scope of this call. Owned tokens tracked here are released once the return value has been encoded.
    pub fn scope(&self) -> &'c Scope {
        self.scope
    }

    pub fn lifecycle(&self) -> &'c LifecycleTable {
        self.lifecycle
    }

    pub fn call_ctx(&self) -> &'c CallContext<'c> {
        self.call_ctx
    }

    /// Fails unless exactly `param_count` arguments were passed. For variant calls.
    pub fn check_arg_count(&self, arg_count: usize, param_count: usize) -> CallResult<()> {
        CallError::check_arg_count(self.call_ctx, arg_count, param_count)
    }

    /// Error for this call, with a custom reason.
    pub fn fail(&self, reason: impl Into<String>) -> CallError {
        CallError::failed_custom(self.call_ctx, reason)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("call", self.call_ctx)
            .field("instance", &self.instance)
            .field("scope", self.scope)
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Implementation

#[derive(Copy, Clone)]
enum Entry {
    Ptrcall(sys::CallVirtualFn),
    Varcall(sys::VarcallFn),
}

struct Header {
    entry: Entry,
    class_name: String,
    method_name: String,
    lifecycle: LifecycleTable,
    // Shared with every TrampolineWatch.
    state: Rc<Cell<TrampolineState>>,
    invocations: Cell<u64>,
    depth: Cell<u32>,
}

impl Header {
    fn new(entry: Entry, class_name: &str, method_name: &str, lifecycle: &LifecycleTable) -> Self {
        Self {
            entry,
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            lifecycle: *lifecycle,
            state: Rc::new(Cell::new(TrampolineState::Created)),
            invocations: Cell::new(0),
            depth: Cell::new(0),
        }
    }

    fn call_ctx(&self) -> CallContext<'_> {
        CallContext::func(&self.class_name, &self.method_name)
    }

    fn mark_armed(&self) {
        if self.state.get() == TrampolineState::Created {
            self.state.set(TrampolineState::Armed);
        }
    }

    fn enter(&self) -> ActiveCall<'_> {
        self.invocations.set(self.invocations.get() + 1);
        self.depth.set(self.depth.get() + 1);
        self.state.set(TrampolineState::Invoked);

        ActiveCall { header: self }
    }
}

// Leaves the call on every exit path, including unwinding out of the entry point's own code.
struct ActiveCall<'h> {
    header: &'h Header,
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        let depth = &self.header.depth;
        depth.set(depth.get() - 1);
    }
}

// Header first, so that a pointer to the data is a pointer to the header.
#[repr(C)]
struct TrampolineData<F> {
    header: Header,
    closure: F,
}

unsafe fn free_data<F>(header: NonNull<Header>) {
    // SAFETY: allocated as Box<TrampolineData<F>> in Trampoline::from_parts(); header is at offset 0.
    drop(unsafe { Box::from_raw(header.cast::<TrampolineData<F>>().as_ptr()) });
}

unsafe extern "C" fn ptrcall_entry<P, R, F>(
    instance: sys::InstancePtr,
    _name: *const c_char,
    call_data: *mut c_void,
    args: *const sys::ConstTypePtr,
    ret: sys::TypePtr,
) where
    P: InParamTuple,
    R: IntoReturn,
    F: Fn(&Invocation<'_>, &P) -> CallResult<R>,
{
    // SAFETY: call_data was handed out by arm() of a live TrampolineData<F>.
    let data = unsafe { &*call_data.cast::<TrampolineData<F>>() };
    let header = &data.header;

    let _active = header.enter();
    let call_ctx = header.call_ctx();

    #[cfg(feature = "trace")]
    crate::meta::trace::push(true, true, &call_ctx);

    let outcome = handle_panic(
        || &call_ctx,
        AssertUnwindSafe(|| {
            // SAFETY: the runtime passes arguments matching P and a return slot for R::Wire.
            unsafe { invoke_ptrcall::<P, R, F>(data, instance, &call_ctx, args, ret) }
        }),
    );

    let failed = match outcome {
        Ok(Ok(())) => false,
        Ok(Err(err)) => {
            if has_error_print_level(2) {
                ferry_error!("{err}");
            }
            true
        }
        // Already printed by handle_panic().
        Err(_panic) => true,
    };

    if failed {
        // SAFETY: ret points to storage for R::Wire.
        unsafe { zero_return::<R::Wire>(ret) };
    }
}

unsafe fn invoke_ptrcall<P, R, F>(
    data: &TrampolineData<F>,
    instance: sys::InstancePtr,
    call_ctx: &CallContext<'_>,
    args: *const sys::ConstTypePtr,
    ret: sys::TypePtr,
) -> CallResult<()>
where
    P: InParamTuple,
    R: IntoReturn,
    F: Fn(&Invocation<'_>, &P) -> CallResult<R>,
{
    let lifecycle = &data.header.lifecycle;
    let mut scope = Scope::new();

    // SAFETY: forwarded.
    let params = unsafe { P::from_ptrcall_args(args) };

    let result = {
        let invocation = Invocation {
            instance,
            scope: &scope,
            lifecycle,
            call_ctx,
        };

        (data.closure)(&invocation, &params)
    };

    let result = result.map(|value| {
        let wire = value.into_return(lifecycle);

        // SAFETY: forwarded.
        unsafe { sys::write_return(ret, wire) };
    });

    drop(params);
    scope.end();
    result
}

unsafe extern "C" fn varcall_entry<F>(
    method: sys::MethodBindPtr,
    receiver: sys::ObjectPtr,
    args: *const sys::ConstVariantPtr,
    arg_count: sys::Int,
    ret: sys::VariantPtr,
    error: *mut sys::CallErrorSys,
) where
    F: Fn(&Invocation<'_>, &[Token<'_, Variant>]) -> CallResult<Token<'static, Variant>>,
{
    // SAFETY: the method bind was handed out by arm_varcall() of a live TrampolineData<F>.
    let data = unsafe { &*method.cast::<TrampolineData<F>>() };
    let header = &data.header;
    let lifecycle = &header.lifecycle;

    let _active = header.enter();
    let call_ctx = header.call_ctx();

    #[cfg(feature = "trace")]
    crate::meta::trace::push(true, false, &call_ctx);

    // SAFETY: the runtime passes a valid error out-parameter.
    let out_err = unsafe { &mut *error };

    let returned = handle_varcall_panic(
        &call_ctx,
        out_err,
        AssertUnwindSafe(|| {
            let mut scope = Scope::new();

            let arg_count = usize::try_from(arg_count).unwrap_or_default();
            let args: Vec<Token<'_, Variant>> = (0..arg_count)
                // SAFETY: `args` holds `arg_count` pointers to valid variants.
                .map(|i| Token::borrow(unsafe { sys::read_arg::<sys::VariantHandle>(args, i) }))
                .collect();

            let result = {
                let invocation = Invocation {
                    instance: receiver,
                    scope: &scope,
                    lifecycle,
                    call_ctx: &call_ctx,
                };

                (data.closure)(&invocation, args.as_slice())
            };

            let result = result.map(|value| {
                // SAFETY: ret points to storage for one variant.
                unsafe { sys::write_return(ret, value.into_return(lifecycle)) };
            });

            drop(args);
            scope.end();
            result
        }),
    );

    if returned.is_none() {
        // SAFETY: ret points to storage for one variant.
        unsafe { sys::write_return(ret, sys::VariantHandle::nil()) };
    }
}

unsafe extern "C" fn ptrcall_unsupported(
    _method: sys::MethodBindPtr,
    _receiver: sys::ObjectPtr,
    _args: *const sys::ConstTypePtr,
    _ret: sys::TypePtr,
) {
    ferry_error!("variant-call trampoline invoked through ptrcall; call ignored");
}

unsafe fn zero_return<W: WireType>(ret: sys::TypePtr) {
    // SAFETY: ret points to storage for W::Repr (caller contract); all-zero bytes are a valid repr of every wire type.
    unsafe { ret.cast::<W::Repr>().write_bytes(0, 1) };
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
