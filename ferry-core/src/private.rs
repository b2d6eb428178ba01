/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Internals used by the proc-macro expansions and by the extern "C" callbacks.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{atomic, Once};

pub use crate::registry::callbacks;
pub use crate::registry::plugin::{ClassPlugin, PluginItem};
pub use crate::storage::{as_storage, InstanceStorage};
pub use sys::out;

use crate::ferry_error;
use crate::lifetime::{Resource, Token};
use crate::meta::error::CallError;
use crate::meta::{CallContext, FromArg};
use crate::sys;
use sys::Global;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Global variables

static CALL_ERRORS: Global<CallErrors> = Global::default();

/// Level:
/// - 0: no error printing (tests that provoke failures on purpose)
/// - 1: panic locations and messages only
/// - 2: normal printing, including call errors
static ERROR_PRINT_LEVEL: atomic::AtomicU8 = atomic::AtomicU8::new(2);

sys::plugin_registry!(pub __FERRY_PLUGIN_REGISTRY: ClassPlugin);

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Call error handling

// Errors travel through the runtime as integer ids; the runtime hands the id back in `CallErrorSys::argument`.
#[derive(Default)]
struct CallErrors {
    map: HashMap<i32, CallError>,
    next_id: i32,
}

impl CallErrors {
    fn insert(&mut self, err: CallError) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        self.map.insert(id, err);
        id
    }

    fn remove(&mut self, id: i32) -> Option<CallError> {
        self.map.remove(&id)
    }
}

pub(crate) fn call_error_insert(err: CallError, out_error: &mut sys::CallErrorSys) {
    // Wraps around once the i32 range is depleted, overwriting the oldest errors.
    let id = CALL_ERRORS.lock().insert(err);

    out_error.error = sys::CALL_ERROR_HOST_CUSTOM;
    out_error.argument = id;
}

pub(crate) fn call_error_remove(in_error: &sys::CallErrorSys) -> Option<CallError> {
    // Diagnostics only; failures here must not panic.
    if in_error.error != sys::CALL_ERROR_HOST_CUSTOM {
        ferry_error!("tried to remove foreign call error {in_error:?}");
        return None;
    }

    let call_error = CALL_ERRORS.lock().remove(in_error.argument);
    if call_error.is_none() {
        ferry_error!("failed to remove call error {in_error:?}");
    }

    call_error
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Plugin handling

pub(crate) fn iterate_plugins(visitor: impl FnMut(&ClassPlugin)) {
    sys::plugin_foreach!(__FERRY_PLUGIN_REGISTRY; visitor);
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Traits

// If someone forgets #[ferry_api], this causes a compile error, rather than virtual methods silently not being called.
#[allow(non_camel_case_types)]
#[diagnostic::on_unimplemented(
    message = "host classes require an `impl` block annotated with `#[ferry_api]`",
    label = "missing `#[ferry_api]` impl for this class"
)]
pub trait You_forgot_the_attribute__ferry_api {}

/// Maps a parameter type of a `#[func]` method to the element stored in the decoded parameter tuple.
///
/// Wire values are stored and passed by value. Tokens are stored once per call and passed by reference, so they cannot escape it.
pub trait VirtualParam<'p>: Sized {
    type Stored: FromArg + 'static;

    fn from_stored(stored: &'p Self::Stored) -> Self;
}

impl<T: sys::WireType> VirtualParam<'_> for T {
    type Stored = T;

    fn from_stored(stored: &T) -> Self {
        *stored
    }
}

impl<'p, 'a, R: Resource> VirtualParam<'p> for &'p Token<'a, R> {
    type Stored = Token<'static, R>;

    fn from_stored(stored: &'p Token<'static, R>) -> Self {
        stored
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Panic handling

#[derive(Debug)]
struct PanicLocation {
    file: String,
    line: u32,
}

thread_local! {
    static LAST_PANIC: Cell<Option<PanicLocation>> = const { Cell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

// Chains onto the existing hook once, instead of swapping hooks per call: several threads may be inside handle_panic at once.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info.location().map(|loc| PanicLocation {
                file: loc.file().to_string(),
                line: loc.line(),
            });
            LAST_PANIC.set(location);

            prev_hook(panic_info);
        }));
    });
}

/// Payload of a caught panic.
pub struct PanicPayload {
    payload: Box<dyn Any + Send + 'static>,
}

impl PanicPayload {
    pub fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self { payload }
    }

    /// Message passed to `panic!`, or a placeholder for non-string payloads.
    pub fn into_panic_message(self) -> String {
        extract_panic_message(self.payload.as_ref())
    }

    pub fn repanic(self) -> ! {
        std::panic::resume_unwind(self.payload)
    }
}

impl std::fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PanicPayload({:?})", extract_panic_message(self.payload.as_ref()))
    }
}

pub fn extract_panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        format!("(panic of type ID {:?})", err.type_id())
    }
}

fn format_panic_message(msg: &str) -> String {
    // Multi-line messages: start on a new line and indent every line.
    let lbegin = "\n  ";
    let indented = msg.replace('\n', lbegin);

    if indented.len() != msg.len() {
        format!("[panic]{lbegin}{indented}")
    } else {
        format!("[panic]  {msg}")
    }
}

/// Sets the error print level, returning the previous one. See [`ERROR_PRINT_LEVEL`] for values.
pub fn set_error_print_level(level: u8) -> u8 {
    assert!(level <= 2);
    ERROR_PRINT_LEVEL.swap(level, atomic::Ordering::Relaxed)
}

pub(crate) fn has_error_print_level(level: u8) -> bool {
    assert!(level <= 2);
    ERROR_PRINT_LEVEL.load(atomic::Ordering::Relaxed) >= level
}

/// Executes `code`. If a panic is thrown, it is caught and an error message is printed.
///
/// Returns `Err(payload)` if a panic occurred, and `Ok(result)` with the result of `code` otherwise. Every extern "C" entry point
/// runs its body through this function, since unwinding into the runtime is undefined behavior.
pub fn handle_panic<E, F, R, S>(error_context: E, code: F) -> Result<R, PanicPayload>
where
    E: FnOnce() -> S,
    F: FnOnce() -> R + std::panic::UnwindSafe,
    S: std::fmt::Display,
{
    handle_panic_with_print(error_context, code, has_error_print_level(1))
}

/// Runs a host varcall body: panics and call errors are stored for the runtime, which receives their id in `out_err`.
pub fn handle_varcall_panic<F, R>(call_ctx: &CallContext, out_err: &mut sys::CallErrorSys, code: F) -> Option<R>
where
    F: FnOnce() -> Result<R, CallError> + std::panic::UnwindSafe,
{
    let outcome: Result<Result<R, CallError>, PanicPayload> = handle_panic_with_print(|| call_ctx, code, false);

    let call_error = match outcome {
        Ok(Ok(result)) => {
            *out_err = sys::CallErrorSys::default();
            return Some(result);
        }

        // Validation failed in host code.
        Ok(Err(err)) => err,

        // Panic in user code.
        Err(payload) => CallError::failed_by_user_panic(call_ctx, payload),
    };

    if has_error_print_level(2) && print_call_errors() {
        ferry_error!("{call_error}");
    }

    call_error_insert(call_error, out_err);
    None
}

fn print_call_errors() -> bool {
    sys::installed().is_none_or(|binding| binding.config().print_call_errors)
}

fn handle_panic_with_print<E, F, R, S>(error_context: E, code: F, print: bool) -> Result<R, PanicPayload>
where
    E: FnOnce() -> S,
    F: FnOnce() -> R + std::panic::UnwindSafe,
    S: std::fmt::Display,
{
    install_panic_hook();

    match std::panic::catch_unwind(code) {
        Ok(result) => Ok(result),
        Err(err) => {
            let payload = PanicPayload::new(err);

            if print {
                let location = LAST_PANIC.take();
                let at = location.map_or_else(
                    || "unknown location".to_string(),
                    |loc| format!("{}:{}", loc.file, loc.line),
                );

                let msg = extract_panic_message(payload.payload.as_ref());
                ferry_error!(
                    "Rust function panicked at {at}.\n  Context: {}\n{}",
                    error_context(),
                    format_panic_message(&msg)
                );
            }

            Err(payload)
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_panic_passes_result() {
        let result = handle_panic(|| "context", || 5);
        assert_eq!(result.ok(), Some(5));
    }

    #[test]
    fn handle_panic_catches() {
        let result = handle_panic(|| "context", || -> i32 { panic!("expected failure") });

        let payload = result.expect_err("panic is caught");
        assert_eq!(payload.into_panic_message(), "expected failure");
    }

    #[test]
    fn panic_message_indents_lines() {
        assert_eq!(format_panic_message("one"), "[panic]  one");
        assert_eq!(format_panic_message("one\ntwo"), "[panic]\n  one\n  two");
    }

    #[test]
    fn varcall_errors_round_trip_through_ids() {
        let ctx = CallContext::func("Player", "jump");
        let mut err = sys::CallErrorSys::default();

        let result: Option<()> = handle_varcall_panic(&ctx, &mut err, || Err(CallError::failed_custom(&ctx, "no ground")));
        assert!(result.is_none());
        assert_eq!(err.error, sys::CALL_ERROR_HOST_CUSTOM);

        let stored = call_error_remove(&err).expect("error was stored");
        assert_eq!(stored.method_name(), "jump");
        assert!(call_error_remove(&err).is_none());
    }
}
