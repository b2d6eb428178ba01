/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::error::Error;
use std::fmt;

use crate::builtin::resources::Variant;
use crate::lifetime::Token;
use crate::meta::error::ConversionError;
use crate::meta::CallContext;
use crate::private::PanicPayload;
use crate::sys;

/// Error capable of representing failed function calls.
///
/// Returned by variant calls into the foreign runtime ([`Signature::out_varcall()`](crate::meta::Signature::out_varcall)), and
/// reported back to the runtime when a host callback fails.
///
/// Allows to inspect the involved class and method via `class_name()` and `method_name()`. Implements the `std::error::Error` trait, so
/// it comes with `Display` and `Error::source()` APIs.
///
/// # Possible error causes
/// - **Invalid method**: the method does not exist on the object.
/// - **Invalid argument**: the runtime could not use an argument of the given variant type.
/// - **Too many or too few arguments**.
/// - **User panic**: a host callback panicked.
/// - **Reentrant borrow**: a host callback tried to access an instance that is already borrowed mutably.
///
/// # Chained errors
/// If a variant call reaches a host callback that fails, the outer `CallError` refers to the method that was called, and its
/// `source()` is the `CallError` of the host callback.
pub struct CallError {
    // Boxed to keep Result<T, CallError> small.
    b: Box<InnerCallError>,
}

#[derive(Debug)]
struct InnerCallError {
    class_name: String,
    function_name: String,
    call_expr: String,
    reason: String,
    source: Option<SourceError>,
}

impl CallError {
    // Naming:
    // - check_* means possible failure -- Result<(), Self> is returned.
    // - failed_* means definitive failure -- Self is returned.

    /// Name of the class whose method failed. **Not** the dynamic type.
    ///
    /// Returns `None` for free functions.
    pub fn class_name(&self) -> Option<&str> {
        if self.b.class_name.is_empty() {
            None
        } else {
            Some(&self.b.class_name)
        }
    }

    /// Name of the function or method that failed.
    pub fn method_name(&self) -> &str {
        &self.b.function_name
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Constructors returning Result<(), Self>; possible failure

    /// Checks whether the number of arguments matches the number of parameters.
    pub(crate) fn check_arg_count(
        call_ctx: &CallContext,
        arg_count: usize,
        param_count: usize,
    ) -> Result<(), Self> {
        if arg_count == param_count {
            return Ok(());
        }

        Err(Self::failed_param_count(call_ctx, arg_count, param_count))
    }

    /// Checks the foreign side of a varcall.
    pub(crate) fn check_out_varcall(
        call_ctx: &CallContext,
        err: sys::CallErrorSys,
        args: &[&Token<'_, Variant>],
    ) -> Result<(), Self> {
        if err.error == sys::CALL_OK {
            return Ok(());
        }

        let arg_tags: Vec<u32> = args.iter().map(|arg| arg.handle().tag()).collect();
        let call_expr = format!("{call_ctx}({})", join_tags(&arg_tags));

        // If the call error encodes an error generated by host code, decode it.
        let mut source_error = None;
        if err.error == sys::CALL_ERROR_HOST_CUSTOM {
            source_error = crate::private::call_error_remove(&err).map(SourceError::Call);
        }

        Err(Self::failed_varcall_inner(
            call_ctx,
            call_expr,
            err,
            &arg_tags,
            source_error,
        ))
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Constructors returning Self; guaranteed failure

    /// Returns an error for a failed conversion of a value crossing the boundary.
    pub(crate) fn failed_conversion(
        call_ctx: &CallContext,
        what: impl fmt::Display,
        conversion_error: ConversionError,
    ) -> Self {
        Self::new(
            call_ctx,
            format!("{what} conversion"),
            Some(SourceError::Conversion(conversion_error)),
        )
    }

    pub(crate) fn failed_param_count(
        call_ctx: &CallContext,
        arg_count: usize,
        param_count: usize,
    ) -> CallError {
        let param_plural = plural(param_count);
        let arg_plural = plural(arg_count);

        Self::new(
            call_ctx,
            format!(
                "function has {param_count} parameter{param_plural}, but received {arg_count} argument{arg_plural}"
            ),
            None,
        )
    }

    fn failed_varcall_inner(
        call_ctx: &CallContext,
        call_expr: String,
        err: sys::CallErrorSys,
        arg_tags: &[u32],
        source: Option<SourceError>,
    ) -> Self {
        debug_assert_ne!(err.error, sys::CALL_OK); // already checked outside

        let sys::CallErrorSys {
            error,
            argument,
            expected,
        } = err;

        let mut call_error = match error {
            sys::CALL_ERROR_INVALID_METHOD => Self::new(call_ctx, "method not found", None),
            sys::CALL_ERROR_INVALID_ARGUMENT => {
                let actual = usize::try_from(argument)
                    .ok()
                    .and_then(|index| arg_tags.get(index))
                    .map_or_else(|| "?".to_string(), |tag| describe_tag(*tag));
                let expected = u32::try_from(expected).map_or_else(|_| "?".to_string(), describe_tag);

                // Runtime counts from 0; messages count from 1.
                let i = argument.saturating_add(1);
                Self::new(
                    call_ctx,
                    format!("parameter #{i} -- cannot convert from {actual} to {expected}"),
                    None,
                )
            }
            sys::CALL_ERROR_TOO_MANY_ARGUMENTS | sys::CALL_ERROR_TOO_FEW_ARGUMENTS => {
                let param_count = usize::try_from(expected).unwrap_or(0);
                Self::failed_param_count(call_ctx, arg_tags.len(), param_count)
            }
            sys::CALL_ERROR_INSTANCE_IS_NULL => Self::new(call_ctx, "instance is null", None),
            sys::CALL_ERROR_METHOD_NOT_CONST => Self::new(call_ctx, "method is not const", None),
            sys::CALL_ERROR_HOST_CUSTOM => {
                // Details are in the source error.
                Self::new(call_ctx, String::new(), None)
            }
            _ => Self::new(
                call_ctx,
                format!("unknown reason (error code {error})"),
                None,
            ),
        };

        call_error.b.source = source;
        call_error.b.call_expr = call_expr;
        call_error
    }

    #[doc(hidden)]
    pub fn failed_by_user_panic(call_ctx: &CallContext, panic_payload: PanicPayload) -> Self {
        let reason = panic_payload.into_panic_message();

        Self::new(call_ctx, format!("function panicked: {reason}"), None)
    }

    /// The instance was already bound when a callback tried to access it.
    #[doc(hidden)]
    pub fn failed_reentrant_borrow(call_ctx: &CallContext, class_name: &str) -> Self {
        Self::new(
            call_ctx,
            format!("instance of `{class_name}` is already borrowed; reentrant mutable access would alias"),
            None,
        )
    }

    /// Error raised by a host callback itself.
    pub fn failed_custom(call_ctx: &CallContext, reason: impl Into<String>) -> Self {
        Self::new(call_ctx, reason, None)
    }

    fn new(call_ctx: &CallContext, reason: impl Into<String>, source: Option<SourceError>) -> Self {
        let inner = InnerCallError {
            class_name: call_ctx.class_name.to_string(),
            function_name: call_ctx.function_name.to_string(),
            call_expr: format!("{call_ctx}()"),
            reason: reason.into(),
            source,
        };

        Self { b: Box::new(inner) }
    }

    /// Describes the error.
    ///
    /// Same as the `Display` repr, but without the prefix, and optionally without source errors.
    pub fn message(&self, with_source: bool) -> String {
        let InnerCallError {
            call_expr,
            reason,
            source,
            ..
        } = &*self.b;

        let reason_str = if reason.is_empty() {
            String::new()
        } else {
            format!("\n    Reason: {reason}")
        };

        let source_str = match source {
            Some(SourceError::Conversion(e)) if with_source => format!("\n  Source: {e}"),
            Some(SourceError::Call(e)) if with_source => {
                let message = e.message(true);
                format!("\n  Source: {message}")
            }
            _ => String::new(),
        };

        format!("{call_expr}{reason_str}{source_str}")
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.message(true);
        write!(f, "ferry function call failed: {message}")
    }
}

impl fmt::Debug for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.b)
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.b.source.as_ref() {
            Some(SourceError::Conversion(e)) => deref_to::<ConversionError>(e),
            Some(SourceError::Call(e)) => deref_to::<CallError>(e),
            None => None,
        }
    }
}

/// Result of a call that may fail with a [`CallError`].
pub type CallResult<R> = Result<R, CallError>;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Implementation

#[derive(Debug)]
enum SourceError {
    Conversion(ConversionError),

    // If the top-level Box on CallError is ever removed, this would need to store Box<CallError> again.
    Call(CallError),
}

/// Explicit dereferencing to a certain type. Avoids accidentally returning `&Box<T>` or so.
fn deref_to<T>(t: &T) -> Option<&(dyn Error + 'static)>
where
    T: Error + 'static,
{
    Some(t)
}

// Variant tags use the wire kind numbering.
fn describe_tag(tag: u32) -> String {
    match sys::WireKind::from_sys(tag) {
        Some(kind) => format!("{kind:?}"),
        None => format!("tag {tag}"),
    }
}

fn join_tags(tags: &[u32]) -> String {
    tags.iter()
        .map(|tag| describe_tag(*tag))
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
