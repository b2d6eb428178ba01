/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! # Internal crate of **ferry**
//!
//! Do not depend on this crate directly, instead use the `ferry` crate.
//! No SemVer or other guarantees are provided.

mod bridge_library;
mod derive_wire_type;
mod ferry_api;
mod util;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;

use crate::util::ident;

/// Derive macro for [`WireType`](../sys/trait.WireType.html) on `#[repr(C)]` structs.
///
/// The struct travels through a call frame slot as-is, under [`WireKind::Aggregate`](../sys/enum.WireKind.html).
/// Every field must itself be a wire type whose representation is the type itself (`f32`, `i64`, `Vector3`, other derived
/// aggregates...). `bool` is not accepted as a field, since the runtime encodes it as a separate byte-sized representation.
///
/// The whole struct must fit into one slot; this is checked at compile time.
///
/// ```ignore
/// use ferry::prelude::*;
///
/// #[derive(WireType, Copy, Clone, PartialEq, Debug)]
/// #[repr(C)]
/// struct Hit {
///     position: Vector3,
///     distance: f32,
/// }
/// ```
#[proc_macro_derive(WireType)]
pub fn derive_wire_type(input: TokenStream) -> TokenStream {
    translate(input, derive_wire_type::derive_wire_type)
}

/// Registers the virtual overrides of a host class.
///
/// Applied to the inherent `impl` block of a type implementing [`HostClass`](../obj/trait.HostClass.html). Methods annotated
/// with `#[func]` become overrides that the runtime can look up by name; the name defaults to the method name and can be
/// changed with `#[func(rename = other_name)]`.
///
/// An override takes `&self` or `&mut self`. Its first parameter may be `&Invocation`, which gives access to the trampoline
/// and allows nested foreign calls. All further parameters are wire types or borrowed tokens `&Token<R>`; tokens received
/// this way are borrowed from the caller and never released by the callee.
///
/// The macro also submits the class to the registry, so it is registered when its init level is loaded.
///
/// ```ignore
/// use ferry::prelude::*;
///
/// #[ferry_api]
/// impl Player {
///     #[func(rename = _process)]
///     fn process(&mut self, inv: &Invocation<'_>, delta: f64) {
///         self.elapsed += delta;
///     }
///
///     #[func]
///     fn _on_hit(&mut self, target: &Token<Variant>) -> bool {
///         !target.is_nil()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn ferry_api(meta: TokenStream, input: TokenStream) -> TokenStream {
    translate_meta("ferry_api", meta, input, ferry_api::attribute_ferry_api)
}

/// Generates the entry point that the foreign runtime calls when it loads the library.
///
/// Applied to `unsafe impl BridgeLibrary for T`. The exported symbol defaults to the snake_case type name followed by
/// `_init`, e.g. `MyBridge` becomes `my_bridge_init`. Use `#[bridge_library(entry_symbol = custom_name)]` to choose another.
///
/// The entry point installs the process-wide binding and hands the runtime the per-level callbacks. Method tables and host
/// classes are loaded as each init level comes up.
///
/// ```ignore
/// use ferry::prelude::*;
///
/// struct MyBridge;
///
/// #[bridge_library]
/// unsafe impl BridgeLibrary for MyBridge {}
/// ```
#[proc_macro_attribute]
pub fn bridge_library(meta: TokenStream, input: TokenStream) -> TokenStream {
    translate_meta(
        "bridge_library",
        meta,
        input,
        bridge_library::attribute_bridge_library,
    )
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Implementation

type ParseResult<T> = Result<T, venial::Error>;

/// For `#[proc_macro_derive]` macros.
fn translate<F>(input: TokenStream, transform: F) -> TokenStream
where
    F: FnOnce(venial::Item) -> ParseResult<TokenStream2>,
{
    let input2 = TokenStream2::from(input);

    let result2 = venial::parse_item(input2)
        .and_then(transform)
        .unwrap_or_else(|e| e.to_compile_error());

    TokenStream::from(result2)
}

/// For `#[proc_macro_attribute]` macros.
fn translate_meta<F>(self_name: &str, meta: TokenStream, input: TokenStream, transform: F) -> TokenStream
where
    F: FnOnce(venial::Item) -> ParseResult<TokenStream2>,
{
    let self_name = ident(self_name);
    let input2 = TokenStream2::from(input);
    let meta2 = TokenStream2::from(meta);

    let result2 = util::venial_parse_meta(&meta2, self_name, &input2)
        .and_then(transform)
        .unwrap_or_else(|e| e.to_compile_error());

    TokenStream::from(result2)
}
