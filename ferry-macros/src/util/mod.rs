/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod kv_parser;

use proc_macro2::{Ident, TokenStream, TokenTree};
use quote::{format_ident, quote};

use crate::ParseResult;

pub(crate) use kv_parser::KvParser;

pub fn ident(s: &str) -> Ident {
    format_ident!("{}", s)
}

macro_rules! error {
    ($tokens:expr, $($format_args:tt)*) => {{
        #[allow(unused_imports)]
        use quote::spanned::Spanned;
        venial::Error::new_at_span(
            $tokens.__span(),
            format!($($format_args)*)
        )
    }};
}

macro_rules! bail {
    ($tokens:expr, $($format_args:tt)*) => {
        Err($crate::util::error!($tokens, $($format_args)*))
    }
}

pub(crate) use bail;
pub(crate) use error;

/// Re-parses `#[self_name(meta)] input` as one item, so attribute arguments can be read with [`KvParser`].
pub(crate) fn venial_parse_meta(
    meta: &TokenStream,
    self_name: Ident,
    input: &TokenStream,
) -> ParseResult<venial::Item> {
    // Prepend the attribute again; proc_macro_attribute receives it separately.
    let input = quote! {
        #[#self_name(#meta)]
        #input
    };

    venial::parse_item(input)
}

pub(crate) fn path_is_single(path: &[TokenTree], expected: &str) -> bool {
    path.len() == 1 && path[0].to_string() == expected
}

pub(crate) fn is_punct(tt: &TokenTree, c: char) -> bool {
    match tt {
        TokenTree::Punct(punct) => punct.as_char() == c,
        _ => false,
    }
}

/// Whether `tokens` contain `name` as an identifier. Groups are not searched.
pub(crate) fn mentions_ident(tokens: &[TokenTree], name: &str) -> bool {
    tokens.iter().any(|tt| matches!(tt, TokenTree::Ident(id) if id == name))
}

/// Gets the right-most type name in the path.
pub(crate) fn extract_typename(ty: &venial::TypeExpr) -> Option<venial::PathSegment> {
    match ty.as_path() {
        Some(mut path) => path.segments.pop(),
        _ => None,
    }
}

/// Validates either:
/// a) the declaration is `impl Trait for SomeType`, if `expected_trait` is `Some("Trait")`
/// b) the declaration is `impl SomeType`, if `expected_trait` is `None`
pub(crate) fn validate_impl(original_impl: &venial::Impl, expected_trait: Option<&str>, attr: &str) -> ParseResult<Ident> {
    match (expected_trait, &original_impl.trait_ty) {
        (Some(expected), Some(trait_ty)) => {
            let matches = extract_typename(trait_ty).is_some_and(|seg| seg.ident == expected);
            if !matches {
                return bail!(original_impl, "#[{attr}] for trait impls requires trait to be `{expected}`");
            }
        }
        (Some(expected), None) => {
            return bail!(original_impl, "#[{attr}] must be applied to `impl {expected} for ...`");
        }
        (None, Some(_)) => {
            return bail!(original_impl, "#[{attr}] must be applied to an inherent impl, not a trait impl");
        }
        (None, None) => {}
    }

    validate_self(original_impl, attr)
}

fn validate_self(original_impl: &venial::Impl, attr: &str) -> ParseResult<Ident> {
    if original_impl.impl_generic_params.is_some() {
        return bail!(original_impl, "#[{attr}] does not support lifetimes or generic parameters");
    }

    match extract_typename(&original_impl.self_ty) {
        Some(segment) if segment.generic_args.is_none() => Ok(segment.ident),
        Some(_) => bail!(original_impl, "#[{attr}] does currently not support generic arguments"),
        None => bail!(original_impl, "#[{attr}] requires Self type to be a simple path"),
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
