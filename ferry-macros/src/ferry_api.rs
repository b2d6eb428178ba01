/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::{Ident, Literal, TokenStream};
use quote::quote;

use crate::util::{bail, mentions_ident, validate_impl, KvParser};
use crate::ParseResult;

/// Virtual override declared with `#[func]` inside a `#[ferry_api]` block.
struct VirtualOverride {
    /// Name of the Rust method.
    method_name: Ident,

    /// Name under which the runtime asks for the override.
    registered_name: String,

    /// Whether the first parameter receives the `&Invocation`.
    takes_invocation: bool,

    /// Types of the remaining parameters, as declared.
    param_types: Vec<venial::TypeExpr>,
}

pub fn attribute_ferry_api(item: venial::Item) -> ParseResult<TokenStream> {
    let venial::Item::Impl(mut decl) = item else {
        return bail!(item, "#[ferry_api] can only be applied on impl blocks");
    };

    // The attribute itself was re-inserted by translate_meta(); it takes no arguments.
    KvParser::parse_remove(&mut decl.attributes, "ferry_api")?
        .map(KvParser::finish)
        .transpose()?;

    let class_name = validate_impl(&decl, None, "ferry_api")?;
    let overrides = process_funcs(&mut decl)?;

    let registrations = overrides.iter().map(make_registration);

    Ok(quote! {
        #decl

        impl ::ferry::private::You_forgot_the_attribute__ferry_api for #class_name {}

        impl ::ferry::obj::cap::ImplementsVirtuals for #class_name {
            fn __register_virtuals(table: &mut ::ferry::registry::VirtualTable) {
                #( #registrations )*
            }
        }

        ::ferry::sys::plugin_add!(__FERRY_PLUGIN_REGISTRY in ::ferry::private; ::ferry::private::ClassPlugin::new::<#class_name>());
    })
}

/// Collects `#[func]` methods and strips the attribute from them.
fn process_funcs(decl: &mut venial::Impl) -> ParseResult<Vec<VirtualOverride>> {
    let mut overrides = Vec::new();

    for member in decl.body_items.iter_mut() {
        let venial::ImplMember::AssocFunction(function) = member else {
            continue;
        };

        let Some(mut attr) = KvParser::parse_remove(&mut function.attributes, "func")? else {
            continue;
        };
        let rename = attr.handle_ident("rename")?;
        let attr_span = attr.span();
        attr.finish()?;

        let qualifiers = &function.qualifiers;
        if qualifiers.tk_const.is_some()
            || qualifiers.tk_async.is_some()
            || qualifiers.tk_unsafe.is_some()
            || qualifiers.tk_extern.is_some()
        {
            return bail!(&function.name, "#[func]: fn qualifiers are not allowed");
        }

        if function.generic_params.is_some() {
            return bail!(&function.name, "#[func]: generic fn parameters are not supported");
        }

        overrides.push(parse_override(function, rename, attr_span)?);
    }

    Ok(overrides)
}

fn parse_override(function: &venial::Function, rename: Option<Ident>, attr_span: proc_macro2::Span) -> ParseResult<VirtualOverride> {
    let mut params = function.params.inner.iter().map(|(param, _)| param);

    match params.next() {
        Some(venial::FnParam::Receiver(recv)) if recv.tk_ref.is_some() => {}
        Some(venial::FnParam::Receiver(recv)) => {
            return bail!(&recv.tk_self, "#[func]: receiver must be `&self` or `&mut self`");
        }
        _ => return bail!(attr_span, "#[func]: virtual overrides need a `&self` or `&mut self` receiver"),
    }

    let mut takes_invocation = false;
    let mut param_types = Vec::new();

    for (index, param) in params.enumerate() {
        let venial::FnParam::Typed(param) = param else {
            return bail!(&function.name, "#[func]: unexpected receiver");
        };

        if index == 0 && mentions_ident(&param.ty.tokens, "Invocation") {
            takes_invocation = true;
        } else {
            param_types.push(param.ty.clone());
        }
    }

    Ok(VirtualOverride {
        method_name: function.name.clone(),
        registered_name: rename.unwrap_or_else(|| function.name.clone()).to_string(),
        takes_invocation,
        param_types,
    })
}

/// One `table.add_method()` call. The closure captures nothing, so it coerces to the function pointer `add_method()` expects.
fn make_registration(over: &VirtualOverride) -> TokenStream {
    let VirtualOverride {
        method_name,
        registered_name,
        takes_invocation,
        param_types,
    } = over;

    let name = Literal::string(registered_name);
    // Unsuffixed, since `__params.0usize` is not a valid tuple access.
    let indices = (0..param_types.len()).map(Literal::usize_unsuffixed);
    let inv_arg = takes_invocation.then(|| quote! { __inv, });

    quote! {
        table.add_method::<Self, ( #( <#param_types as ::ferry::private::VirtualParam>::Stored, )* ), _>(
            #name,
            |this, __inv, __params| {
                this.#method_name(
                    #inv_arg
                    #( <#param_types as ::ferry::private::VirtualParam>::from_stored(&__params.#indices), )*
                )
            },
        );
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(tokens: TokenStream) -> ParseResult<String> {
        let item = venial::parse_item(tokens)?;
        attribute_ferry_api(item).map(|ts| ts.to_string())
    }

    #[test]
    fn registers_func_methods_only() {
        let out = expand(quote! {
            #[ferry_api]
            impl Player {
                #[func]
                fn _ready(&mut self) {}

                #[func(rename = _process)]
                fn process(&mut self, inv: &Invocation<'_>, delta: f64) -> bool { true }

                fn helper(&self) {}
            }
        })
        .expect("expansion succeeds");

        assert!(out.contains("\"_ready\""));
        assert!(out.contains("\"_process\""));
        assert!(!out.contains("\"helper\""));
        assert!(out.contains("this . process (__inv ,"));
        assert!(out.contains("from_stored (& __params . 0)"));
        assert!(!out.contains("# [func"), "inner attribute must be stripped");
        assert!(!out.contains("# [ferry_api"));
        assert!(out.contains("ClassPlugin :: new :: < Player >"));
    }

    #[test]
    fn rejects_invalid_overrides() {
        assert!(expand(quote! { #[ferry_api] impl Player { #[func] fn make() -> i32 { 0 } } }).is_err());
        assert!(expand(quote! { #[ferry_api] impl Player { #[func] fn take(self) {} } }).is_err());
        assert!(expand(quote! { #[ferry_api] impl Player { #[func] fn g<T>(&self) {} } }).is_err());
        assert!(expand(quote! { #[ferry_api] impl Player { #[func(unknown)] fn f(&self) {} } }).is_err());
        assert!(expand(quote! { #[ferry_api] struct Player; }).is_err());
    }
}
