/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;

use crate::util::{bail, ident, validate_impl, KvParser};
use crate::ParseResult;

pub fn attribute_bridge_library(item: venial::Item) -> ParseResult<TokenStream> {
    let venial::Item::Impl(mut impl_decl) = item else {
        return bail!(item, "#[bridge_library] can only be applied to trait impls");
    };

    let type_name = validate_impl(&impl_decl, Some("BridgeLibrary"), "bridge_library")?;
    if impl_decl.tk_unsafe.is_none() {
        return bail!(
            impl_decl.tk_impl,
            "`impl BridgeLibrary` must be marked unsafe, to confirm your opt-in to the ownership contract with the foreign runtime"
        );
    }

    let Some(mut parser) = KvParser::parse_remove(&mut impl_decl.attributes, "bridge_library")? else {
        return bail!(impl_decl.tk_impl, "expected attribute #[bridge_library], but not present");
    };
    let entry_symbol = parser.handle_ident("entry_symbol")?;
    parser.finish()?;

    let entry_symbol = entry_symbol.unwrap_or_else(|| default_entry_symbol(&type_name.to_string()));
    let impl_ty = &impl_decl.self_ty;

    Ok(quote! {
        #impl_decl

        #[no_mangle]
        unsafe extern "C" fn #entry_symbol(
            interface: *const ::ferry::sys::ForeignInterface,
            library: ::ferry::sys::ClassLibraryPtr,
            init: *mut ::ferry::sys::Initialization,
        ) -> ::ferry::sys::Bool {
            ::ferry::init::__ferry_load_library::<#impl_ty>(interface, library, init)
        }

        const _: () = {
            // Entry point must match the signature the runtime looks up.
            let _unused: ::ferry::sys::InitializationFn = #entry_symbol;
        };
    })
}

/// `DemoLibrary` -> `demo_library_init`.
fn default_entry_symbol(type_name: &str) -> proc_macro2::Ident {
    ident(&format!("{}_init", type_name.to_snake_case()))
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
