/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use proc_macro2::TokenStream;
use quote::quote;

use crate::util::{bail, mentions_ident, path_is_single};
use crate::ParseResult;

pub fn derive_wire_type(item: venial::Item) -> ParseResult<TokenStream> {
    let venial::Item::Struct(struct_) = item else {
        return bail!(item, "#[derive(WireType)] is only supported on structs");
    };

    if struct_.generic_params.is_some() {
        return bail!(struct_.generic_params, "#[derive(WireType)] does not support lifetimes or generic parameters");
    }

    if !has_repr_c(&struct_.attributes) {
        return bail!(
            &struct_.name,
            "#[derive(WireType)] requires #[repr(C)], so the layout matches the foreign side"
        );
    }

    let field_types: Vec<&venial::TypeExpr> = match &struct_.fields {
        venial::Fields::Named(named) => named.fields.inner.iter().map(|(field, _)| &field.ty).collect(),
        venial::Fields::Tuple(tuple) => tuple.fields.inner.iter().map(|(field, _)| &field.ty).collect(),
        venial::Fields::Unit => {
            return bail!(&struct_.name, "#[derive(WireType)] requires at least one field");
        }
    };

    let name = &struct_.name;
    let name_str = name.to_string();

    Ok(quote! {
        // SAFETY: #[repr(C)] struct whose fields are all wire types stored as their own representation (asserted below).
        unsafe impl ::ferry::sys::WireType for #name {
            type Repr = Self;
            const KIND: ::ferry::sys::WireKind = ::ferry::sys::WireKind::Aggregate;

            #[inline]
            fn to_repr(self) -> Self {
                self
            }

            #[inline]
            fn from_repr(repr: Self) -> Self {
                repr
            }
        }

        const _: () = {
            // Types like `bool` are wire types but travel as another representation; inside an aggregate they would read invalid bits.
            fn __assert_wire_field<T: ::ferry::sys::WireType<Repr = T>>() {}

            #[allow(dead_code)]
            fn __assert_wire_fields() {
                #( __assert_wire_field::<#field_types>(); )*
            }

            assert!(
                ::std::mem::size_of::<#name>() <= ::ferry::sys::SLOT_BYTES,
                concat!("aggregate `", #name_str, "` does not fit into a call frame slot")
            );
        };
    })
}

fn has_repr_c(attributes: &[venial::Attribute]) -> bool {
    attributes
        .iter()
        .any(|attr| path_is_single(&attr.path, "repr") && mentions_ident(attr.value.get_value_tokens(), "C"))
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
