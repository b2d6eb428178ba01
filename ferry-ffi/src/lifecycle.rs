/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::c_char;

use crate::{
    BootstrapError, ConstTypePtr, CopyFn, ForeignInterface, Int, ReleaseFn, ResourceKind,
    UninitTypePtr, VariantFromTypeFn, VariantToTypeFn, WireKind,
};

type StringNewFn = unsafe extern "C" fn(dst: UninitTypePtr, chars: *const c_char, len: Int);
type StringToUtf8Fn = unsafe extern "C" fn(src: ConstTypePtr, buffer: *mut c_char, capacity: Int) -> Int;

/// Release and copy functions for every indirect wire kind, plus the variant constructors of every wire kind, resolved once at
/// bootstrap.
///
/// Only function pointers, so the table is `Copy` and can be captured by value wherever ownership decisions are made (tokens,
/// trampolines), without reaching for global state.
#[derive(Copy, Clone)]
pub struct LifecycleTable {
    release: [ReleaseFn; ResourceKind::COUNT],
    copy: [CopyFn; ResourceKind::COUNT],
    string_new_with_utf8: StringNewFn,
    string_to_utf8: StringToUtf8Fn,
    variant_from_type: [Option<VariantFromTypeFn>; WireKind::COUNT],
    variant_to_type: [Option<VariantToTypeFn>; WireKind::COUNT],
}

impl LifecycleTable {
    /// Queries all functions from the interface.
    ///
    /// # Safety
    /// The `get_*` lookup entries of `interface`, if present, must be callable.
    pub(crate) unsafe fn load(interface: &ForeignInterface) -> Result<Self, BootstrapError> {
        let get_release_fn = interface
            .get_release_fn
            .ok_or(BootstrapError::MissingInterfaceFn {
                name: "get_release_fn",
            })?;
        let get_copy_fn = interface.get_copy_fn.ok_or(BootstrapError::MissingInterfaceFn {
            name: "get_copy_fn",
        })?;

        let mut release = Vec::with_capacity(ResourceKind::COUNT);
        let mut copy = Vec::with_capacity(ResourceKind::COUNT);
        for kind in ResourceKind::ALL {
            let sys = kind.wire_kind().to_sys();

            release.push(get_release_fn(sys).ok_or(BootstrapError::MissingLifecycle {
                kind,
                op: "release",
            })?);
            copy.push(get_copy_fn(sys).ok_or(BootstrapError::MissingLifecycle { kind, op: "copy" })?);
        }

        let get_from_type = interface.get_variant_from_type_constructor.ok_or(
            BootstrapError::MissingInterfaceFn {
                name: "get_variant_from_type_constructor",
            },
        )?;
        let get_to_type = interface.get_variant_to_type_constructor.ok_or(
            BootstrapError::MissingInterfaceFn {
                name: "get_variant_to_type_constructor",
            },
        )?;

        // Kinds without constructors stay None; conversions of those fail at the call site.
        let variant_from_type = WireKind::ALL.map(|kind| get_from_type(kind.to_sys()));
        let variant_to_type = WireKind::ALL.map(|kind| get_to_type(kind.to_sys()));

        Ok(Self {
            release: to_array(release),
            copy: to_array(copy),
            string_new_with_utf8: interface.string_new_with_utf8.ok_or(
                BootstrapError::MissingInterfaceFn {
                    name: "string_new_with_utf8",
                },
            )?,
            string_to_utf8: interface
                .string_to_utf8
                .ok_or(BootstrapError::MissingInterfaceFn {
                    name: "string_to_utf8",
                })?,
            variant_from_type,
            variant_to_type,
        })
    }

    /// Function that gives up one ownership of a value: destructor, or reference decrement for objects.
    #[inline]
    pub fn release_fn(&self, kind: ResourceKind) -> ReleaseFn {
        self.release[kind.index()]
    }

    /// Function that creates a new owned value from an existing one: copy constructor, or reference increment for objects.
    #[inline]
    pub fn copy_fn(&self, kind: ResourceKind) -> CopyFn {
        self.copy[kind.index()]
    }

    pub fn string_new_with_utf8(&self) -> StringNewFn {
        self.string_new_with_utf8
    }

    pub fn string_to_utf8(&self) -> StringToUtf8Fn {
        self.string_to_utf8
    }

    /// Constructor of a variant from a value of `kind`, if variants can hold that kind.
    #[inline]
    pub fn variant_from_type(&self, kind: WireKind) -> Option<VariantFromTypeFn> {
        self.variant_from_type[kind.index()]
    }

    /// Constructor of a value of `kind` from a variant holding it.
    #[inline]
    pub fn variant_to_type(&self, kind: WireKind) -> Option<VariantToTypeFn> {
        self.variant_to_type[kind.index()]
    }
}

impl std::fmt::Debug for LifecycleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleTable").finish_non_exhaustive()
    }
}

fn to_array<T, const N: usize>(vec: Vec<T>) -> [T; N] {
    match vec.try_into() {
        Ok(array) => array,
        Err(vec) => unreachable!("expected {N} entries, got {}", vec.len()),
    }
}
