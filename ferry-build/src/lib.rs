/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Build-script helpers shared by the ferry crates.
//!
//! Each crate that expands `strict_assert!` or reads `cfg!(safeguards_balanced)` needs the matching `cfg` itself, because `#[cfg]`
//! inside a `macro_rules!` expansion is evaluated in the calling crate. Every such crate therefore forwards the `safeguards-*`
//! features and calls [`emit_safeguard_levels()`] from its build script.

use std::env;

/// Safety checks compiled into the FFI layer.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub enum SafeguardLevel {
    /// No runtime checks beyond what Rust itself requires.
    Disengaged,

    /// Cheap checks that catch most misuse, such as liveness of objects and scope identity.
    Balanced,

    /// All checks, including the ones on hot paths (frame bookkeeping, main-thread access).
    Strict,
}

impl SafeguardLevel {
    /// Determines the level from Cargo features of the crate being built.
    ///
    /// Without explicit feature, falls back to `Strict` in debug and `Balanced` in release builds.
    pub fn from_env() -> Self {
        let feature = |name: &str| env::var_os(format!("CARGO_FEATURE_{name}")).is_some();

        if feature("SAFEGUARDS_DISENGAGED") {
            Self::Disengaged
        } else if feature("SAFEGUARDS_BALANCED") {
            Self::Balanced
        } else if feature("SAFEGUARDS_STRICT") || env::var_os("CARGO_CFG_DEBUG_ASSERTIONS").is_some() {
            Self::Strict
        } else {
            Self::Balanced
        }
    }
}

/// Emits `cfg(safeguards_strict)` and `cfg(safeguards_balanced)` for the crate being built. Strict implies balanced.
pub fn emit_safeguard_levels() {
    println!("cargo:rustc-check-cfg=cfg(safeguards_strict)");
    println!("cargo:rustc-check-cfg=cfg(safeguards_balanced)");

    let level = SafeguardLevel::from_env();
    if level >= SafeguardLevel::Balanced {
        println!("cargo:rustc-cfg=safeguards_balanced");
    }
    if level >= SafeguardLevel::Strict {
        println!("cargo:rustc-cfg=safeguards_strict");
    }
}
