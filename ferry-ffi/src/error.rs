/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::ResourceKind;

/// Failure while connecting to the foreign runtime.
///
/// Any of these means the runtime does not provide what the host was built against. None is recoverable: the init layer reports them
/// and aborts loading, before any call site can run with a mismatched frame layout.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BootstrapError {
    #[error("foreign interface pointer is null")]
    NullInterface,

    #[error("foreign interface lacks required function `{name}`")]
    MissingInterfaceFn { name: &'static str },

    #[error("foreign runtime provides no {op} function for {kind:?}")]
    MissingLifecycle {
        kind: ResourceKind,
        op: &'static str,
    },

    #[error("cannot resolve method `{class}::{method}` (hash {hash}); does the runtime version match?")]
    UnresolvedMethod {
        class: String,
        method: String,
        hash: i64,
    },

    #[error("a binding has already been installed for this process")]
    AlreadyInstalled,
}
