/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::sys::WireKind;

/// Failure to convert a foreign value into its Rust counterpart.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConversionError {
    #[error("foreign string is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("foreign string reports negative length {len}")]
    NegativeLength { len: i64 },

    #[error("instance ID must not be zero")]
    ZeroInstanceId,

    #[error("unknown wire kind {sys}")]
    UnknownWireKind { sys: u32 },

    #[error("variant holds {actual:?}, expected {expected:?}")]
    KindMismatch { expected: WireKind, actual: WireKind },

    #[error("runtime cannot convert between variants and {kind:?}")]
    NoVariantConstructor { kind: WireKind },

    /// Indirect payloads come out of a variant as new owned values, which only a token can hold.
    #[error("{kind:?} payload must be extracted as a token")]
    ResourcePayload { kind: WireKind },
}
