/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Meta-information about calls crossing the boundary: parameter lists, signatures, class identities and errors.

mod class_id;
mod param_tuple;
mod signature;

pub mod error;

pub use class_id::ClassId;
pub use param_tuple::{
    FromArg, FromReturn, FromVariant, InParamTuple, InVarcallTuple, IntoReturn, OutParamTuple, ParamTuple, ToArg, ToVariant,
};
pub use signature::{CallContext, Signature};

#[cfg(feature = "trace")]
pub use signature::trace;
