/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Types and traits related to objects: class hierarchy, typed object references and instance IDs.

mod instance_id;
mod object_ref;
mod traits;

pub use instance_id::InstanceId;
pub use object_ref::ObjectRef;
pub use traits::{cap, ForeignClass, HostClass, Inherits, NoBase, Object};
