/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::builtin::{real, Vector3};

/// 3D plane in [Hessian normal form](https://mathworld.wolfram.com/HessianNormalForm.html): all points `p` with `normal.dot(p) == d`.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Plane {
    pub normal: Vector3,
    pub d: real,
}

impl Plane {
    /// Creates a plane from a unit normal and the distance from the origin.
    ///
    /// # Panics
    /// If `unit_normal` is not normalized. Construction via `Plane { normal, d }` does not check.
    pub fn new(unit_normal: Vector3, d: real) -> Self {
        assert!(
            unit_normal.is_normalized(),
            "Plane::new() requires a unit normal, got {unit_normal:?}"
        );

        Self {
            normal: unit_normal,
            d,
        }
    }

    /// Signed distance from the plane; positive above it (in normal direction).
    pub fn distance_to(self, point: Vector3) -> real {
        self.normal.dot(point) - self.d
    }

    pub fn is_point_over(self, point: Vector3) -> bool {
        self.distance_to(point) > 0.0
    }
}
