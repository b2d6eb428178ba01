/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ops;

use crate::builtin::math::impl_glam_conv;
use crate::builtin::{real, GlamConv, Vector3};

/// Unit quaternion representing a 3D rotation.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Quaternion {
    pub x: real,
    pub y: real,
    pub z: real,
    pub w: real,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: real, y: real, z: real, w: real) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around the normalized `axis`.
    pub fn from_axis_angle(axis: Vector3, angle: real) -> Self {
        Self::from_glam(glam::Quat::from_axis_angle(axis.to_glam(), angle))
    }

    pub fn is_normalized(self) -> bool {
        self.to_glam().is_normalized()
    }

    pub fn inverse(self) -> Self {
        Self::from_glam(self.to_glam().inverse())
    }

    pub fn rotate(self, v: Vector3) -> Vector3 {
        Vector3::from_glam(self.to_glam() * v.to_glam())
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ops::Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.glam2(rhs, |a, b| a * b)
    }
}

impl_glam_conv!(Quaternion, glam::Quat, |q| glam::Quat::from_xyzw(q.x, q.y, q.z, q.w), |q| Self::new(q.x, q.y, q.z, q.w));
