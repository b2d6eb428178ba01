/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ops;

use crate::builtin::math::impl_glam_conv;
use crate::builtin::{GlamConv, Quaternion, Vector2, Vector3};

/// Affine 2D transform (2x3 matrix), stored as two basis columns plus the origin.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Transform2D {
    /// First basis column (X axis).
    pub a: Vector2,

    /// Second basis column (Y axis).
    pub b: Vector2,

    pub origin: Vector2,
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        a: Vector2::new(1.0, 0.0),
        b: Vector2::new(0.0, 1.0),
        origin: Vector2::ZERO,
    };

    pub fn from_angle_origin(angle: f32, origin: Vector2) -> Self {
        Self::from_glam(glam::Affine2::from_angle_translation(angle, origin.to_glam()))
    }

    /// Transforms a point: basis applied, then origin added.
    pub fn xform(self, point: Vector2) -> Vector2 {
        Vector2::from_glam(self.to_glam().transform_point2(point.to_glam()))
    }

    pub fn affine_inverse(self) -> Self {
        Self::from_glam(self.to_glam().inverse())
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl_glam_conv!(
    Transform2D,
    glam::Affine2,
    |t| glam::Affine2::from_cols(t.a.to_glam(), t.b.to_glam(), t.origin.to_glam()),
    |g| Self {
        a: Vector2::from_glam(g.matrix2.x_axis),
        b: Vector2::from_glam(g.matrix2.y_axis),
        origin: Vector2::from_glam(g.translation),
    }
);

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// 3x3 matrix for rotation and scale, stored as rows (the runtime's layout).
///
/// `glam` matrices are column-major, so conversions transpose.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Basis {
    pub rows: [Vector3; 3],
}

impl Basis {
    pub const IDENTITY: Self = Self {
        rows: [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ],
    };

    pub const fn from_rows(x: Vector3, y: Vector3, z: Vector3) -> Self {
        Self { rows: [x, y, z] }
    }

    pub fn from_quaternion(quat: Quaternion) -> Self {
        Self::from_glam(glam::Mat3::from_quat(quat.to_glam()))
    }

    pub fn from_scale(scale: Vector3) -> Self {
        Self::from_glam(glam::Mat3::from_diagonal(scale.to_glam()))
    }

    /// Column `index` of the matrix, i.e. the transformed axis.
    pub fn col(self, index: usize) -> Vector3 {
        Vector3::from_glam(self.to_glam().col(index))
    }

    pub fn determinant(self) -> f32 {
        self.glam(|m| m.determinant())
    }

    pub fn transposed(self) -> Self {
        Self::from_glam(self.to_glam().transpose())
    }
}

impl Default for Basis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ops::Mul<Vector3> for Basis {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Vector3 {
        Vector3::from_glam(self.to_glam() * rhs.to_glam())
    }
}

impl_glam_conv!(
    Basis,
    glam::Mat3,
    |b| glam::Mat3::from_cols(b.rows[0].to_glam(), b.rows[1].to_glam(), b.rows[2].to_glam()).transpose(),
    |m| {
        let t = m.transpose();
        Self::from_rows(
            Vector3::from_glam(t.x_axis),
            Vector3::from_glam(t.y_axis),
            Vector3::from_glam(t.z_axis),
        )
    }
);

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Affine 3D transform (3x4 matrix): basis plus origin.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Transform3D {
    pub basis: Basis,
    pub origin: Vector3,
}

impl Transform3D {
    pub const IDENTITY: Self = Self {
        basis: Basis::IDENTITY,
        origin: Vector3::ZERO,
    };

    pub const fn new(basis: Basis, origin: Vector3) -> Self {
        Self { basis, origin }
    }

    pub fn xform(self, point: Vector3) -> Vector3 {
        self.basis * point + self.origin
    }

    pub fn affine_inverse(self) -> Self {
        Self::from_glam(self.to_glam().inverse())
    }
}

impl ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.glam2(rhs, |a, b| a * b)
    }
}

impl_glam_conv!(
    Transform3D,
    glam::Affine3A,
    |t| glam::Affine3A::from_mat3_translation(t.basis.to_glam(), t.origin.to_glam()),
    |g| Self {
        basis: Basis::from_glam(glam::Mat3::from(g.matrix3)),
        origin: Vector3::from_glam(glam::Vec3::from(g.translation)),
    }
);
