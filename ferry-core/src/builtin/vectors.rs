/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ops;

use crate::builtin::math::impl_glam_conv;
use crate::builtin::{real, GlamConv};

/// Declares a vector struct with named components, its constants, component-wise operators and its `glam` conversion.
macro_rules! vector {
    (
        $(#[$attr:meta])*
        $Vector:ident($Scalar:ty; $($comp:ident),+) <=> $Glam:ty
    ) => {
        $(#[$attr])*
        #[derive(Default, Copy, Clone, PartialEq, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(C)]
        pub struct $Vector {
            $( pub $comp: $Scalar, )+
        }

        impl $Vector {
            /// Vector with all components set to `0`.
            pub const ZERO: Self = Self::splat(0 as $Scalar);

            /// Vector with all components set to `1`.
            pub const ONE: Self = Self::splat(1 as $Scalar);

            pub const fn new($( $comp: $Scalar ),+) -> Self {
                Self { $( $comp ),+ }
            }

            pub const fn splat(value: $Scalar) -> Self {
                Self { $( $comp: value ),+ }
            }
        }

        impl_glam_conv!($Vector, $Glam, |v| <$Glam>::new($( v.$comp ),+), |g| Self { $( $comp: g.$comp ),+ });

        impl ops::Add for $Vector {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self { $( $comp: self.$comp + rhs.$comp ),+ }
            }
        }

        impl ops::Sub for $Vector {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self { $( $comp: self.$comp - rhs.$comp ),+ }
            }
        }

        impl ops::Mul<$Scalar> for $Vector {
            type Output = Self;

            fn mul(self, rhs: $Scalar) -> Self {
                Self { $( $comp: self.$comp * rhs ),+ }
            }
        }

        impl ops::Neg for $Vector {
            type Output = Self;

            fn neg(self) -> Self {
                Self { $( $comp: -self.$comp ),+ }
            }
        }
    };
}

vector! {
    /// Vector used for 2D math using floating point coordinates.
    Vector2(real; x, y) <=> glam::Vec2
}

vector! {
    /// Vector used for 2D math using integer coordinates.
    #[derive(Eq, Hash)]
    Vector2i(i32; x, y) <=> glam::IVec2
}

vector! {
    /// Vector used for 3D math using floating point coordinates.
    Vector3(real; x, y, z) <=> glam::Vec3
}

vector! {
    /// Vector used for 3D math using integer coordinates.
    #[derive(Eq, Hash)]
    Vector3i(i32; x, y, z) <=> glam::IVec3
}

vector! {
    /// 4D vector with floating point coordinates.
    Vector4(real; x, y, z, w) <=> glam::Vec4
}

vector! {
    #[derive(Eq, Hash)]
    Vector4i(i32; x, y, z, w) <=> glam::IVec4
}

crate::sys::static_assert_eq_size_align!(Vector2, glam::Vec2);
crate::sys::static_assert_eq_size_align!(Vector3, glam::Vec3);

impl Vector2 {
    pub fn length(self) -> real {
        self.glam(|v| v.length())
    }

    pub fn dot(self, with: Self) -> real {
        self.to_glam().dot(with.to_glam())
    }

    /// Converts to integer coordinates, truncating towards zero.
    pub fn cast_int(self) -> Vector2i {
        Vector2i::new(self.x as i32, self.y as i32)
    }
}

impl Vector3 {
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);

    pub fn length(self) -> real {
        self.glam(|v| v.length())
    }

    pub fn dot(self, with: Self) -> real {
        self.to_glam().dot(with.to_glam())
    }

    pub fn cross(self, with: Self) -> Self {
        self.glam2(with, |a, b| a.cross(b))
    }

    pub fn normalized(self) -> Self {
        Self::from_glam(self.to_glam().normalize_or_zero())
    }

    pub fn is_normalized(self) -> bool {
        self.to_glam().is_normalized()
    }

    pub fn cast_int(self) -> Vector3i {
        Vector3i::new(self.x as i32, self.y as i32, self.z as i32)
    }
}

impl Vector4 {
    pub fn length(self) -> real {
        self.glam(|v| v.length())
    }
}
