/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Conversion of a wire aggregate to and from its `glam` counterpart.
///
/// ```ignore
/// let len = v.glam(|v| v.length());
/// let sum = a.glam2(&b, |a, b| a + b);
/// ```
pub trait GlamConv: Sized {
    type Glam;

    fn to_glam(self) -> Self::Glam;

    fn from_glam(glam: Self::Glam) -> Self;

    /// Applies a `glam` function, without converting the result back.
    #[inline]
    fn glam<F, R>(self, unary_fn: F) -> R
    where
        F: FnOnce(Self::Glam) -> R,
    {
        unary_fn(self.to_glam())
    }

    /// Applies a binary `glam` operation and converts the result back.
    #[inline]
    fn glam2<F>(self, rhs: Self, binary_fn: F) -> Self
    where
        F: FnOnce(Self::Glam, Self::Glam) -> Self::Glam,
    {
        Self::from_glam(binary_fn(self.to_glam(), rhs.to_glam()))
    }
}

/// Implements `GlamConv` plus `From` in both directions.
macro_rules! impl_glam_conv {
    ($T:ty, $Glam:ty, |$s:ident| $to:expr, |$g:ident| $from:expr) => {
        impl $crate::builtin::GlamConv for $T {
            type Glam = $Glam;

            #[inline]
            fn to_glam(self) -> $Glam {
                let $s = self;
                $to
            }

            #[inline]
            fn from_glam($g: $Glam) -> Self {
                $from
            }
        }

        impl From<$T> for $Glam {
            #[inline]
            fn from(value: $T) -> Self {
                $crate::builtin::GlamConv::to_glam(value)
            }
        }

        impl From<$Glam> for $T {
            #[inline]
            fn from(value: $Glam) -> Self {
                <$T as $crate::builtin::GlamConv>::from_glam(value)
            }
        }
    };
}

pub(crate) use impl_glam_conv;
