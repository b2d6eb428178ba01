/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::builtin::math::impl_glam_conv;

/// Color in RGBA format, with 32-bit float components.
///
/// Components are usually in the range `0..=1`, but HDR colors may exceed it.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT_BLACK: Self = Self::from_rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::from_rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::from_rgb(1.0, 1.0, 1.0);

    pub const fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::from_rgba(r, g, b, 1.0)
    }

    /// Constructs from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        let f = |c: u8| f32::from(c) / 255.0;
        Self::from_rgba(f(r), f(g), f(b), f(a))
    }

    /// Packs into `0xRRGGBBAA`, clamping each channel.
    pub fn to_rgba32(self) -> u32 {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (c(self.r) << 24) | (c(self.g) << 16) | (c(self.b) << 8) | c(self.a)
    }
}

/// Defaults to opaque black.
impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl_glam_conv!(Color, glam::Vec4, |c| glam::Vec4::new(c.r, c.g, c.b, c.a), |v| Self::from_rgba(v.x, v.y, v.z, v.w));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_roundtrip() {
        let c = Color::from_rgba8(255, 0, 51, 255);
        assert_eq!(c.to_rgba32(), 0xff00_33ff);
        assert_eq!(Color::default(), Color::BLACK);
    }

    #[test]
    fn glam_channels() {
        let v: glam::Vec4 = Color::from_rgba(0.1, 0.2, 0.3, 0.4).into();
        assert_eq!(v.w, 0.4);
    }
}
