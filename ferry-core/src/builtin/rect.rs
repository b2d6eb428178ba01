/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::builtin::{real, Vector2, Vector2i};

/// 2D axis-aligned bounding box using floating point coordinates.
#[derive(Default, Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Rect2 {
    pub position: Vector2,
    pub size: Vector2,
}

impl Rect2 {
    pub const fn new(position: Vector2, size: Vector2) -> Self {
        Self { position, size }
    }

    pub const fn from_components(x: real, y: real, width: real, height: real) -> Self {
        Self::new(Vector2::new(x, y), Vector2::new(width, height))
    }

    /// Corner opposite to `position`.
    pub fn end(self) -> Vector2 {
        self.position + self.size
    }

    pub fn area(self) -> real {
        self.size.x * self.size.y
    }

    /// Whether `point` lies inside; the end edges are exclusive.
    pub fn contains_point(self, point: Vector2) -> bool {
        let end = self.end();
        point.x >= self.position.x && point.y >= self.position.y && point.x < end.x && point.y < end.y
    }

    pub fn cast_int(self) -> Rect2i {
        Rect2i::new(self.position.cast_int(), self.size.cast_int())
    }
}

/// 2D axis-aligned bounding box using integer coordinates.
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Rect2i {
    pub position: Vector2i,
    pub size: Vector2i,
}

impl Rect2i {
    pub const fn new(position: Vector2i, size: Vector2i) -> Self {
        Self { position, size }
    }

    pub fn end(self) -> Vector2i {
        self.position + self.size
    }

    pub fn area(self) -> i32 {
        self.size.x * self.size.y
    }
}
