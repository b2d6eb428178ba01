/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::InitLevelSys;

/// Step in the runtime's initialization process.
///
/// Initialization and deinitialization are split into stages, like a stack. At each level, a different amount of runtime
/// functionality is available: method tables and classes declared for a level are only loaded once it starts. Deinitialization
/// happens in reverse order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum InitLevel {
    /// First level. Builtin types are available, classes are not.
    Core,

    /// Second level. Only server classes and builtins are available.
    Servers,

    /// Third level. Most classes are available.
    Scene,

    /// Fourth level, only in editor-like hosts. All classes are available.
    Editor,
}

impl InitLevel {
    pub const ALL: [Self; 4] = [Self::Core, Self::Servers, Self::Scene, Self::Editor];

    #[doc(hidden)]
    pub fn from_sys(level: InitLevelSys) -> Self {
        match level {
            0 => Self::Core,
            1 => Self::Servers,
            2 => Self::Scene,
            3 => Self::Editor,
            _ => {
                tracing::warn!(target: "ferry::sys", level, "unknown initialization level, assuming Scene");
                Self::Scene
            }
        }
    }

    #[doc(hidden)]
    pub fn to_sys(self) -> InitLevelSys {
        match self {
            Self::Core => 0,
            Self::Servers => 1,
            Self::Scene => 2,
            Self::Editor => 3,
        }
    }
}
