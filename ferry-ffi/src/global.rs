/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lazily initialized, mutex-guarded global.
///
/// Used for the few pieces of process-wide state the bridge keeps (class registry, call error ids). Compared to `OnceLock`, it gives
/// `&mut T` access; compared to `Mutex<Option<T>>`, the initializer lives in the declaration instead of at every use site:
///
/// ```ignore
/// static REGISTRY: Global<HashMap<ClassId, ClassRecord>> = Global::default();
///
/// REGISTRY.lock().insert(id, record);
/// ```
///
/// A panic while a guard is held does not poison the global; the bridge catches panics at every FFI boundary and keeps running, so
/// the stored state must stay accessible. A panic inside the *initializer* does leave the global unusable.
pub struct Global<T> {
    state: Mutex<LazyState<T>>,
}

impl<T> Global<T> {
    /// Creates the global with an initializer, run on first [`lock()`](Self::lock).
    pub const fn new(init_fn: fn() -> T) -> Self {
        Self {
            state: Mutex::new(LazyState::Pending(init_fn)),
        }
    }

    /// Creates the global with `T::default()` as initializer.
    ///
    /// Inherent rather than the `Default` trait, since the latter is not `const`.
    pub const fn default() -> Self
    where
        T: Default,
    {
        Self::new(T::default)
    }

    /// Blocks until the value is available and returns a guard to it.
    ///
    /// # Panics
    /// If the initializer panicked, now or during an earlier call.
    pub fn lock(&self) -> GlobalGuard<'_, T> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let LazyState::Pending(init_fn) = *guard {
            // Mark as failed first; only a successful initializer replaces it.
            *guard = LazyState::Failed;

            let value = std::panic::catch_unwind(init_fn).unwrap_or_else(|panic| {
                eprintln!("panic during Global<T> initialization");
                std::panic::resume_unwind(panic)
            });

            *guard = LazyState::Ready(value);
        }

        if !matches!(*guard, LazyState::Ready(_)) {
            panic!("previous Global<T> initialization failed due to panic");
        }

        GlobalGuard { guard }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Guards

/// Temporary access to the value of a [`Global<T>`].
pub struct GlobalGuard<'a, T> {
    // Invariant: always in `Ready` state.
    guard: MutexGuard<'a, LazyState<T>>,
}

impl<T> Deref for GlobalGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &*self.guard {
            LazyState::Ready(value) => value,
            _ => unreachable!("guard only exists for initialized globals"),
        }
    }
}

impl<T> DerefMut for GlobalGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut *self.guard {
            LazyState::Ready(value) => value,
            _ => unreachable!("guard only exists for initialized globals"),
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

enum LazyState<T> {
    Pending(fn() -> T),
    Ready(T),
    Failed,
}
