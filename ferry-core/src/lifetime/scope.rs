/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of, MaybeUninit};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::lifetime::{Ownership, Resource, Token};
use crate::sys;
use sys::{LifecycleTable, ReleaseFn, ResourceKind, WireType};

/// Largest handle a scope entry can hold: one variant.
const ENTRY_BYTES: usize = sys::VARIANT_HANDLE_SIZE;
const ENTRY_ALIGN: usize = 8;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Batch of tokens belonging to one logical operation, released together.
///
/// Tokens are registered with [`track()`](Self::track) and released in reverse registration order when the scope [ends](Self::end).
/// Ending happens on drop as well, so every exit path releases: normal return, early return, `?` propagation and unwinding.
///
/// ```ignore
/// let scope = Scope::new();
/// let name = scope.adopt(&lifecycle, raw_name);   // released last
/// let path = scope.adopt(&lifecycle, raw_path);   // released first
/// call_with(name.handle(), path.handle())?;
/// // scope dropped: path, then name
/// ```
///
/// The [`Tracked`] handles borrow the scope, so the scope cannot be ended (`&mut self`) or dropped while a handle to one of its entries
/// is still in use. Scopes are neither `Send` nor `Sync`.
pub struct Scope {
    id: u64,
    entries: RefCell<Vec<Entry>>,
    ended: Cell<bool>,
    _not_send: PhantomData<*const ()>,
}

struct Entry {
    storage: EntryStorage,
    release: Option<ReleaseFn>,
    kind: ResourceKind,
    live: bool,
}

#[repr(C, align(8))]
struct EntryStorage(MaybeUninit<[u8; ENTRY_BYTES]>);

sys::static_assert!(align_of::<EntryStorage>() == ENTRY_ALIGN);

struct FitsEntry<R>(PhantomData<R>);

impl<R: Resource> FitsEntry<R> {
    const OK: () = assert!(
        size_of::<<R::Handle as WireType>::Repr>() <= ENTRY_BYTES
            && align_of::<<R::Handle as WireType>::Repr>() <= ENTRY_ALIGN,
        "resource handle does not fit into a scope entry"
    );
}

impl Scope {
    pub fn new() -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        sys::out!("scope #{id} opened");

        Self {
            id,
            entries: RefCell::new(Vec::new()),
            ended: Cell::new(false),
            _not_send: PhantomData,
        }
    }

    /// Registers a token. Owned tokens are released when the scope ends; borrowed ones are only recorded.
    ///
    /// # Panics
    /// If the scope has already ended.
    pub fn track<'s, R: Resource>(&'s self, token: Token<'s, R>) -> Tracked<'s, R> {
        #[allow(clippy::let_unit_value)]
        let () = FitsEntry::<R>::OK;

        assert!(!self.ended.get(), "scope #{} already ended; cannot track more tokens", self.id);

        let (handle, ownership, release) = token.into_parts();

        let mut storage = EntryStorage(MaybeUninit::uninit());
        // SAFETY: storage is large and aligned enough (FitsEntry above).
        unsafe {
            storage.0.as_mut_ptr().cast::<<R::Handle as WireType>::Repr>().write(handle.to_repr());
        }

        let mut entries = self.entries.borrow_mut();
        let index = entries.len();
        entries.push(Entry {
            storage,
            release,
            kind: R::KIND,
            live: true,
        });

        Tracked {
            index,
            scope_id: self.id,
            handle,
            ownership,
            _scope: PhantomData,
            _resource: PhantomData,
        }
    }

    /// Adopts `handle` as owned token and tracks it.
    ///
    /// # Safety
    /// Same as [`Token::adopt()`].
    pub unsafe fn adopt<R: Resource>(&self, lifecycle: &LifecycleTable, handle: R::Handle) -> Tracked<'_, R> {
        self.track(Token::adopt(handle, lifecycle))
    }

    /// Releases one entry before the scope ends.
    ///
    /// # Panics
    /// If `tracked` belongs to another scope.
    pub fn release<R: Resource>(&self, tracked: Tracked<'_, R>) {
        let release = self.take_entry(&tracked);

        if let Some((mut storage, release)) = release {
            // SAFETY: the entry held one ownership; it was removed from the scope above, so this is its only release.
            unsafe { release(storage.0.as_mut_ptr().cast()) };
        }
    }

    /// Removes an entry from the scope and returns its token, with the original ownership.
    ///
    /// Used to hand an owned value back to the foreign side, or to move it into another scope.
    ///
    /// # Panics
    /// If `tracked` belongs to another scope.
    pub fn transfer<'s, R: Resource>(&self, tracked: Tracked<'s, R>) -> Token<'s, R> {
        let release = self.take_entry(&tracked).map(|(_, release)| release);

        Token::from_parts(tracked.handle, tracked.ownership, release)
    }

    fn take_entry<R: Resource>(&self, tracked: &Tracked<'_, R>) -> Option<(EntryStorage, ReleaseFn)> {
        assert_eq!(
            tracked.scope_id, self.id,
            "token tracked by scope #{} passed to scope #{}",
            tracked.scope_id, self.id
        );

        let mut entries = self.entries.borrow_mut();
        let entry = &mut entries[tracked.index];
        debug_assert!(entry.live, "tracked handle refers to a dead entry");

        entry.live = false;
        let release = entry.release.take()?;

        // Moved out so that the foreign release runs without a borrow on `entries`.
        let storage = std::mem::replace(&mut entry.storage, EntryStorage(MaybeUninit::uninit()));
        Some((storage, release))
    }

    /// Releases all live owned entries in reverse registration order. Calling it again has no effect.
    pub fn end(&mut self) {
        if self.ended.replace(true) {
            return;
        }

        let entries = std::mem::take(self.entries.get_mut());
        let live = entries.iter().filter(|e| e.live && e.release.is_some()).count();
        sys::out!("scope #{} ends, releasing {live} of {} entries", self.id, entries.len());

        for mut entry in entries.into_iter().rev() {
            if !entry.live {
                continue;
            }

            if let Some(release) = entry.release.take() {
                sys::out!("  release {:?}", entry.kind);

                // SAFETY: each owned entry holds one ownership and is visited once.
                unsafe { release(entry.storage.0.as_mut_ptr().cast()) };
            }
        }
    }

    /// Number of entries registered and not yet released or transferred.
    pub fn len(&self) -> usize {
        self.entries.borrow().iter().filter(|e| e.live).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ended(&self) -> bool {
        self.ended.get()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.end();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("len", &self.len())
            .field("ended", &self.ended.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Entry of a [`Scope`]. Gives access to the handle while the scope is alive.
///
/// Not `Copy`: [`Scope::release()`] and [`Scope::transfer()`] consume it, so an entry cannot be released twice.
pub struct Tracked<'s, R: Resource> {
    index: usize,
    scope_id: u64,
    handle: R::Handle,
    ownership: Ownership,
    _scope: PhantomData<&'s Scope>,
    _resource: PhantomData<*const R>,
}

impl<R: Resource> Tracked<'_, R> {
    pub fn handle(&self) -> R::Handle {
        self.handle
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }
}

impl<R: Resource> fmt::Debug for Tracked<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("scope", &self.scope_id)
            .field("index", &self.index)
            .field("handle", &self.handle)
            .field("ownership", &self.ownership)
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
