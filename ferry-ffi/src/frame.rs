/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Fixed-layout argument buffer for pointer calls.
//!
//! A pointer call hands the runtime an array of pointers, one per argument, each pointing to a value in the runtime's in-memory layout,
//! plus a pointer to uninitialized storage for the return value. [`CallFrame`] owns that storage for up to [`MAX_ARGS`] arguments, so
//! that a call never allocates.
//!
//! ```ignore
//! let mut frame = CallFrame::new();
//! frame.arg(3_i64).arg(true);
//! let ret = frame.ret::<f64>();
//! unsafe { dispatch(handle, receiver, &mut frame) };
//! let value: f64 = ret.get(&frame);
//! ```

use std::marker::PhantomData;
use std::mem::{size_of, MaybeUninit};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{ConstTypePtr, TypePtr, WireKind, WireType};

/// Maximum number of arguments in a pointer call.
pub const MAX_ARGS: usize = 16;

/// Bytes per slot. The largest inline wire type is a 3D transform (48 bytes); 64 leaves room for 4x4 aggregates.
pub const SLOT_BYTES: usize = 64;

/// Alignment of every slot.
pub const SLOT_ALIGN: usize = 16;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

#[repr(C, align(16))]
#[derive(Copy, Clone)]
struct Slot(MaybeUninit<[u8; SLOT_BYTES]>);

crate::static_assert!(std::mem::align_of::<Slot>() == SLOT_ALIGN);

impl Slot {
    const UNINIT: Self = Self(MaybeUninit::uninit());

    fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr().cast()
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr().cast()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum FrameState {
    Building,
    Returned,
}

/// Argument slots plus one return slot for a single foreign call.
///
/// Arguments are appended in declaration order with [`arg()`](Self::arg). The slot layout of each argument is fixed by its
/// [`WireType`], so width and order are decided by the types at the call site, without runtime type checks.
///
/// Indirect values (strings, arrays, objects, ...) are encoded by handle only; the frame never copies or releases foreign memory.
pub struct CallFrame {
    id: u64,

    // Bumped by every ret() and reset(); a RetSlot is only valid for the generation it was reserved in.
    generation: u64,

    args: [Slot; MAX_ARGS],
    arg_ptrs: [ConstTypePtr; MAX_ARGS],
    arg_count: usize,
    ret: Slot,
    ret_kind: Option<WireKind>,
    state: FrameState,
}

impl CallFrame {
    pub fn new() -> Self {
        Self {
            id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            args: [Slot::UNINIT; MAX_ARGS],
            arg_ptrs: [std::ptr::null(); MAX_ARGS],
            arg_count: 0,
            ret: Slot::UNINIT,
            ret_kind: None,
            state: FrameState::Building,
        }
    }

    /// Appends one argument.
    ///
    /// # Panics
    /// If the frame already holds [`MAX_ARGS`] arguments.
    #[inline]
    pub fn arg<T: WireType>(&mut self, value: T) -> &mut Self {
        #[allow(clippy::let_unit_value)]
        let () = T::FITS_SLOT;

        let index = self.arg_count;
        assert!(
            index < MAX_ARGS,
            "call frame holds at most {MAX_ARGS} arguments"
        );

        // SAFETY: the slot is large and aligned enough for T::Repr (checked at compile time above).
        unsafe {
            self.args[index]
                .as_mut_ptr()
                .cast::<T::Repr>()
                .write(value.to_repr());
        }

        self.arg_count += 1;
        self
    }

    /// Reserves the return slot for a value of type `T`.
    ///
    /// The returned [`RetSlot`] is a typed ticket; decode the value with [`RetSlot::get()`] once the call has been dispatched.
    /// Reserving again, or resetting the frame, invalidates earlier tickets.
    #[inline]
    pub fn ret<T: WireType>(&mut self) -> RetSlot<T> {
        #[allow(clippy::let_unit_value)]
        let () = T::FITS_SLOT;

        // Zero the bytes the runtime is going to write, so a void-like callee leaves a defined value behind.
        // SAFETY: the slot has at least size_of::<T::Repr>() bytes.
        unsafe {
            std::ptr::write_bytes(self.ret.as_mut_ptr(), 0, size_of::<T::Repr>());
        }

        self.generation += 1;
        self.ret_kind = Some(T::KIND);

        RetSlot {
            frame_id: self.id,
            generation: self.generation,
            _marker: PhantomData,
        }
    }

    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    pub fn is_returned(&self) -> bool {
        self.state == FrameState::Returned
    }

    /// Clears all arguments, so the frame can be reused for another call.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.arg_count = 0;
        self.ret_kind = None;
        self.state = FrameState::Building;
    }

    /// Pointer to the argument pointer array, as passed to the runtime.
    ///
    /// The pointers refer into `self`, so they are only valid as long as the frame is neither moved nor modified.
    pub fn arg_ptrs(&mut self) -> *const ConstTypePtr {
        for (ptr, slot) in self.arg_ptrs.iter_mut().zip(&self.args).take(self.arg_count) {
            *ptr = slot.as_ptr().cast();
        }

        self.arg_ptrs.as_ptr()
    }

    /// Pointer to the return slot.
    pub fn ret_ptr(&mut self) -> TypePtr {
        self.ret.as_mut_ptr().cast()
    }

    /// Called once the foreign side has written the return slot.
    ///
    /// # Safety
    /// The return slot must hold a valid value of the reserved type (or be left zeroed for `()`-like returns).
    pub unsafe fn mark_returned(&mut self) {
        self.state = FrameState::Returned;
    }

    /// Raw access to an already encoded argument; used by runtimes or tests that echo arguments back.
    pub fn arg_slot_ptr(&self, index: usize) -> Option<ConstTypePtr> {
        (index < self.arg_count).then(|| self.args[index].as_ptr().cast())
    }
}

impl Default for CallFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallFrame")
            .field("arg_count", &self.arg_count)
            .field("ret_kind", &self.ret_kind)
            .field("state", &self.state)
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Typed ticket for the return slot of a [`CallFrame`].
#[must_use = "the return value is only decoded by RetSlot::get()"]
pub struct RetSlot<T: WireType> {
    frame_id: u64,
    generation: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: WireType> RetSlot<T> {
    /// Decodes the return value.
    ///
    /// # Panics
    /// - If the slot was reserved on another frame.
    /// - If `frame` was reset, or its return slot reserved again, after this slot was handed out.
    /// - If `frame` has not been dispatched yet.
    #[inline]
    pub fn get(self, frame: &CallFrame) -> T {
        assert_eq!(
            self.frame_id, frame.id,
            "return slot read from a frame it was not reserved on"
        );
        assert_eq!(
            self.generation, frame.generation,
            "stale return slot: the frame was reset or reserved again since"
        );
        assert!(
            frame.is_returned(),
            "return slot read before the foreign call completed"
        );
        crate::strict_assert_eq!(frame.ret_kind, Some(T::KIND));

        // SAFETY: the frame was dispatched, so the runtime wrote a T::Repr (mark_returned contract).
        let repr = unsafe { frame.ret.as_ptr().cast::<T::Repr>().read() };
        T::from_repr(repr)
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
