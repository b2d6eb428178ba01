/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::marker::PhantomData;
use std::mem::{ManuallyDrop, MaybeUninit};

use crate::lifetime::Resource;
use crate::sys;
use sys::{LifecycleTable, ReleaseFn, WireType};

/// Who is responsible for releasing the foreign resource behind a [`Token`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Ownership {
    /// The host holds one ownership and releases it exactly once.
    Owned,

    /// Someone else owns the resource for the duration of the token's lifetime. Never released.
    Borrowed,

    /// Valid as long as a host owner object is alive; the owner keeps the resource alive. Never released.
    LifetimeBound,
}

/// Handle of a foreign resource, together with its ownership.
///
/// Tokens are linear: neither `Copy` nor `Clone`. [`release()`](Self::release) and [`into_raw()`](Self::into_raw) consume the token,
/// so releasing twice does not compile. An `Owned` token that is dropped is released at that point.
///
/// The lifetime `'a` bounds non-owning tokens: a borrowed argument cannot outlive the call it was passed to, and a lifetime-bound
/// token cannot outlive its owner. Owned tokens are `'static`.
pub struct Token<'a, R: Resource> {
    handle: R::Handle,
    ownership: Ownership,

    // Invariant: Some if and only if ownership == Owned.
    release: Option<ReleaseFn>,

    _lifetime: PhantomData<&'a ()>,
    _resource: PhantomData<*const R>,
}

impl<R: Resource> Token<'static, R> {
    /// Takes over one ownership of `handle`. The token releases it through `lifecycle` when released or dropped.
    ///
    /// # Safety
    /// The caller must hold an ownership of `handle` (freshly created, returned by the runtime as new, or copied) and hand it over to
    /// the token: nothing else may release this ownership.
    pub unsafe fn adopt(handle: R::Handle, lifecycle: &LifecycleTable) -> Self {
        Self::from_parts(
            handle,
            Ownership::Owned,
            Some(lifecycle.release_fn(R::KIND)),
        )
    }
}

impl<'a, R: Resource> Token<'a, R> {
    /// Borrows a handle owned elsewhere. The token never releases anything.
    pub fn borrow(handle: R::Handle) -> Self {
        Self::from_parts(handle, Ownership::Borrowed, None)
    }

    /// Borrows a handle that stays valid as long as `owner` is alive.
    pub fn bind_to_lifetime<O: ?Sized>(handle: R::Handle, owner: &'a O) -> Self {
        let _ = owner;
        Self::from_parts(handle, Ownership::LifetimeBound, None)
    }

    pub(crate) fn from_parts(
        handle: R::Handle,
        ownership: Ownership,
        release: Option<ReleaseFn>,
    ) -> Self {
        debug_assert_eq!(release.is_some(), ownership == Ownership::Owned);

        Self {
            handle,
            ownership,
            release,
            _lifetime: PhantomData,
            _resource: PhantomData,
        }
    }

    /// Raw handle, for encoding into a call frame. Does not affect ownership.
    pub fn handle(&self) -> R::Handle {
        self.handle
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    /// Releases the token. For `Owned` tokens, this gives up the ownership through exactly one foreign release call.
    pub fn release(self) {
        drop(self);
    }

    /// Gives up the token without releasing, returning the handle.
    ///
    /// For `Owned` tokens, the ownership moves to whoever receives the handle, typically the foreign side through a return slot.
    pub fn into_raw(self) -> R::Handle {
        let this = ManuallyDrop::new(self);
        this.handle
    }

    /// Detaches an owned token from its lifetime. Owned tokens hold their own ownership and borrow nothing; other tokens come back as
    /// `Err` unchanged.
    ///
    /// Typical use is returning a value that was tracked by a [`Scope`](crate::lifetime::Scope) and then transferred out of it.
    pub fn into_owned(self) -> Result<Token<'static, R>, Self> {
        if !self.is_owned() {
            return Err(self);
        }

        let (handle, ownership, release) = self.into_parts();
        Ok(Token::from_parts(handle, ownership, release))
    }

    /// Creates a new owned token for the same resource, through the foreign copy function (copy constructor or reference increment).
    pub fn clone_owned(&self, lifecycle: &LifecycleTable) -> Token<'static, R> {
        let copy = lifecycle.copy_fn(R::KIND);

        let src = self.handle.to_repr();
        let mut dst = MaybeUninit::<<R::Handle as WireType>::Repr>::uninit();

        // SAFETY: the copy function initializes `dst` with a new owned value of the same kind.
        let handle = unsafe {
            copy(dst.as_mut_ptr().cast(), std::ptr::from_ref(&src).cast());
            R::Handle::from_repr(dst.assume_init())
        };

        // SAFETY: the copy yielded a new ownership, which the token takes over.
        unsafe { Token::adopt(handle, lifecycle) }
    }

    /// Splits the token into parts without running `Drop`.
    pub(crate) fn into_parts(self) -> (R::Handle, Ownership, Option<ReleaseFn>) {
        let this = ManuallyDrop::new(self);
        (this.handle, this.ownership, this.release)
    }
}

impl<R: Resource> Drop for Token<'_, R> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            let mut repr = self.handle.to_repr();

            sys::out!("release {:?} {:?}", R::KIND, self.handle);

            // SAFETY: the token holds one ownership of the handle (adopt contract) and gives it up here, once.
            unsafe { release(std::ptr::from_mut(&mut repr).cast()) };
        }
    }
}

impl<R: Resource> fmt::Debug for Token<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("kind", &R::KIND)
            .field("handle", &self.handle)
            .field("ownership", &self.ownership)
            .finish()
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::resources::{Array, RawObject, Variant};
    use crate::testing::{fake_lifecycle, take_events, take_releases, Event};
    use sys::{ArrayHandle, ResourceKind};

    fn adopt_array(word: usize) -> Token<'static, Array> {
        unsafe { Token::adopt(ArrayHandle::from_word(word), &fake_lifecycle()) }
    }

    #[test]
    fn owned_release_once() {
        take_events();

        let token = adopt_array(7);
        assert!(token.is_owned());
        token.release();

        assert_eq!(take_events(), vec![Event::Release(ResourceKind::Array, 7)]);
    }

    #[test]
    fn owned_drop_releases() {
        take_events();

        {
            let _token = adopt_array(8);
        }

        assert_eq!(take_releases(), vec![8]);
    }

    #[test]
    fn borrowed_never_released() {
        take_events();

        let token = Token::<Array>::borrow(ArrayHandle::from_word(9));
        assert_eq!(token.ownership(), Ownership::Borrowed);
        token.release();

        let owner = String::from("owner");
        let bound = Token::<Array>::bind_to_lifetime(ArrayHandle::from_word(10), &owner);
        assert_eq!(bound.ownership(), Ownership::LifetimeBound);
        drop(bound);

        assert!(take_events().is_empty());
    }

    #[test]
    fn into_raw_skips_release() {
        take_events();

        let handle = adopt_array(11).into_raw();
        assert_eq!(handle.word(), 11);
        assert!(take_events().is_empty());
    }

    #[test]
    fn into_owned_keeps_ownership() {
        take_events();

        let owner = String::from("owner");
        let bound = Token::<Array>::bind_to_lifetime(ArrayHandle::from_word(13), &owner);
        let bound = bound.into_owned().expect_err("non-owned tokens stay bound");
        assert_eq!(bound.ownership(), Ownership::LifetimeBound);

        let owned: Token<'static, Array> = adopt_array(14).into_owned().expect("owned token detaches");
        drop(owned);

        assert_eq!(take_releases(), vec![14]);
    }

    #[test]
    fn clone_owned_copies() {
        take_events();
        let lifecycle = fake_lifecycle();

        let borrowed = Token::<Array>::borrow(ArrayHandle::from_word(12));
        let owned = borrowed.clone_owned(&lifecycle);
        assert!(owned.is_owned());
        assert_eq!(owned.handle().word(), 12);

        drop(borrowed);
        drop(owned);

        assert_eq!(
            take_events(),
            vec![
                Event::Copy(ResourceKind::Array, 12),
                Event::Release(ResourceKind::Array, 12),
            ]
        );
    }

    #[test]
    fn variant_and_object_release() {
        take_events();
        let lifecycle = fake_lifecycle();

        let mut bytes = [0_u8; sys::VARIANT_HANDLE_SIZE];
        bytes[8..16].copy_from_slice(&21_usize.to_ne_bytes());
        let variant = sys::VariantHandle::from_opaque(sys::Opaque::from_bytes(bytes));

        let object = 0x40 as sys::ObjectPtr;

        unsafe {
            Token::<Variant>::adopt(variant, &lifecycle).release();
            Token::<RawObject>::adopt(object, &lifecycle).release();
        }

        assert_eq!(
            take_events(),
            vec![
                Event::Release(ResourceKind::Variant, 21),
                Event::Release(ResourceKind::Object, 0x40),
            ]
        );
    }
}
