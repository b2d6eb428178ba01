/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Tokens and scopes releasing through the runtime's lifecycle functions.

mod common;

use common::Event;
use ferry::prelude::*;
use ferry::sys::{self, ArrayHandle, LifecycleTable, ResourceKind};
use proptest::prelude::*;

fn array(word: usize) -> ArrayHandle {
    ArrayHandle::from_word(word)
}

#[test]
fn owned_token_released_once_on_drop() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let token = Token::<GString>::from_str(lifecycle, "hello");
    let word = token.handle().word();
    assert_eq!(token.ownership(), Ownership::Owned);
    assert_eq!(common::string_contents(token.handle()), "hello");

    drop(token);
    assert_eq!(common::take_events(), vec![Event::Release(ResourceKind::String, word)]);
}

#[test]
fn explicit_release() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let token = unsafe { Token::<Array>::adopt(array(11), lifecycle) };
    common::mark("before");
    token.release();
    common::mark("after");

    assert_eq!(
        common::take_events(),
        vec![
            Event::Mark("before".to_string()),
            Event::Release(ResourceKind::Array, 11),
            Event::Mark("after".to_string()),
        ]
    );
}

#[test]
fn borrowed_tokens_never_released() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let owner = String::from("runtime object");
    {
        let borrowed = Token::<Array>::borrow(array(1));
        let bound = Token::<Variant>::bind_to_lifetime(common::variant_int(2), &owner);
        assert_eq!(bound.ownership(), Ownership::LifetimeBound);
        assert!(!borrowed.is_owned());

        let mut scope = Scope::new();
        scope.track(borrowed);
        scope.track(bound);
        scope.end();

        let passed_in = Token::<GString>::borrow(common::runtime_string("argument"));
        assert_eq!(passed_in.to_string_lossy(lifecycle), "argument");
    }

    assert_eq!(common::take_releases(), Vec::<usize>::new());
}

#[test]
fn into_owned_refuses_borrowed() {
    let borrowed = Token::<Array>::borrow(array(3));
    let borrowed = borrowed.into_owned().expect_err("borrowed token stays borrowed");
    assert_eq!(borrowed.ownership(), Ownership::Borrowed);
}

#[test]
fn clone_owned_copies_through_runtime() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let borrowed = Token::<Variant>::borrow(common::variant_int(42));
    let owned = borrowed.clone_owned(lifecycle);
    assert!(owned.is_owned());
    assert_eq!(common::variant_payload(owned.handle()), 42);

    drop(owned);
    drop(borrowed);

    assert_eq!(
        common::take_events(),
        vec![
            Event::Copy(ResourceKind::Variant, 42),
            Event::Release(ResourceKind::Variant, 42),
        ]
    );
}

#[test]
fn scope_releases_in_reverse_across_kinds() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let mut scope = Scope::new();
    let a = scope.track(Token::<GString>::from_str(lifecycle, "a")).handle().word();
    unsafe { scope.adopt::<Variant>(lifecycle, common::variant_int(-2)) };
    unsafe { scope.adopt::<Array>(lifecycle, array(3)) };

    scope.end();
    assert_eq!(
        common::take_events(),
        vec![
            Event::Release(ResourceKind::Array, 3),
            Event::Release(ResourceKind::Variant, -2_i64 as usize),
            Event::Release(ResourceKind::String, a),
        ]
    );
}

#[test]
fn end_is_idempotent() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let mut scope = Scope::new();
    unsafe { scope.adopt::<Array>(lifecycle, array(1)) };
    unsafe { scope.adopt::<Array>(lifecycle, array(2)) };

    scope.end();
    assert!(scope.is_ended());
    assert!(scope.is_empty());
    scope.end();
    drop(scope);

    assert_eq!(common::take_releases(), vec![2, 1]);
}

// An operation that creates three strings, calls into the runtime and fails after the second.
fn build_path(lifecycle: &LifecycleTable, fail_at: usize) -> Result<usize, String> {
    let scope = Scope::new();

    let mut created = 0;
    for part in ["root", "dir", "file"] {
        if created == fail_at {
            return Err(format!("failed before `{part}`"));
        }

        scope.track(Token::<GString>::from_str(lifecycle, part));
        created += 1;
    }

    Ok(scope.len())
}

#[test]
fn early_return_releases_tracked() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let err = build_path(lifecycle, 2).expect_err("fails at the third part");
    assert_eq!(err, "failed before `file`");

    let releases = common::take_releases();
    assert_eq!(releases.len(), 2);
    assert!(releases[0] > releases[1], "later string released first");

    assert_eq!(build_path(lifecycle, usize::MAX), Ok(3));
    assert_eq!(common::take_releases().len(), 3);
}

#[test]
fn question_mark_releases_tracked() {
    fn non_empty(s: String) -> Result<String, ConversionError> {
        match s.is_empty() {
            true => Err(ConversionError::NegativeLength { len: 0 }),
            false => Ok(s),
        }
    }

    // Copies each runtime string into the scope before reading it.
    fn convert_all(lifecycle: &LifecycleTable, words: &[usize]) -> Result<Vec<String>, ConversionError> {
        let scope = Scope::new();
        let mut out = Vec::new();

        for word in words {
            let copy = Token::<GString>::borrow(sys::StringHandle::from_word(*word)).clone_owned(lifecycle);
            let tracked = scope.track(copy);

            let token = Token::<GString>::borrow(tracked.handle());
            out.push(non_empty(token.to_string(lifecycle)?)?);
        }

        Ok(out)
    }

    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    let first = common::runtime_string("first").word();
    let second = common::runtime_string("second").word();
    common::take_events();

    let result = convert_all(lifecycle, &[first, 0, second]);
    assert!(result.is_err());
    assert_eq!(common::take_releases(), vec![0, first]);

    let result = convert_all(lifecycle, &[first, second]);
    assert_eq!(result.ok(), Some(vec!["first".to_string(), "second".to_string()]));
    assert_eq!(common::take_releases(), vec![second, first]);
}

#[test]
fn panic_releases_tracked() {
    let binding = common::binding();
    common::take_events();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let lifecycle = binding.lifecycle();
        let scope = Scope::new();
        unsafe { scope.adopt::<Array>(lifecycle, array(7)) };
        unsafe { scope.adopt::<Array>(lifecycle, array(8)) };

        let _loose = unsafe { Token::<Array>::adopt(array(9), lifecycle) };
        panic!("runtime returned garbage");
    }));

    assert!(result.is_err());
    // Locals drop in reverse declaration order: the loose token before the scope.
    assert_eq!(common::take_releases(), vec![9, 8, 7]);
}

#[test]
fn early_release_and_transfer() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let mut outer = Scope::new();
    let kept = {
        let inner = Scope::new();
        let _a = unsafe { inner.adopt::<Array>(lifecycle, array(1)) };
        let b = unsafe { inner.adopt::<Array>(lifecycle, array(2)) };
        let c = unsafe { inner.adopt::<Array>(lifecycle, array(3)) };

        inner.release(b);
        assert_eq!(common::take_releases(), vec![2]);

        outer.track(inner.transfer(c));
        inner.len()
    };

    assert_eq!(kept, 1);
    assert_eq!(common::take_releases(), vec![1]);

    outer.end();
    assert_eq!(common::take_releases(), vec![3]);
}

#[test]
fn transferred_token_leaves_as_raw() {
    let binding = common::binding();
    let lifecycle = binding.lifecycle();
    common::take_events();

    let raw = {
        let scope = Scope::new();
        let result = scope.track(Token::<GString>::from_str(lifecycle, "returned to runtime"));
        let token = scope.transfer(result).into_owned().expect("owned");
        token.into_raw()
    };

    assert_eq!(common::string_contents(raw), "returned to runtime");
    assert_eq!(common::take_releases(), Vec::<usize>::new());
}

proptest! {
    // Tokens of mixed ownership, some released early: owned ones are released exactly once, borrowed ones never.
    #[test]
    fn release_order(plan in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..20)) {
        let binding = common::binding();
        let lifecycle = binding.lifecycle();
        common::take_events();

        let mut scope = Scope::new();
        let mut early = Vec::new();
        let mut at_end = Vec::new();

        for (i, (owned, release_early)) in plan.iter().enumerate() {
            let word = i + 1;
            let tracked = if *owned {
                unsafe { scope.adopt::<Array>(lifecycle, array(word)) }
            } else {
                scope.track(Token::<Array>::borrow(array(word)))
            };

            match (*owned, *release_early) {
                (true, true) => {
                    scope.release(tracked);
                    early.push(word);
                }
                (true, false) => at_end.push(word),
                (false, true) => scope.release(tracked),
                (false, false) => {}
            }
        }

        scope.end();
        scope.end();

        at_end.reverse();
        early.extend(at_end);
        prop_assert_eq!(common::take_releases(), early);
    }
}
