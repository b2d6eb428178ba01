/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Fake runtime for unit tests: records every release and copy per thread, and keeps strings and objects in thread-local tables.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_char, CStr};

use crate::sys;
use sys::{
    Binding, BridgeConfig, ClassCreationInfo, ClassLibraryPtr, ConstTypePtr, ConstVariantPtr, CopyFn,
    ForeignInterface, InstancePtr, Int, MethodBindPtr, ObjectPtr, ReleaseFn, ResourceKind, TypePtr,
    UninitTypePtr, VariantFromTypeFn, VariantPtr, VariantToTypeFn, WireKind, WireKindSys,
};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Event {
    Release(ResourceKind, usize),
    Copy(ResourceKind, usize),
}

pub struct FakeObject {
    pub class: String,
    pub instance: InstancePtr,
    pub id: u64,
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
    static STRINGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static OBJECTS: RefCell<HashMap<u64, *mut FakeObject>> = RefCell::new(HashMap::new());
    static NEXT_OBJECT_ID: Cell<u64> = const { Cell::new(1) };
}

pub fn take_events() -> Vec<Event> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

/// Handle words of all releases since the last call, in order.
pub fn take_releases() -> Vec<usize> {
    take_events()
        .into_iter()
        .filter_map(|event| match event {
            Event::Release(_, word) => Some(word),
            Event::Copy(..) => None,
        })
        .collect()
}

fn record(event: Event) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

// Variants carry their tag in the first word; the payload word identifies them.
unsafe fn handle_word(kind: ResourceKind, value: ConstTypePtr) -> usize {
    let words = value.cast::<usize>();
    match kind {
        ResourceKind::Variant => words.add(1).read(),
        _ => words.read(),
    }
}

fn handle_size(kind: ResourceKind) -> usize {
    match kind {
        ResourceKind::Variant => sys::VARIANT_HANDLE_SIZE,
        _ => sys::POINTER_HANDLE_SIZE,
    }
}

macro_rules! lifecycle_fns {
    ($( $kind:ident => $release:ident, $copy:ident; )*) => {
        $(
            unsafe extern "C" fn $release(value: TypePtr) {
                record(Event::Release(ResourceKind::$kind, handle_word(ResourceKind::$kind, value)));
            }

            unsafe extern "C" fn $copy(dst: UninitTypePtr, src: ConstTypePtr) {
                let kind = ResourceKind::$kind;
                std::ptr::copy_nonoverlapping(src.cast::<u8>(), dst.cast::<u8>(), handle_size(kind));
                record(Event::Copy(kind, handle_word(kind, src)));
            }
        )*

        unsafe extern "C" fn get_release_fn(kind: WireKindSys) -> Option<ReleaseFn> {
            match WireKind::from_sys(kind)?.resource_kind()? {
                $( ResourceKind::$kind => Some($release), )*
            }
        }

        unsafe extern "C" fn get_copy_fn(kind: WireKindSys) -> Option<CopyFn> {
            match WireKind::from_sys(kind)?.resource_kind()? {
                $( ResourceKind::$kind => Some($copy), )*
            }
        }
    };
}

lifecycle_fns! {
    Object => release_object, copy_object;
    String => release_string, copy_string;
    StringName => release_string_name, copy_string_name;
    Array => release_array, copy_array;
    Dictionary => release_dictionary, copy_dictionary;
    Variant => release_variant, copy_variant;
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Variants: tag in the first word, payload of up to 16 bytes from the second word on.

unsafe extern "C" fn variant_from<const TAG: u32, const SIZE: usize>(dst: VariantPtr, src: ConstTypePtr) {
    let mut bytes = [0_u8; sys::VARIANT_HANDLE_SIZE];
    bytes[..4].copy_from_slice(&TAG.to_ne_bytes());
    std::ptr::copy_nonoverlapping(src.cast::<u8>(), bytes[8..].as_mut_ptr(), SIZE);

    // Strings go in by copy.
    if TAG == WireKind::String.to_sys() {
        record(Event::Copy(ResourceKind::String, src.cast::<usize>().read_unaligned()));
    }
    dst.cast::<[u8; sys::VARIANT_HANDLE_SIZE]>().write(bytes);
}

unsafe extern "C" fn variant_to<const TAG: u32, const SIZE: usize>(dst: UninitTypePtr, src: ConstVariantPtr) {
    let payload = src.cast::<u8>().add(8);
    std::ptr::copy_nonoverlapping(payload, dst.cast::<u8>(), SIZE);

    if TAG == WireKind::String.to_sys() {
        record(Event::Copy(ResourceKind::String, payload.cast::<usize>().read_unaligned()));
    }
}

macro_rules! variant_constructors {
    ($( $kind:ident => $Repr:ty ),* $(,)?) => {
        unsafe extern "C" fn get_variant_from_type(kind: WireKindSys) -> Option<VariantFromTypeFn> {
            match WireKind::from_sys(kind)? {
                $(
                    WireKind::$kind => Some(
                        variant_from::<{ WireKind::$kind.to_sys() }, { std::mem::size_of::<$Repr>() }> as VariantFromTypeFn,
                    ),
                )*
                _ => None,
            }
        }

        unsafe extern "C" fn get_variant_to_type(kind: WireKindSys) -> Option<VariantToTypeFn> {
            match WireKind::from_sys(kind)? {
                $(
                    WireKind::$kind => Some(
                        variant_to::<{ WireKind::$kind.to_sys() }, { std::mem::size_of::<$Repr>() }> as VariantToTypeFn,
                    ),
                )*
                _ => None,
            }
        }
    };
}

variant_constructors! {
    Nil => (),
    Bool => u8,
    Int32 => i32,
    Int64 => i64,
    Float32 => f32,
    Float64 => f64,
    Vector2 => [f32; 2],
    Vector3 => [f32; 3],
    String => usize,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Strings: handle word is index + 1 into STRINGS.

unsafe extern "C" fn string_new(dst: UninitTypePtr, chars: *const c_char, len: Int) {
    let bytes = std::slice::from_raw_parts(chars.cast::<u8>(), len as usize);
    let string = String::from_utf8_lossy(bytes).into_owned();

    let word = STRINGS.with(|strings| {
        let mut strings = strings.borrow_mut();
        strings.push(string);
        strings.len()
    });
    dst.cast::<usize>().write(word);
}

unsafe extern "C" fn string_to_utf8(src: ConstTypePtr, buffer: *mut c_char, capacity: Int) -> Int {
    let word = src.cast::<usize>().read();
    let bytes = match word {
        // Raw bytes planted by tests that need invalid UTF-8.
        usize::MAX => vec![0xff, 0xfe],
        0 => Vec::new(),
        _ => STRINGS.with(|strings| strings.borrow()[word - 1].clone().into_bytes()),
    };

    let count = bytes.len().min(capacity as usize);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.cast::<u8>(), count);
    bytes.len() as Int
}

/// Handle word of a string whose contents are not valid UTF-8.
pub const INVALID_UTF8_WORD: usize = usize::MAX;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Objects

unsafe extern "C" fn construct(class: *const c_char) -> ObjectPtr {
    let id = NEXT_OBJECT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });

    let object = Box::into_raw(Box::new(FakeObject {
        class: CStr::from_ptr(class).to_string_lossy().into_owned(),
        instance: std::ptr::null_mut(),
        id,
    }));

    OBJECTS.with(|objects| objects.borrow_mut().insert(id, object));
    object.cast()
}

unsafe extern "C" fn instance_id(object: ObjectPtr) -> u64 {
    (*object.cast::<FakeObject>()).id
}

unsafe extern "C" fn instance_from_id(id: u64) -> ObjectPtr {
    OBJECTS.with(|objects| objects.borrow().get(&id).map_or(std::ptr::null_mut(), |obj| obj.cast()))
}

unsafe extern "C" fn set_instance(object: ObjectPtr, _class: *const c_char, instance: InstancePtr) {
    (*object.cast::<FakeObject>()).instance = instance;
}

pub fn construct_object(class: &CStr) -> ObjectPtr {
    unsafe { construct(class.as_ptr()) }
}

/// Frees a fake object; its instance ID becomes stale.
pub fn destroy_object(object: ObjectPtr) {
    let object = object.cast::<FakeObject>();
    let id = unsafe { (*object).id };

    OBJECTS.with(|objects| objects.borrow_mut().remove(&id));
    drop(unsafe { Box::from_raw(object) });
}

pub fn object_instance(object: ObjectPtr) -> InstancePtr {
    unsafe { (*object.cast::<FakeObject>()).instance }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Methods: bind pointer encodes the hash; ptrcall returns it.

unsafe extern "C" fn get_method_bind(_class: *const c_char, _method: *const c_char, hash: Int) -> MethodBindPtr {
    hash as usize as MethodBindPtr
}

unsafe extern "C" fn ptrcall(method: MethodBindPtr, _receiver: ObjectPtr, _args: *const ConstTypePtr, ret: TypePtr) {
    ret.cast::<i64>().write(method as usize as i64);
}

unsafe extern "C" fn varcall(
    _method: MethodBindPtr,
    _receiver: ObjectPtr,
    _args: *const ConstVariantPtr,
    _arg_count: Int,
    _ret: VariantPtr,
    error: *mut sys::CallErrorSys,
) {
    (*error).error = sys::CALL_ERROR_INVALID_METHOD;
}

unsafe extern "C" fn register(
    _library: ClassLibraryPtr,
    _class: *const c_char,
    _parent: *const c_char,
    _info: *const ClassCreationInfo,
) {
}

unsafe extern "C" fn unregister(_library: ClassLibraryPtr, _class: *const c_char) {}

pub fn fake_interface() -> ForeignInterface {
    ForeignInterface {
        version_major: 1,
        version_minor: 0,
        version_string: c"fake core 1.0".as_ptr(),
        get_method_bind: Some(get_method_bind),
        method_bind_ptrcall: Some(ptrcall),
        method_bind_call: Some(varcall),
        object_get_instance_id: Some(instance_id),
        object_get_instance_from_id: Some(instance_from_id),
        object_set_instance: Some(set_instance),
        get_release_fn: Some(get_release_fn),
        get_copy_fn: Some(get_copy_fn),
        get_variant_from_type_constructor: Some(get_variant_from_type),
        get_variant_to_type_constructor: Some(get_variant_to_type),
        string_new_with_utf8: Some(string_new),
        string_to_utf8: Some(string_to_utf8),
        classdb_construct_object: Some(construct),
        classdb_register_class: Some(register),
        classdb_unregister_class: Some(unregister),
        print_error: None,
        print_warning: None,
    }
}

pub fn fake_binding_with(config: BridgeConfig) -> Binding {
    let interface = fake_interface();

    // SAFETY: all functions of the fake interface are callable.
    unsafe { Binding::load(&interface, std::ptr::null_mut(), config) }.expect("fake interface is complete")
}

pub fn fake_binding() -> Binding {
    fake_binding_with(BridgeConfig::default())
}

pub fn fake_lifecycle() -> sys::LifecycleTable {
    *fake_binding().lifecycle()
}
