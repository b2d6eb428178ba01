/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Mock foreign runtime.
//!
//! Every entry of the interface table is an `extern "C" fn` backed by thread-local state. Tests run on separate threads, so each one
//! sees only its own events, strings and objects.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};

use ferry::sys::{
    self, Binding, BridgeConfig, CallErrorSys, CallFrame, ClassCreationInfo, ClassLibraryPtr, ConstTypePtr,
    ConstVariantPtr, CopyFn, ForeignInterface, InstancePtr, Int, MethodBindPtr, ObjectPtr, ReleaseFn, ResourceKind,
    StringHandle, TypePtr, UninitTypePtr, VariantFromTypeFn, VariantHandle, VariantPtr, VariantToTypeFn, WireKind,
    WireKindSys,
};

/// Everything the mock runtime observed, in order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// `get_method_bind` was asked for `Class::method`.
    Resolve(String),
    /// A method bind was called (ptrcall or varcall).
    Call(String),
    Release(ResourceKind, usize),
    Copy(ResourceKind, usize),
    Construct(String),
    RegisterClass(String),
    UnregisterClass(String),
    /// `get_virtual_call_data` was asked for `Class::method`.
    VirtualLookup(String),
    Error(String),
    Warning(String),
    /// Placed by the test itself.
    Mark(String),
}

struct MockObject {
    class: String,
    instance: InstancePtr,
    id: u64,
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
    static STRINGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static OBJECTS: RefCell<HashMap<u64, *mut MockObject>> = RefCell::new(HashMap::new());
    static NEXT_OBJECT_ID: Cell<u64> = const { Cell::new(1) };
    static CLASSES: RefCell<HashMap<String, ClassCreationInfo>> = RefCell::new(HashMap::new());
    static VIRTUAL_CACHE: RefCell<HashMap<(String, String), *mut c_void>> = RefCell::new(HashMap::new());
    static REENTRY_HOOK: RefCell<Option<Box<dyn Fn(i64) -> i64>>> = const { RefCell::new(None) };
}

fn record(event: Event) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

pub fn mark(label: &str) {
    record(Event::Mark(label.to_string()));
}

/// Drains all events recorded on this thread.
pub fn take_events() -> Vec<Event> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

/// Drains all events and keeps the handle words of releases, in order.
pub fn take_releases() -> Vec<usize> {
    take_events()
        .into_iter()
        .filter_map(|event| match event {
            Event::Release(_, word) => Some(word),
            _ => None,
        })
        .collect()
}

/// Installs the function that `Mock::reenter` forwards to.
pub fn set_reentry_hook(hook: impl Fn(i64) -> i64 + 'static) {
    REENTRY_HOOK.with(|slot| *slot.borrow_mut() = Some(Box::new(hook)));
}

pub fn clear_reentry_hook() {
    REENTRY_HOOK.with(|slot| slot.borrow_mut().take());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Lifecycle

// Variants carry their tag in the first word and an identifying payload in the second.
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
// Strings: the handle word is index + 1 into STRINGS, 0 is the empty string.

fn store_string(s: String) -> usize {
    STRINGS.with(|strings| {
        let mut strings = strings.borrow_mut();
        strings.push(s);
        strings.len()
    })
}

fn load_string(word: usize) -> String {
    match word {
        0 => String::new(),
        _ => STRINGS.with(|strings| strings.borrow()[word - 1].clone()),
    }
}

/// A string owned by the runtime, e.g. one the runtime passes as argument.
pub fn runtime_string(s: &str) -> StringHandle {
    StringHandle::from_word(store_string(s.to_string()))
}

pub fn string_contents(handle: StringHandle) -> String {
    load_string(handle.word())
}

unsafe extern "C" fn string_new(dst: UninitTypePtr, chars: *const c_char, len: Int) {
    let bytes = std::slice::from_raw_parts(chars.cast::<u8>(), len as usize);
    let word = store_string(String::from_utf8_lossy(bytes).into_owned());
    dst.cast::<usize>().write(word);
}

unsafe extern "C" fn string_to_utf8(src: ConstTypePtr, buffer: *mut c_char, capacity: Int) -> Int {
    let bytes = load_string(src.cast::<usize>().read()).into_bytes();

    let count = bytes.len().min(capacity as usize);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.cast::<u8>(), count);
    bytes.len() as Int
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Variants

/// Variant holding an `i64`. The payload doubles as the handle word reported by releases.
pub fn variant_int(value: i64) -> VariantHandle {
    let mut bytes = [0_u8; sys::VARIANT_HANDLE_SIZE];
    bytes[0..4].copy_from_slice(&WireKind::Int64.to_sys().to_ne_bytes());
    bytes[8..16].copy_from_slice(&value.to_ne_bytes());
    VariantHandle::from_opaque(sys::Opaque::from_bytes(bytes))
}

pub fn variant_payload(handle: VariantHandle) -> i64 {
    let bytes = handle.opaque().as_bytes();
    let mut payload = [0_u8; 8];
    payload.copy_from_slice(&bytes[8..16]);
    i64::from_ne_bytes(payload)
}

// Constructors copy `SIZE` payload bytes; strings go in and come out by copy.
unsafe extern "C" fn variant_from<const TAG: u32, const SIZE: usize>(dst: VariantPtr, src: ConstTypePtr) {
    let mut bytes = [0_u8; sys::VARIANT_HANDLE_SIZE];
    bytes[..4].copy_from_slice(&TAG.to_ne_bytes());
    std::ptr::copy_nonoverlapping(src.cast::<u8>(), bytes[8..].as_mut_ptr(), SIZE);

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
    Int64 => i64,
    Float64 => f64,
    Vector3 => [f32; 3],
    String => usize,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Objects and classes

unsafe extern "C" fn construct(class: *const c_char) -> ObjectPtr {
    let class = CStr::from_ptr(class).to_string_lossy().into_owned();
    record(Event::Construct(class.clone()));

    let id = NEXT_OBJECT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });

    let object = Box::into_raw(Box::new(MockObject {
        class,
        instance: std::ptr::null_mut(),
        id,
    }));

    OBJECTS.with(|objects| objects.borrow_mut().insert(id, object));
    object.cast()
}

unsafe extern "C" fn instance_id(object: ObjectPtr) -> u64 {
    (*object.cast::<MockObject>()).id
}

unsafe extern "C" fn instance_from_id(id: u64) -> ObjectPtr {
    OBJECTS.with(|objects| objects.borrow().get(&id).map_or(std::ptr::null_mut(), |obj| obj.cast()))
}

unsafe extern "C" fn set_instance(object: ObjectPtr, class: *const c_char, instance: InstancePtr) {
    let object = &mut *object.cast::<MockObject>();
    object.class = CStr::from_ptr(class).to_string_lossy().into_owned();
    object.instance = instance;
}

unsafe extern "C" fn register_class(
    _library: ClassLibraryPtr,
    class: *const c_char,
    _parent: *const c_char,
    info: *const ClassCreationInfo,
) {
    let class = CStr::from_ptr(class).to_string_lossy().into_owned();
    record(Event::RegisterClass(class.clone()));
    CLASSES.with(|classes| classes.borrow_mut().insert(class, *info));
}

unsafe extern "C" fn unregister_class(_library: ClassLibraryPtr, class: *const c_char) {
    let class = CStr::from_ptr(class).to_string_lossy().into_owned();
    record(Event::UnregisterClass(class.clone()));
    CLASSES.with(|classes| classes.borrow_mut().remove(&class));
    VIRTUAL_CACHE.with(|cache| cache.borrow_mut().retain(|(cached_class, _), _| *cached_class != class));
}

fn class_info(class: &str) -> ClassCreationInfo {
    CLASSES.with(|classes| {
        classes
            .borrow()
            .get(class)
            .copied()
            .unwrap_or_else(|| panic!("class `{class}` not registered with the mock runtime"))
    })
}

pub fn is_class_registered(class: &str) -> bool {
    CLASSES.with(|classes| classes.borrow().contains_key(class))
}

/// Creates an object of a registered host class, as the runtime does for `Class.new()`.
pub fn instantiate(class: &str) -> ObjectPtr {
    let info = class_info(class);
    let create = info.create_instance.expect("create_instance callback");

    unsafe { create(info.class_userdata) }
}

/// Calls virtual method `name` on `object`, with arguments and return slot from `frame`. Returns `false` if the class does not
/// override it.
///
/// Like the real runtime, the call data is looked up once per (class, name) and cached.
pub fn call_virtual(object: ObjectPtr, name: &CStr, frame: &mut CallFrame) -> bool {
    let (class, instance) = unsafe {
        let object = &*object.cast::<MockObject>();
        (object.class.clone(), object.instance)
    };
    let info = class_info(&class);
    let method = name.to_string_lossy().into_owned();

    let cached = VIRTUAL_CACHE.with(|cache| cache.borrow().get(&(class.clone(), method.clone())).copied());
    let call_data = match cached {
        Some(call_data) => call_data,
        None => {
            record(Event::VirtualLookup(format!("{class}::{method}")));
            let lookup = info.get_virtual_call_data.expect("get_virtual_call_data callback");
            let call_data = unsafe { lookup(info.class_userdata, name.as_ptr()) };

            VIRTUAL_CACHE.with(|cache| cache.borrow_mut().insert((class, method), call_data));
            call_data
        }
    };

    if call_data.is_null() {
        return false;
    }

    let call = info.call_virtual_with_data.expect("call_virtual_with_data callback");
    unsafe {
        call(instance, name.as_ptr(), call_data, frame.arg_ptrs(), frame.ret_ptr());
        frame.mark_returned();
    }
    true
}

/// Frees an object like the runtime does: first the attached host instance, then the object itself. Its instance ID becomes stale.
pub fn destroy(object: ObjectPtr) {
    let object = object.cast::<MockObject>();
    let (class, instance, id) = unsafe { ((*object).class.clone(), (*object).instance, (*object).id) };

    if !instance.is_null() {
        let info = class_info(&class);
        let free = info.free_instance.expect("free_instance callback");
        unsafe { free(info.class_userdata, instance) };
    }

    OBJECTS.with(|objects| objects.borrow_mut().remove(&id));
    drop(unsafe { Box::from_raw(object) });
}

/// Host instance attached to `object`, null for plain engine objects.
pub fn instance_ptr(object: ObjectPtr) -> InstancePtr {
    unsafe { (*object.cast::<MockObject>()).instance }
}

pub fn is_alive(id: u64) -> bool {
    OBJECTS.with(|objects| objects.borrow().contains_key(&id))
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Methods

type MockPtrcall = unsafe fn(receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr);

struct MockMethod {
    class: &'static str,
    name: &'static str,
    hash: i64,
    ptrcall: MockPtrcall,
}

/// Hashes of the mock API; a different hash means a different runtime version.
pub mod hash {
    pub const ECHO: i64 = 1001;
    pub const SUM: i64 = 1002;
    pub const MAKE_STRING: i64 = 1003;
    pub const STRING_LEN: i64 = 1004;
    pub const REENTER: i64 = 1005;
    pub const CHECK_PATH: i64 = 1006;
    pub const COUNT_ARGS: i64 = 1007;
}

const METHODS: &[MockMethod] = &[
    MockMethod {
        class: "Mock",
        name: "echo",
        hash: hash::ECHO,
        ptrcall: echo,
    },
    MockMethod {
        class: "Mock",
        name: "sum",
        hash: hash::SUM,
        ptrcall: sum,
    },
    MockMethod {
        class: "Mock",
        name: "make_string",
        hash: hash::MAKE_STRING,
        ptrcall: make_string,
    },
    MockMethod {
        class: "Mock",
        name: "string_len",
        hash: hash::STRING_LEN,
        ptrcall: string_len,
    },
    MockMethod {
        class: "Mock",
        name: "reenter",
        hash: hash::REENTER,
        ptrcall: reenter,
    },
    MockMethod {
        class: "Mock",
        name: "check_path",
        hash: hash::CHECK_PATH,
        ptrcall: check_path,
    },
    MockMethod {
        class: "Mock",
        name: "count_args",
        hash: hash::COUNT_ARGS,
        ptrcall: unsupported,
    },
];

unsafe fn arg<T: Copy>(args: *const ConstTypePtr, index: usize) -> T {
    (*args.add(index)).cast::<T>().read()
}

// Copies the whole slot, so any wire type comes back unchanged.
unsafe fn echo(_receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr) {
    std::ptr::copy_nonoverlapping((*args).cast::<u8>(), ret.cast::<u8>(), sys::SLOT_BYTES);
}

unsafe fn sum(_receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr) {
    let total = arg::<i64>(args, 0) + arg::<i64>(args, 1);
    ret.cast::<i64>().write(total);
}

// Returns a new string; the caller owns it.
unsafe fn make_string(_receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr) {
    let word = store_string(format!("made-{}", arg::<i64>(args, 0)));
    ret.cast::<usize>().write(word);
}

unsafe fn string_len(_receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr) {
    let len = load_string(arg::<usize>(args, 0)).len();
    ret.cast::<i64>().write(len as i64);
}

unsafe fn reenter(_receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr) {
    let input = arg::<i64>(args, 0);
    let output = REENTRY_HOOK.with(|hook| match &*hook.borrow() {
        Some(hook) => hook(input),
        None => panic!("Mock::reenter called without a reentry hook"),
    });
    ret.cast::<i64>().write(output);
}

// In-band error code: FILE_NOT_FOUND (7) for empty paths, OK otherwise.
unsafe fn check_path(_receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr) {
    let path = load_string(arg::<usize>(args, 0));
    ret.cast::<i64>().write(if path.is_empty() { 7 } else { 0 });
}

unsafe fn unsupported(_receiver: ObjectPtr, _args: *const ConstTypePtr, _ret: TypePtr) {
    panic!("method only supports variant calls");
}

fn method_at(bind: MethodBindPtr) -> &'static MockMethod {
    &METHODS[bind as usize - 1]
}

unsafe extern "C" fn get_method_bind(class: *const c_char, method: *const c_char, hash: Int) -> MethodBindPtr {
    let class = CStr::from_ptr(class).to_string_lossy();
    let method = CStr::from_ptr(method).to_string_lossy();
    record(Event::Resolve(format!("{class}::{method}")));

    METHODS
        .iter()
        .position(|m| m.class == class && m.name == method && m.hash == hash)
        .map_or(std::ptr::null(), |index| (index + 1) as MethodBindPtr)
}

unsafe extern "C" fn ptrcall(method: MethodBindPtr, receiver: ObjectPtr, args: *const ConstTypePtr, ret: TypePtr) {
    let method = method_at(method);
    record(Event::Call(format!("{}::{}", method.class, method.name)));
    (method.ptrcall)(receiver, args, ret);
}

// Only `Mock::count_args` takes variant calls: returns the number of arguments, accepts at most 2.
unsafe extern "C" fn varcall(
    method: MethodBindPtr,
    _receiver: ObjectPtr,
    _args: *const ConstVariantPtr,
    arg_count: Int,
    ret: VariantPtr,
    error: *mut CallErrorSys,
) {
    let method = method_at(method);
    record(Event::Call(format!("{}::{}", method.class, method.name)));

    if method.hash != hash::COUNT_ARGS {
        (*error).error = sys::CALL_ERROR_INVALID_METHOD;
        return;
    }

    if arg_count > 2 {
        *error = CallErrorSys {
            error: sys::CALL_ERROR_TOO_MANY_ARGUMENTS,
            argument: 0,
            expected: 2,
        };
        return;
    }

    ret.cast::<VariantHandle>().write(variant_int(arg_count));
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Output

unsafe extern "C" fn print_error(msg: *const c_char, _function: *const c_char, _file: *const c_char, _line: i32, _notify: u8) {
    record(Event::Error(CStr::from_ptr(msg).to_string_lossy().into_owned()));
}

unsafe extern "C" fn print_warning(msg: *const c_char, _function: *const c_char, _file: *const c_char, _line: i32, _notify: u8) {
    record(Event::Warning(CStr::from_ptr(msg).to_string_lossy().into_owned()));
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Binding

pub fn interface() -> ForeignInterface {
    ForeignInterface {
        version_major: 1,
        version_minor: 2,
        version_string: c"mock runtime 1.2".as_ptr(),
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
        classdb_register_class: Some(register_class),
        classdb_unregister_class: Some(unregister_class),
        print_error: Some(print_error),
        print_warning: Some(print_warning),
    }
}

pub fn binding_with(config: BridgeConfig) -> Binding {
    let interface = interface();
    unsafe { Binding::load(&interface, std::ptr::null_mut(), config) }.expect("mock interface is complete")
}

pub fn binding() -> Binding {
    binding_with(BridgeConfig::default())
}

/// Binding that lives for the rest of the process, as class registration requires.
pub fn leaked_binding() -> &'static Binding {
    Box::leak(Box::new(binding()))
}

/// Routes `tracing` output of the library into the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
