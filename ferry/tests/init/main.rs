/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Loading a library the way the runtime does: entry point, then each init level up and back down.
//!
//! The entry point installs the process-wide binding, which can happen once per process; hence a single test in its own binary.

#[path = "../common/mod.rs"]
mod common;

use std::ffi::CStr;

use common::Event;
use ferry::prelude::*;
use ferry::sys;

sys::method_table! {
    /// Methods the library calls once the `Servers` level is up.
    pub struct MockMethods at Servers {
        sum => c"Mock"::c"sum" @ 1002,
        count_args => c"Mock"::c"count_args" @ 1007,
    }
}

struct DemoLibrary;

#[bridge_library]
unsafe impl BridgeLibrary for DemoLibrary {
    fn min_level() -> InitLevel {
        InitLevel::Core
    }

    fn on_level_init(level: InitLevel) {
        common::mark(&format!("init {level:?}"));
    }

    fn on_level_deinit(level: InitLevel) {
        common::mark(&format!("deinit {level:?}"));
    }
}

struct Counter {
    total: i64,
}

impl ForeignClass for Counter {
    type Base = Object;
    const CLASS_NAME: &'static CStr = c"Counter";
    const INIT_LEVEL: InitLevel = InitLevel::Scene;
}

impl HostClass for Counter {
    fn init(_base: ObjectRef<'static, Object>) -> Self {
        Self { total: 0 }
    }
}

#[ferry_api]
impl Counter {
    #[func]
    fn _add(&mut self, value: i64) -> i64 {
        self.total += value;
        self.total
    }
}

fn initialize(init: &sys::Initialization, level: InitLevel) {
    let initialize = init.initialize.expect("initialize callback set");
    unsafe { initialize(init.userdata, level.to_sys()) };
}

fn deinitialize(init: &sys::Initialization, level: InitLevel) {
    let deinitialize = init.deinitialize.expect("deinitialize callback set");
    unsafe { deinitialize(init.userdata, level.to_sys()) };
}

fn add(object: sys::ObjectPtr, value: i64) -> i64 {
    let mut frame = CallFrame::new();
    frame.arg(value);
    let ret = frame.ret::<i64>();

    assert!(common::call_virtual(object, c"_add", &mut frame), "_add is overridden");
    ret.get(&frame)
}

#[test]
fn library_lifecycle() {
    common::init_tracing();
    assert_eq!(common::hash::SUM, 1002);
    assert_eq!(common::hash::COUNT_ARGS, 1007);

    let interface = common::interface();
    let mut init = sys::Initialization {
        minimum_level: 0,
        userdata: std::ptr::null_mut(),
        initialize: None,
        deinitialize: None,
    };

    // A null initialization record is rejected before the binding is installed, so a later load still succeeds.
    common::take_events();
    let loaded = unsafe { demo_library_init(&interface, std::ptr::null_mut(), std::ptr::null_mut()) };
    assert_eq!(loaded, 0);
    assert!(!sys::is_installed());
    assert!(common::take_events().iter().any(|event| matches!(event, Event::Error(_))));

    // Entry point: binding installed, callbacks handed to the runtime.
    let loaded = unsafe { demo_library_init(&interface, std::ptr::null_mut(), &mut init) };
    assert_eq!(loaded, 1);
    assert_eq!(init.minimum_level, InitLevel::Core.to_sys());
    assert!(sys::is_installed());
    assert!(!MockMethods::is_loaded());

    // Levels going up: method tables resolved, classes registered, then user code.
    common::take_events();
    for level in InitLevel::ALL {
        initialize(&init, level);
    }

    assert!(MockMethods::is_loaded());
    let events = common::take_events();
    let position = |wanted: &Event| events.iter().position(|event| event == wanted);

    let servers = position(&Event::Mark("init Servers".to_string())).expect("Servers initialized");
    let sum_resolved = position(&Event::Resolve("Mock::sum".to_string())).expect("table resolved");
    let registered = position(&Event::RegisterClass("Counter".to_string())).expect("Counter registered");
    let scene = position(&Event::Mark("init Scene".to_string())).expect("Scene initialized");
    assert!(sum_resolved < servers, "tables load before user code");
    assert!(servers < registered && registered < scene, "classes register at their own level");

    // Table handles are ready to call through.
    let binding = sys::installed().expect("binding installed");
    let sum = MockMethods::get().sum;
    let total = unsafe {
        ferry::meta::Signature::<(i64, i64), i64>::out_ptrcall(binding, sum, "Mock", "sum", std::ptr::null_mut(), (2, 3))
    };
    assert_eq!(total, 5);

    let counter = common::instantiate("Counter");
    assert_eq!(add(counter, 4), 4);
    assert_eq!(add(counter, 6), 10);
    common::destroy(counter);

    // Levels going down, in reverse: user code first, then classes unregistered.
    common::take_events();
    for level in InitLevel::ALL.into_iter().rev() {
        deinitialize(&init, level);
    }

    let events = common::take_events();
    let deinit_scene = events
        .iter()
        .position(|event| *event == Event::Mark("deinit Scene".to_string()))
        .expect("Scene deinitialized");
    let unregistered = events
        .iter()
        .position(|event| *event == Event::UnregisterClass("Counter".to_string()))
        .expect("Counter unregistered");
    assert!(deinit_scene < unregistered);
    assert!(!common::is_class_registered("Counter"));

    // A second load is refused: the binding is installed once per process.
    let mut again = init;
    let loaded = unsafe { demo_library_init(&interface, std::ptr::null_mut(), &mut again) };
    assert_eq!(loaded, 0);

    let errors: Vec<_> = common::take_events()
        .into_iter()
        .filter(|event| matches!(event, Event::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1, "{errors:?}");
}
