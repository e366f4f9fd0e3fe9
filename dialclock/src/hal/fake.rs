/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scriptable fake peripherals for service tests. Every fake exposes a
//! shared handle so the test can steer inputs and observe outputs while the
//! device itself is owned by the service under test.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use super::{
    BatteryDevice, ButtonDevice, BuzzerDevice, ClockDevice, MotorDevice, PowerDevice,
    SerialDevice, TickSource, WatchdogDevice,
};
use crate::message::ClockInfo;

/// Manually advanced millisecond counter.
pub fn fake_tick() -> (Rc<Cell<u32>>, TickSource) {
    let now = Rc::new(Cell::new(0u32));
    let src = Rc::clone(&now);
    (now, Box::new(move || src.get()))
}

pub struct FakeClock {
    pub time: Rc<RefCell<ClockInfo>>,
}

impl FakeClock {
    pub fn new(start: ClockInfo) -> (Rc<RefCell<ClockInfo>>, Box<dyn ClockDevice>) {
        let time = Rc::new(RefCell::new(start));
        let device = FakeClock {
            time: Rc::clone(&time),
        };
        (time, Box::new(device))
    }
}

impl ClockDevice for FakeClock {
    fn now(&self) -> ClockInfo {
        *self.time.borrow()
    }

    fn set(&mut self, time: &ClockInfo) {
        *self.time.borrow_mut() = *time;
    }
}

pub struct FakeMotor {
    pub moves: Rc<RefCell<Vec<(u8, u16)>>>,
}

impl FakeMotor {
    pub fn new() -> (Rc<RefCell<Vec<(u8, u16)>>>, Box<dyn MotorDevice>) {
        let moves = Rc::new(RefCell::new(Vec::new()));
        let device = FakeMotor {
            moves: Rc::clone(&moves),
        };
        (moves, Box::new(device))
    }
}

impl MotorDevice for FakeMotor {
    fn set_value(&mut self, channel: u8, value: u16) {
        self.moves.borrow_mut().push((channel, value));
    }
}

/// Records every tone; `0` marks an explicit off.
pub struct FakeBuzzer {
    pub tones: Rc<RefCell<Vec<u16>>>,
}

impl FakeBuzzer {
    pub fn new() -> (Rc<RefCell<Vec<u16>>>, Box<dyn BuzzerDevice>) {
        let tones = Rc::new(RefCell::new(Vec::new()));
        let device = FakeBuzzer {
            tones: Rc::clone(&tones),
        };
        (tones, Box::new(device))
    }
}

impl BuzzerDevice for FakeBuzzer {
    fn tone(&mut self, frequency_hz: u16) {
        self.tones.borrow_mut().push(frequency_hz);
    }

    fn off(&mut self) {
        self.tones.borrow_mut().push(0);
    }
}

#[derive(Clone)]
pub struct FakeBatteryState {
    pub charging: Rc<Cell<bool>>,
    pub level: Rc<Cell<u8>>,
}

pub struct FakeBattery {
    state: FakeBatteryState,
}

impl FakeBattery {
    pub fn new(level: u8) -> (FakeBatteryState, Box<dyn BatteryDevice>) {
        let state = FakeBatteryState {
            charging: Rc::new(Cell::new(false)),
            level: Rc::new(Cell::new(level)),
        };
        let device = FakeBattery {
            state: state.clone(),
        };
        (state, Box::new(device))
    }
}

impl BatteryDevice for FakeBattery {
    fn is_charging(&self) -> bool {
        self.state.charging.get()
    }

    fn level_percent(&self) -> u8 {
        self.state.level.get()
    }

    fn voltage_mv(&self) -> u16 {
        3000 + u16::from(self.state.level.get()) * 12
    }
}

pub struct FakePower {
    pub off: Rc<Cell<bool>>,
}

impl FakePower {
    pub fn new() -> (Rc<Cell<bool>>, Box<dyn PowerDevice>) {
        let off = Rc::new(Cell::new(false));
        let device = FakePower {
            off: Rc::clone(&off),
        };
        (off, Box::new(device))
    }
}

impl PowerDevice for FakePower {
    fn power_off(&mut self) {
        self.off.set(true);
    }

    fn reboot(&mut self) {
        self.off.set(true);
    }
}

/// Two buttons whose levels the test sets as a bitmask.
pub struct FakeButton {
    pub pressed: Rc<Cell<u8>>,
}

impl FakeButton {
    pub fn new() -> (Rc<Cell<u8>>, Box<dyn ButtonDevice>) {
        let pressed = Rc::new(Cell::new(0u8));
        let device = FakeButton {
            pressed: Rc::clone(&pressed),
        };
        (pressed, Box::new(device))
    }
}

impl ButtonDevice for FakeButton {
    fn count(&self) -> u8 {
        2
    }

    fn is_pressed(&self, id: u8) -> bool {
        self.pressed.get() & (1 << id) != 0
    }
}

#[derive(Clone, Default)]
pub struct FakeSerialState {
    pub input: Rc<RefCell<VecDeque<String>>>,
    pub output: Rc<RefCell<Vec<String>>>,
}

pub struct FakeSerial {
    state: FakeSerialState,
}

impl FakeSerial {
    pub fn new() -> (FakeSerialState, Box<dyn SerialDevice>) {
        let state = FakeSerialState::default();
        let device = FakeSerial {
            state: state.clone(),
        };
        (state, Box::new(device))
    }
}

impl SerialDevice for FakeSerial {
    fn read_line(&mut self) -> Option<String> {
        self.state.input.borrow_mut().pop_front()
    }

    fn write_line(&mut self, line: &str) {
        self.state.output.borrow_mut().push(line.to_owned());
    }
}

#[derive(Clone, Default)]
pub struct FakeWatchdogState {
    pub timeout_s: Rc<Cell<u32>>,
    pub feeds: Rc<Cell<u32>>,
}

pub struct FakeWatchdog {
    state: FakeWatchdogState,
}

impl FakeWatchdog {
    pub fn new() -> (FakeWatchdogState, Box<dyn WatchdogDevice>) {
        let state = FakeWatchdogState::default();
        let device = FakeWatchdog {
            state: state.clone(),
        };
        (state, Box::new(device))
    }
}

impl WatchdogDevice for FakeWatchdog {
    fn configure(&mut self, timeout_s: u32) {
        self.state.timeout_s.set(timeout_s);
    }

    fn feed(&mut self) {
        self.state.feeds.set(self.state.feeds.get() + 1);
    }
}
