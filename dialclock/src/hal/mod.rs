/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hardware abstraction layer.
//!
//! One trait per peripheral, injected into the owning service at
//! construction. A [`Hal`] bundle carries every device as an `Option`; the
//! app context `take()`s each slot when it registers the matching service,
//! and a `None` slot leaves that service disabled without affecting the
//! rest of the firmware.

pub mod host;

#[cfg(test)]
pub mod fake;

use crate::message::ClockInfo;

/// Upper bound of the motor value range, full scale of the dial.
pub const MOTOR_VALUE_MAX: u16 = 960;

/// Number of motor channels on the appliance.
pub const MOTOR_CHANNELS: u8 = 2;

/// Real-time clock.
pub trait ClockDevice {
    fn now(&self) -> ClockInfo;
    /// Calibrates the clock to `time`. The caller validates the fields.
    fn set(&mut self, time: &ClockInfo);
}

/// Stepper driver for the dial hands.
pub trait MotorDevice {
    /// Moves `channel` to `value` (0..=[`MOTOR_VALUE_MAX`]).
    fn set_value(&mut self, channel: u8, value: u16);
}

/// Piezo buzzer; one tone at a time.
pub trait BuzzerDevice {
    fn tone(&mut self, frequency_hz: u16);
    fn off(&mut self);
}

/// Raw battery telemetry; the power service derives the published status.
pub trait BatteryDevice {
    fn is_charging(&self) -> bool;
    fn level_percent(&self) -> u8;
    fn voltage_mv(&self) -> u16;
}

/// System power control.
pub trait PowerDevice {
    fn power_off(&mut self);
    fn reboot(&mut self);
}

/// Push buttons, read as a level per id.
pub trait ButtonDevice {
    fn count(&self) -> u8;
    fn is_pressed(&self, id: u8) -> bool;
}

/// Line-oriented console transport for the shell.
pub trait SerialDevice {
    /// Next complete input line, if one is pending. Never blocks.
    fn read_line(&mut self) -> Option<String>;
    fn write_line(&mut self, line: &str);
}

/// Hardware watchdog.
pub trait WatchdogDevice {
    fn configure(&mut self, timeout_s: u32);
    fn feed(&mut self);
}

/// Monotonic millisecond counter driving the software timers.
pub type TickSource = Box<dyn FnMut() -> u32>;

/// Every peripheral the firmware may use. A missing device disables the
/// dependent service.
#[derive(Default)]
pub struct Hal {
    pub clock: Option<Box<dyn ClockDevice>>,
    pub motor: Option<Box<dyn MotorDevice>>,
    pub buzzer: Option<Box<dyn BuzzerDevice>>,
    pub battery: Option<Box<dyn BatteryDevice>>,
    pub power: Option<Box<dyn PowerDevice>>,
    pub button: Option<Box<dyn ButtonDevice>>,
    pub serial: Option<Box<dyn SerialDevice>>,
    pub watchdog: Option<Box<dyn WatchdogDevice>>,
    pub tick: Option<TickSource>,
}
