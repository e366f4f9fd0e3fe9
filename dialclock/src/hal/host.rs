/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Host (development machine) implementations of the peripheral traits.
//!
//! The appliance firmware runs unchanged on a workstation: the RTC is the
//! wall clock, motors and the buzzer log their commands, the console is
//! stdin/stdout and the power switch is a shared flag the run loop watches.

use std::cell::Cell;
use std::io::BufRead;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use chrono::{Datelike, Duration, Local, Timelike};
use tracing::{debug, info, trace, warn};

use super::{
    BatteryDevice, ButtonDevice, BuzzerDevice, ClockDevice, Hal, MotorDevice, PowerDevice,
    SerialDevice, TickSource, WatchdogDevice,
};
use crate::message::ClockInfo;

/// Assembles a fully populated host [`Hal`] plus the power-off flag the run
/// loop polls.
pub fn host_hal() -> (Hal, Rc<Cell<bool>>) {
    let off_flag = Rc::new(Cell::new(false));
    let hal = Hal {
        clock: Some(Box::new(HostClock::new())),
        motor: Some(Box::new(HostMotor)),
        buzzer: Some(Box::new(HostBuzzer)),
        battery: Some(Box::new(HostBattery::new())),
        power: Some(Box::new(HostPower {
            off_flag: Rc::clone(&off_flag),
        })),
        button: Some(Box::new(HostButton)),
        serial: Some(Box::new(HostSerial::new())),
        watchdog: Some(Box::new(HostWatchdog)),
        tick: Some(host_tick()),
    };
    (hal, off_flag)
}

/// Millisecond counter based on a process-start [`Instant`]; wraps at
/// `u32::MAX` like a hardware tick register.
pub fn host_tick() -> TickSource {
    let start = Instant::now();
    Box::new(move || start.elapsed().as_millis() as u32)
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Wall clock with a calibration offset, so `clock set` works on the host
/// without touching the system time.
pub struct HostClock {
    offset: Duration,
}

impl HostClock {
    pub fn new() -> Self {
        HostClock {
            offset: Duration::zero(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        HostClock::new()
    }
}

impl ClockDevice for HostClock {
    fn now(&self) -> ClockInfo {
        let now = Local::now() + self.offset;
        ClockInfo {
            year: now.year() as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            weekday: now.weekday().num_days_from_monday() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            millisecond: (now.timestamp_subsec_millis() % 1000) as u16,
        }
    }

    fn set(&mut self, time: &ClockInfo) {
        // Only the time of day is calibrated; the date stays the host's.
        let now = Local::now();
        let target = i64::from(time.hour) * 3600
            + i64::from(time.minute) * 60
            + i64::from(time.second);
        let actual = i64::from(now.hour()) * 3600
            + i64::from(now.minute()) * 60
            + i64::from(now.second());
        self.offset = Duration::seconds(target - actual);
        info!(
            hour = time.hour,
            minute = time.minute,
            second = time.second,
            "host clock calibrated"
        );
    }
}

// ── Motor / buzzer ────────────────────────────────────────────────────────────

pub struct HostMotor;

impl MotorDevice for HostMotor {
    fn set_value(&mut self, channel: u8, value: u16) {
        debug!(channel, value, "motor value");
    }
}

pub struct HostBuzzer;

impl BuzzerDevice for HostBuzzer {
    fn tone(&mut self, frequency_hz: u16) {
        debug!(frequency_hz, "buzzer tone");
    }

    fn off(&mut self) {
        trace!("buzzer off");
    }
}

// ── Battery / power ───────────────────────────────────────────────────────────

/// Slowly discharging fake battery: full at start, roughly one percent per
/// minute of process uptime.
pub struct HostBattery {
    start: Instant,
}

impl HostBattery {
    pub fn new() -> Self {
        HostBattery {
            start: Instant::now(),
        }
    }
}

impl Default for HostBattery {
    fn default() -> Self {
        HostBattery::new()
    }
}

impl BatteryDevice for HostBattery {
    fn is_charging(&self) -> bool {
        false
    }

    fn level_percent(&self) -> u8 {
        let drained = self.start.elapsed().as_secs() / 60;
        100u8.saturating_sub(drained.min(100) as u8)
    }

    fn voltage_mv(&self) -> u16 {
        // 3.0 V empty, 4.2 V full.
        3000 + u16::from(self.level_percent()) * 12
    }
}

pub struct HostPower {
    off_flag: Rc<Cell<bool>>,
}

impl PowerDevice for HostPower {
    fn power_off(&mut self) {
        info!("power off requested, run loop will exit");
        self.off_flag.set(true);
    }

    fn reboot(&mut self) {
        warn!("reboot is a no-op on the host, powering off instead");
        self.off_flag.set(true);
    }
}

// ── Buttons ───────────────────────────────────────────────────────────────────

/// The host has no physical buttons; both report released.
pub struct HostButton;

impl ButtonDevice for HostButton {
    fn count(&self) -> u8 {
        2
    }

    fn is_pressed(&self, _id: u8) -> bool {
        false
    }
}

// ── Serial console ────────────────────────────────────────────────────────────

/// Stdin-backed console. A background thread blocks on stdin and forwards
/// complete lines over a channel the bus thread drains cooperatively.
pub struct HostSerial {
    lines: mpsc::Receiver<String>,
}

impl HostSerial {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("serial-stdin".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
            })
            .ok();
        HostSerial { lines: rx }
    }
}

impl Default for HostSerial {
    fn default() -> Self {
        HostSerial::new()
    }
}

impl SerialDevice for HostSerial {
    fn read_line(&mut self) -> Option<String> {
        self.lines.try_recv().ok()
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

// ── Watchdog ──────────────────────────────────────────────────────────────────

pub struct HostWatchdog;

impl WatchdogDevice for HostWatchdog {
    fn configure(&mut self, timeout_s: u32) {
        info!(timeout_s, "watchdog configured (host stub)");
    }

    fn feed(&mut self) {
        trace!("watchdog fed");
    }
}
