/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The service modules, one bus node each.
//!
//! Every service follows the same shape: `register()` adds the node,
//! resolves its devices, and installs a closure holding the service state.
//! A service whose required device is missing registers its node anyway but
//! installs no callback, leaving it permanently inert while the rest of the
//! firmware keeps running. Peer handles are resolved when the
//! `DataProcInitFinished` broadcast arrives, after the whole topology is
//! registered.

pub mod alarm;
pub mod audio;
pub mod button;
pub mod clock;
pub mod ctrl;
pub mod global;
pub mod kvdb;
pub mod power;
pub mod shell;
pub mod time_monitor;
pub mod version;
pub mod watchdog;

/// Node identifiers. Registration order is fixed by the app context.
pub mod ids {
    pub const GLOBAL: &str = "Global";
    pub const CLOCK: &str = "Clock";
    pub const TIME_MONITOR: &str = "TimeMonitor";
    pub const ALARM: &str = "Alarm";
    pub const AUDIO: &str = "Audio";
    pub const BUTTON: &str = "Button";
    pub const POWER: &str = "Power";
    pub const CTRL: &str = "Ctrl";
    pub const KVDB: &str = "Kvdb";
    pub const SHELL: &str = "Shell";
    pub const WATCHDOG: &str = "WatchDog";
    pub const VERSION: &str = "Version";
}
