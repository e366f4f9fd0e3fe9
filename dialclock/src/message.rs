/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The shared payload type of every bus event.
//!
//! [`Message`] is a closed enum with one variant per node family. A receiver
//! first checks the variant it expects and answers
//! [`NodeError::TypeMismatch`](databroker::NodeError::TypeMismatch) for
//! anything else, so a wrong payload is rejected before its contents are
//! touched. Pull queries work in place: the caller sends the variant with a
//! default body and the receiver overwrites it.

use serde::{Deserialize, Serialize};

/// One variant per destination node family.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Global(GlobalInfo),
    Clock(ClockInfo),
    ClockCmd(ClockCommand),
    TimeMonitor(TimeMonitorInfo),
    Alarm(AlarmInfo),
    Audio(AudioInfo),
    Button(ButtonInfo),
    Power(PowerInfo),
    Kvdb(KvdbInfo),
    Ctrl(CtrlInfo),
    Version(VersionInfo),
    /// Raw text broadcast injected from the shell's `publish` command.
    Shell(ShellInfo),
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Application lifecycle broadcasts, published by the app context's own node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalInfo {
    /// Every service is registered; peers may now be resolved.
    DataProcInitFinished,
    /// The run loop is about to start.
    AppStarted,
    /// The application is tearing down; flush persistent state now.
    AppStopped,
    /// Start of one run-loop pass; cheap cooperative work goes here.
    RunLoopBegin,
    /// End of one run-loop pass, carrying the idle budget in milliseconds.
    RunLoopEnd { time_till_next: u32 },
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// A calendar timestamp snapshot, published by the clock service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockInfo {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 0 = Monday … 6 = Sunday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl ClockInfo {
    /// Field-range validation for externally supplied timestamps.
    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.weekday < 7
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
            && self.millisecond < 1000
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// Calibrate the RTC to the given timestamp.
    SetTime(ClockInfo),
}

// ── Time monitor ──────────────────────────────────────────────────────────────

/// Edge broadcasts derived from consecutive clock snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMonitorInfo {
    HourChanged(ClockInfo),
    MinuteChanged(ClockInfo),
}

// ── Alarm ─────────────────────────────────────────────────────────────────────

pub const ALARM_SLOTS: usize = 4;

/// One configured wake-up alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSlot {
    pub hour: u8,
    pub minute: u8,
    pub music: MusicId,
}

/// Snapshot of the whole alarm table, for pull queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmTable {
    pub slots: [Option<AlarmSlot>; ALARM_SLOTS],
    pub hourly_enabled: bool,
    /// Hourly chime window; `start > end` wraps around midnight.
    pub hourly_start: u8,
    pub hourly_end: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmInfo {
    /// Configure one slot.
    Set {
        slot: usize,
        hour: u8,
        minute: u8,
        music: MusicId,
    },
    Clear { slot: usize },
    /// Persist the table to the key/value store.
    Save,
    EnableHourly,
    DisableHourly,
    SetHourlyStart(u8),
    SetHourlyEnd(u8),
    /// Immediate playback of one of the built-in melodies.
    PlayMusic(MusicId),
    /// Pull query: the alarm service writes its table into this.
    Query(AlarmTable),
}

/// Built-in melody identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicId {
    HourlyChime,
    Bell,
    Morning,
    ButtonPress,
    ButtonRelease,
}

impl MusicId {
    pub fn from_index(index: u8) -> Option<MusicId> {
        match index {
            0 => Some(MusicId::HourlyChime),
            1 => Some(MusicId::Bell),
            2 => Some(MusicId::Morning),
            3 => Some(MusicId::ButtonPress),
            4 => Some(MusicId::ButtonRelease),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            MusicId::HourlyChime => 0,
            MusicId::Bell => 1,
            MusicId::Morning => 2,
            MusicId::ButtonPress => 3,
            MusicId::ButtonRelease => 4,
        }
    }
}

// ── Audio ─────────────────────────────────────────────────────────────────────

/// One buzzer step: `frequency_hz == 0` is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneStep {
    pub frequency_hz: u16,
    /// Duration in beats; one beat is `60_000 / bpm` milliseconds.
    pub beats: u8,
}

/// A playable melody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneSequence {
    pub name: &'static str,
    pub bpm: u16,
    /// A non-interruptible sequence refuses replacement and vetoes a
    /// power-down broadcast while it plays.
    pub interruptible: bool,
    pub steps: Vec<ToneStep>,
}

/// Current playback state, for pull queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackInfo {
    pub playing: bool,
    pub name: String,
    pub interruptible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioInfo {
    Play(ToneSequence),
    Stop,
    /// Pull query: the audio service writes its playback state into this.
    Playback(PlaybackInfo),
}

// ── Button ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
    LongPressed,
}

/// Published by the button service for every detected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonInfo {
    pub id: u8,
    pub event: ButtonEvent,
}

// ── Power ─────────────────────────────────────────────────────────────────────

/// Battery and power-management state, for pull queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryStatus {
    pub is_ready: bool,
    pub is_charging: bool,
    pub is_battery_low: bool,
    /// State of charge, 0–100.
    pub level_percent: u8,
    pub voltage_mv: u16,
    pub auto_shutdown_s: u32,
    pub uptime_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerInfo {
    RequestShutdown,
    RequestReboot,
    /// Hold the device awake; locks nest.
    LockWakeup,
    UnlockWakeup,
    /// Restart the auto-shutdown countdown.
    KickWakeup,
    SetAutoShutdownTime(u32),
    /// Broadcast announcing an imminent power-down. Any receiver may veto
    /// it with `Handled::Stop`.
    ShuttingDown,
    /// Pull query: the power service writes its status into this.
    Status(BatteryStatus),
}

// ── Key/value store ───────────────────────────────────────────────────────────

/// A stored value. Blob consumers validate the exact length they expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KvdbValue {
    Empty,
    Text(String),
    Blob(Vec<u8>),
}

impl Default for KvdbValue {
    fn default() -> Self {
        KvdbValue::Empty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KvdbInfo {
    /// Pull query: the store writes the value for `key` into `value`.
    Get { key: String, value: KvdbValue },
    Set { key: String, value: KvdbValue },
    Del { key: String },
    /// Log every stored key.
    List,
    /// Flush to the backing file.
    Save,
}

// ── Motor control ─────────────────────────────────────────────────────────────

/// Snapshot of the hour → motor-value map, for pull queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClockMapTable {
    pub enabled: bool,
    /// `(hour, motor value)` entries sorted by hour.
    pub entries: Vec<(u8, u16)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CtrlInfo {
    /// Drive `channel` through its full range and back, stepped by a timer.
    SweepTest { channel: u8 },
    SetMotorValue { channel: u8, value: u16 },
    /// Insert or replace one map entry.
    SetClockMap { hour: u8, value: u16 },
    EnableClockMap(bool),
    /// Pull query: the motor service writes its map into this.
    QueryClockMap(ClockMapTable),
}

// ── Version ───────────────────────────────────────────────────────────────────

/// Build identification, for pull queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub name: String,
    pub software: String,
    pub hardware: String,
    pub author: String,
    pub website: String,
}

// ── Shell ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInfo {
    pub line: String,
}
