/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Serial debug shell.
//!
//! Pending console lines are drained at every run-loop begin, parsed with
//! clap and executed as notify/pull calls against the other nodes. The
//! shell never touches service state directly; it is just another peer on
//! the bus, which keeps it honest about the public event surface.

use std::rc::{Rc, Weak};

use clap::{Parser, Subcommand};
use databroker::{
    BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle,
};
use tracing::warn;

use crate::hal::SerialDevice;
use crate::message::{
    AlarmInfo, AlarmTable, AudioInfo, BatteryStatus, ClockCommand, ClockInfo, ClockMapTable,
    CtrlInfo, GlobalInfo, KvdbInfo, KvdbValue, Message, MusicId, PlaybackInfo, PowerInfo,
    ShellInfo, VersionInfo,
};
use crate::service::ids;

// ── Command grammar ───────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "dialclock", no_binary_name = true, disable_version_flag = true)]
struct ShellCli {
    #[command(subcommand)]
    cmd: ShellCmd,
}

#[derive(Debug, Subcommand)]
enum ShellCmd {
    /// List the registered nodes and their interest masks
    Nodes,
    /// Show the current time, or calibrate it with HH:MM[:SS]
    Clock { set: Option<String> },
    /// Alarm slots and the hourly chime
    Alarm {
        #[command(subcommand)]
        cmd: AlarmCmd,
    },
    /// Battery status and power management
    Power {
        #[command(subcommand)]
        cmd: Option<PowerCmd>,
    },
    /// Motor channels and the clock map
    Ctrl {
        #[command(subcommand)]
        cmd: CtrlCmd,
    },
    /// Key/value store access
    Kvdb {
        #[command(subcommand)]
        cmd: KvdbCmd,
    },
    /// Audio playback state
    Audio,
    /// Firmware identification
    Version,
    /// Broadcast the given words to every node
    Publish { words: Vec<String> },
}

#[derive(Debug, Subcommand)]
enum AlarmCmd {
    List,
    /// Configure a slot: SLOT HH:MM [MUSIC]
    Set {
        slot: usize,
        time: String,
        #[arg(default_value_t = 2)]
        music: u8,
    },
    Clear { slot: usize },
    Save,
    Hourly {
        #[command(subcommand)]
        cmd: HourlyCmd,
    },
    /// Play a built-in melody by index
    Play { music: u8 },
}

#[derive(Debug, Subcommand)]
enum HourlyCmd {
    On,
    Off,
    Start { hour: u8 },
    End { hour: u8 },
}

#[derive(Debug, Subcommand)]
enum PowerCmd {
    Off,
    Reboot,
    Lock,
    Unlock,
    Kick,
    AutoShutdown { seconds: u32 },
}

#[derive(Debug, Subcommand)]
enum CtrlCmd {
    Sweep { channel: u8 },
    Set { channel: u8, value: u16 },
    Map {
        #[command(subcommand)]
        cmd: MapCmd,
    },
}

#[derive(Debug, Subcommand)]
enum MapCmd {
    Set { hour: u8, value: u16 },
    On,
    Off,
    List,
}

#[derive(Debug, Subcommand)]
enum KvdbCmd {
    Get { key: String },
    Set { key: String, value: String },
    Del { key: String },
    List,
    Save,
}

/// `"HH:MM"` or `"HH:MM:SS"`, range-checked.
fn parse_time(text: &str) -> Option<(u8, u8, u8)> {
    let mut parts = text.split(':');
    let hour: u8 = parts.next()?.parse().ok()?;
    let minute: u8 = parts.next()?.parse().ok()?;
    let second: u8 = match parts.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || hour >= 24 || minute >= 60 || second >= 60 {
        return None;
    }
    Some((hour, minute, second))
}

// ── Service ───────────────────────────────────────────────────────────────────

pub fn register(
    broker: &Rc<DataBroker<Message>>,
    serial: Option<Box<dyn SerialDevice>>,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::SHELL)?;

    let Some(mut serial) = serial else {
        warn!("serial device missing, shell disabled");
        return Ok(node);
    };

    let broker: Weak<DataBroker<Message>> = Rc::downgrade(broker);

    node.set_event_callback(
        move |node, param| {
            match param {
                EventParam::Publish {
                    message: Message::Global(GlobalInfo::RunLoopBegin),
                    ..
                } => {
                    while let Some(line) = serial.read_line() {
                        let words: Vec<&str> = line.split_whitespace().collect();
                        if words.is_empty() {
                            continue;
                        }
                        match ShellCli::try_parse_from(words.iter().copied()) {
                            Ok(cli) => execute(node, &broker, serial.as_mut(), cli.cmd),
                            // Parse failures and `help` both land here; the
                            // rendered message already says everything.
                            Err(err) => serial.write_line(&err.to_string()),
                        }
                    }
                }
                EventParam::Publish { .. } => {}
                _ => return Err(NodeError::Unsupported),
            }
            Ok(Handled::Ok)
        },
        Interest::PUBLISH,
    );

    Ok(node)
}

/// Resolve-or-report helper: every command needs its target node.
fn target(
    node: &NodeHandle<Message>,
    serial: &mut dyn SerialDevice,
    id: &str,
) -> Option<NodeHandle<Message>> {
    let found = node.subscribe(id);
    if found.is_none() {
        serial.write_line(&format!("error: node {id} is not available"));
    }
    found
}

fn report(serial: &mut dyn SerialDevice, result: databroker::EventResult) {
    match result {
        Ok(Handled::Ok) => serial.write_line("ok"),
        Ok(Handled::Stop) => serial.write_line("stopped"),
        Err(err) => serial.write_line(&format!("error: {err}")),
    }
}

fn execute(
    node: &NodeHandle<Message>,
    broker: &Weak<DataBroker<Message>>,
    serial: &mut dyn SerialDevice,
    cmd: ShellCmd,
) {
    match cmd {
        ShellCmd::Nodes => {
            let Some(broker) = broker.upgrade() else {
                serial.write_line("error: broker gone");
                return;
            };
            for (id, interest) in broker.node_table() {
                serial.write_line(&format!("{interest}  {id}"));
            }
        }
        ShellCmd::Clock { set } => {
            let Some(clock) = target(node, serial, ids::CLOCK) else {
                return;
            };
            let mut query = Message::Clock(ClockInfo::default());
            if let Err(err) = node.pull(&clock, &mut query) {
                serial.write_line(&format!("error: {err}"));
                return;
            }
            let Message::Clock(mut now) = query else {
                return;
            };
            match set {
                None => serial.write_line(&format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    now.year, now.month, now.day, now.hour, now.minute, now.second
                )),
                Some(text) => match parse_time(&text) {
                    Some((hour, minute, second)) => {
                        now.hour = hour;
                        now.minute = minute;
                        now.second = second;
                        report(
                            serial,
                            node.notify(&clock, &Message::ClockCmd(ClockCommand::SetTime(now))),
                        );
                    }
                    None => serial.write_line("error: expected HH:MM[:SS]"),
                },
            }
        }
        ShellCmd::Alarm { cmd } => {
            let Some(alarm) = target(node, serial, ids::ALARM) else {
                return;
            };
            match cmd {
                AlarmCmd::List => {
                    let mut query = Message::Alarm(AlarmInfo::Query(AlarmTable::default()));
                    match node.pull(&alarm, &mut query) {
                        Ok(_) => {
                            if let Message::Alarm(AlarmInfo::Query(table)) = query {
                                for (index, slot) in table.slots.iter().enumerate() {
                                    match slot {
                                        Some(slot) => serial.write_line(&format!(
                                            "{index}: {:02}:{:02} music={}",
                                            slot.hour,
                                            slot.minute,
                                            slot.music.index()
                                        )),
                                        None => serial.write_line(&format!("{index}: -")),
                                    }
                                }
                                serial.write_line(&format!(
                                    "hourly: {} {:02}:00-{:02}:00",
                                    if table.hourly_enabled { "on" } else { "off" },
                                    table.hourly_start,
                                    table.hourly_end
                                ));
                            }
                        }
                        Err(err) => serial.write_line(&format!("error: {err}")),
                    }
                }
                AlarmCmd::Set { slot, time, music } => {
                    let Some((hour, minute, _)) = parse_time(&time) else {
                        serial.write_line("error: expected HH:MM");
                        return;
                    };
                    let Some(music) = MusicId::from_index(music) else {
                        serial.write_line("error: unknown music index");
                        return;
                    };
                    report(
                        serial,
                        node.notify(
                            &alarm,
                            &Message::Alarm(AlarmInfo::Set {
                                slot,
                                hour,
                                minute,
                                music,
                            }),
                        ),
                    );
                }
                AlarmCmd::Clear { slot } => report(
                    serial,
                    node.notify(&alarm, &Message::Alarm(AlarmInfo::Clear { slot })),
                ),
                AlarmCmd::Save => report(
                    serial,
                    node.notify(&alarm, &Message::Alarm(AlarmInfo::Save)),
                ),
                AlarmCmd::Hourly { cmd } => {
                    let info = match cmd {
                        HourlyCmd::On => AlarmInfo::EnableHourly,
                        HourlyCmd::Off => AlarmInfo::DisableHourly,
                        HourlyCmd::Start { hour } => AlarmInfo::SetHourlyStart(hour),
                        HourlyCmd::End { hour } => AlarmInfo::SetHourlyEnd(hour),
                    };
                    report(serial, node.notify(&alarm, &Message::Alarm(info)));
                }
                AlarmCmd::Play { music } => match MusicId::from_index(music) {
                    Some(music) => report(
                        serial,
                        node.notify(&alarm, &Message::Alarm(AlarmInfo::PlayMusic(music))),
                    ),
                    None => serial.write_line("error: unknown music index"),
                },
            }
        }
        ShellCmd::Power { cmd } => {
            let Some(power) = target(node, serial, ids::POWER) else {
                return;
            };
            match cmd {
                None => {
                    let mut query = Message::Power(PowerInfo::Status(BatteryStatus::default()));
                    match node.pull(&power, &mut query) {
                        Ok(_) => {
                            if let Message::Power(PowerInfo::Status(status)) = query {
                                serial.write_line(&format!(
                                    "battery {}% {}mV charging={} low={} auto-shutdown={}s uptime={}ms",
                                    status.level_percent,
                                    status.voltage_mv,
                                    status.is_charging,
                                    status.is_battery_low,
                                    status.auto_shutdown_s,
                                    status.uptime_ms
                                ));
                            }
                        }
                        Err(err) => serial.write_line(&format!("error: {err}")),
                    }
                }
                Some(cmd) => {
                    let info = match cmd {
                        PowerCmd::Off => PowerInfo::RequestShutdown,
                        PowerCmd::Reboot => PowerInfo::RequestReboot,
                        PowerCmd::Lock => PowerInfo::LockWakeup,
                        PowerCmd::Unlock => PowerInfo::UnlockWakeup,
                        PowerCmd::Kick => PowerInfo::KickWakeup,
                        PowerCmd::AutoShutdown { seconds } => {
                            PowerInfo::SetAutoShutdownTime(seconds)
                        }
                    };
                    report(serial, node.notify(&power, &Message::Power(info)));
                }
            }
        }
        ShellCmd::Ctrl { cmd } => {
            let Some(ctrl) = target(node, serial, ids::CTRL) else {
                return;
            };
            match cmd {
                CtrlCmd::Sweep { channel } => report(
                    serial,
                    node.notify(&ctrl, &Message::Ctrl(CtrlInfo::SweepTest { channel })),
                ),
                CtrlCmd::Set { channel, value } => report(
                    serial,
                    node.notify(&ctrl, &Message::Ctrl(CtrlInfo::SetMotorValue { channel, value })),
                ),
                CtrlCmd::Map { cmd } => match cmd {
                    MapCmd::Set { hour, value } => report(
                        serial,
                        node.notify(&ctrl, &Message::Ctrl(CtrlInfo::SetClockMap { hour, value })),
                    ),
                    MapCmd::On => report(
                        serial,
                        node.notify(&ctrl, &Message::Ctrl(CtrlInfo::EnableClockMap(true))),
                    ),
                    MapCmd::Off => report(
                        serial,
                        node.notify(&ctrl, &Message::Ctrl(CtrlInfo::EnableClockMap(false))),
                    ),
                    MapCmd::List => {
                        let mut query =
                            Message::Ctrl(CtrlInfo::QueryClockMap(ClockMapTable::default()));
                        match node.pull(&ctrl, &mut query) {
                            Ok(_) => {
                                if let Message::Ctrl(CtrlInfo::QueryClockMap(table)) = query {
                                    serial.write_line(&format!(
                                        "clock map: {}",
                                        if table.enabled { "on" } else { "off" }
                                    ));
                                    for (hour, value) in table.entries {
                                        serial.write_line(&format!("{hour:02}h -> {value}"));
                                    }
                                }
                            }
                            Err(err) => serial.write_line(&format!("error: {err}")),
                        }
                    }
                },
            }
        }
        ShellCmd::Kvdb { cmd } => {
            let Some(kvdb) = target(node, serial, ids::KVDB) else {
                return;
            };
            match cmd {
                KvdbCmd::Get { key } => {
                    let mut query = Message::Kvdb(KvdbInfo::Get {
                        key,
                        value: KvdbValue::Empty,
                    });
                    match node.pull(&kvdb, &mut query) {
                        Ok(_) => {
                            if let Message::Kvdb(KvdbInfo::Get { value, .. }) = query {
                                match value {
                                    KvdbValue::Text(text) => serial.write_line(&text),
                                    KvdbValue::Blob(blob) => serial
                                        .write_line(&format!("blob[{}] {blob:02x?}", blob.len())),
                                    KvdbValue::Empty => serial.write_line("(empty)"),
                                }
                            }
                        }
                        Err(err) => serial.write_line(&format!("error: {err}")),
                    }
                }
                KvdbCmd::Set { key, value } => report(
                    serial,
                    node.notify(
                        &kvdb,
                        &Message::Kvdb(KvdbInfo::Set {
                            key,
                            value: KvdbValue::Text(value),
                        }),
                    ),
                ),
                KvdbCmd::Del { key } => report(
                    serial,
                    node.notify(&kvdb, &Message::Kvdb(KvdbInfo::Del { key })),
                ),
                KvdbCmd::List => report(
                    serial,
                    node.notify(&kvdb, &Message::Kvdb(KvdbInfo::List)),
                ),
                KvdbCmd::Save => report(
                    serial,
                    node.notify(&kvdb, &Message::Kvdb(KvdbInfo::Save)),
                ),
            }
        }
        ShellCmd::Audio => {
            let Some(audio) = target(node, serial, ids::AUDIO) else {
                return;
            };
            let mut query = Message::Audio(AudioInfo::Playback(PlaybackInfo::default()));
            match node.pull(&audio, &mut query) {
                Ok(_) => {
                    if let Message::Audio(AudioInfo::Playback(info)) = query {
                        if info.playing {
                            serial.write_line(&format!(
                                "playing {} (interruptible={})",
                                info.name, info.interruptible
                            ));
                        } else {
                            serial.write_line("idle");
                        }
                    }
                }
                Err(err) => serial.write_line(&format!("error: {err}")),
            }
        }
        ShellCmd::Version => {
            let Some(version) = target(node, serial, ids::VERSION) else {
                return;
            };
            let mut query = Message::Version(VersionInfo::default());
            match node.pull(&version, &mut query) {
                Ok(_) => {
                    if let Message::Version(info) = query {
                        serial.write_line(&format!("{} {}", info.name, info.software));
                        serial.write_line(&format!("hardware: {}", info.hardware));
                        serial.write_line(&format!("author:   {}", info.author));
                        serial.write_line(&format!("website:  {}", info.website));
                    }
                }
                Err(err) => serial.write_line(&format!("error: {err}")),
            }
        }
        ShellCmd::Publish { words } => {
            let line = words.join(" ");
            report(serial, node.publish(&Message::Shell(ShellInfo { line })));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::{fake_tick, FakeClock, FakeSerial, FakeSerialState};
    use crate::service::{clock, kvdb, version};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn base_time() -> ClockInfo {
        ClockInfo {
            year: 2026,
            month: 8,
            day: 23,
            weekday: 6,
            hour: 7,
            minute: 30,
            second: 0,
            millisecond: 0,
        }
    }

    struct Fixture {
        broker: Rc<DataBroker<Message>>,
        serial: FakeSerialState,
        driver: NodeHandle<Message>,
        _dir: TempDir,
    }

    fn setup() -> Fixture {
        let broker = Rc::new(DataBroker::new());
        let (_clock_ms, tick) = fake_tick();
        broker.init_timer_manager(tick);

        let dir = TempDir::new().unwrap();
        let (_time, clock_device) = FakeClock::new(base_time());
        clock::register(&broker, Some(clock_device), 2000).unwrap();
        kvdb::register(&broker, dir.path().join("store.yaml")).unwrap();
        version::register(&broker).unwrap();

        let (serial, device) = FakeSerial::new();
        register(&broker, Some(device)).unwrap();

        let driver = broker.add("Driver").unwrap();
        Fixture {
            broker,
            serial,
            driver,
            _dir: dir,
        }
    }

    fn run(fixture: &Fixture, line: &str) -> Vec<String> {
        fixture.serial.input.borrow_mut().push_back(line.to_owned());
        fixture
            .driver
            .publish(&Message::Global(GlobalInfo::RunLoopBegin))
            .unwrap();
        fixture.serial.output.borrow_mut().drain(..).collect()
    }

    #[test]
    fn parse_time_accepts_hhmm_and_hhmmss() {
        assert_eq!(parse_time("07:30"), Some((7, 30, 0)));
        assert_eq!(parse_time("23:59:59"), Some((23, 59, 59)));
        assert_eq!(parse_time("24:00"), None);
        assert_eq!(parse_time("12"), None);
        assert_eq!(parse_time("12:00:00:00"), None);
        assert_eq!(parse_time("ab:cd"), None);
    }

    #[test]
    fn nodes_lists_the_registry() {
        let fixture = setup();
        let out = run(&fixture, "nodes");
        assert!(out.iter().any(|line| line.ends_with(ids::CLOCK)));
        assert!(out.iter().any(|line| line.ends_with(ids::SHELL)));
    }

    #[test]
    fn clock_prints_and_calibrates() {
        let fixture = setup();

        let out = run(&fixture, "clock");
        assert_eq!(out, vec!["2026-08-23 07:30:00"]);

        let out = run(&fixture, "clock 09:15");
        assert_eq!(out, vec!["ok"]);
        let out = run(&fixture, "clock");
        assert_eq!(out, vec!["2026-08-23 09:15:00"]);

        let out = run(&fixture, "clock 25:00");
        assert_eq!(out, vec!["error: expected HH:MM[:SS]"]);
    }

    #[test]
    fn kvdb_commands_reach_the_store() {
        let fixture = setup();

        assert_eq!(run(&fixture, "kvdb set greeting hello"), vec!["ok"]);
        assert_eq!(run(&fixture, "kvdb get greeting"), vec!["hello"]);
        assert_eq!(
            run(&fixture, "kvdb get missing"),
            vec!["error: no data available"]
        );
        assert_eq!(run(&fixture, "kvdb del greeting"), vec!["ok"]);
    }

    #[test]
    fn version_prints_the_package_identity() {
        let fixture = setup();
        let out = run(&fixture, "version");
        assert!(out[0].contains("dialclock"));
    }

    #[test]
    fn missing_target_is_reported_not_fatal() {
        let fixture = setup();
        let out = run(&fixture, "power");
        assert_eq!(out, vec!["error: node Power is not available"]);
    }

    #[test]
    fn bad_input_prints_usage_instead_of_crashing() {
        let fixture = setup();
        let out = run(&fixture, "frobnicate");
        assert!(!out.is_empty());
    }

    #[test]
    fn publish_broadcasts_the_words() {
        let fixture = setup();

        let probe = fixture.broker.add("Probe").unwrap();
        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = Rc::clone(&seen);
        probe.set_event_callback(
            move |_node, param| match param {
                EventParam::Publish {
                    message: Message::Shell(info),
                    ..
                } => {
                    seen_cb.borrow_mut().push(info.line.clone());
                    Ok(Handled::Ok)
                }
                _ => Ok(Handled::Ok),
            },
            Interest::PUBLISH,
        );

        assert_eq!(run(&fixture, "publish hello world"), vec!["ok"]);
        assert_eq!(*seen.borrow(), vec!["hello world"]);
    }
}
