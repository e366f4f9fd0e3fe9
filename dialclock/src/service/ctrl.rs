/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Motor control service: drives the dial hands.
//!
//! Channel 0 follows the hour→motor-value clock map, linearly interpolated
//! over the time of day; channel 1 sweeps once per hour as the minute hand.
//! The map is editable at runtime, persisted in the key/value store, and a
//! timer-stepped sweep test exercises a channel across its whole range.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{debug, info, warn};

use crate::hal::{MotorDevice, MOTOR_CHANNELS, MOTOR_VALUE_MAX};
use crate::message::{ClockMapTable, CtrlInfo, GlobalInfo, KvdbInfo, KvdbValue, Message};
use crate::service::ids;

const MAP_KEY: &str = "ctrl.map";
const SWEEP_PERIOD_MS: u32 = 50;
const SWEEP_STEP: u16 = 32;

const HOUR_HAND: u8 = 0;
const MINUTE_HAND: u8 = 1;

/// Factory calibration of the hour dial.
fn default_map() -> Vec<(u8, u16)> {
    vec![(0, 0), (6, 240), (12, 480), (18, 720), (24, MOTOR_VALUE_MAX)]
}

/// Piecewise-linear lookup of `second_of_day` in the hour-keyed map.
/// Entries must be sorted by hour; times outside the map clamp to its ends.
fn interpolate(entries: &[(u8, u16)], second_of_day: u32) -> u16 {
    let Some(first) = entries.first() else {
        return 0;
    };
    if second_of_day <= u32::from(first.0) * 3600 {
        return first.1;
    }
    for pair in entries.windows(2) {
        let (h0, v0) = pair[0];
        let (h1, v1) = pair[1];
        let t0 = u32::from(h0) * 3600;
        let t1 = u32::from(h1) * 3600;
        if second_of_day <= t1 {
            let span = (t1 - t0) as i64;
            if span == 0 {
                return v1;
            }
            let offset = (second_of_day - t0) as i64;
            let value = i64::from(v0) + (i64::from(v1) - i64::from(v0)) * offset / span;
            return value as u16;
        }
    }
    entries[entries.len() - 1].1
}

// ── Map persistence blob: 3 bytes per entry (hour, value LE) ──────────────────

fn encode_map(entries: &[(u8, u16)]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(entries.len() * 3);
    for (hour, value) in entries {
        blob.push(*hour);
        blob.extend(value.to_le_bytes());
    }
    blob
}

fn decode_map(blob: &[u8]) -> Option<Vec<(u8, u16)>> {
    if blob.is_empty() || blob.len() % 3 != 0 {
        return None;
    }
    let mut entries = Vec::with_capacity(blob.len() / 3);
    for chunk in blob.chunks_exact(3) {
        let hour = chunk[0];
        let value = u16::from_le_bytes([chunk[1], chunk[2]]);
        if hour > 24 || value > MOTOR_VALUE_MAX {
            return None;
        }
        entries.push((hour, value));
    }
    entries.sort_by_key(|(hour, _)| *hour);
    Some(entries)
}

struct Sweep {
    channel: u8,
    value: u16,
    rising: bool,
}

pub fn register(
    broker: &DataBroker<Message>,
    motor: Option<Box<dyn MotorDevice>>,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::CTRL)?;

    let Some(mut motor) = motor else {
        warn!("motor device missing, motor control disabled");
        return Ok(node);
    };

    let mut entries = default_map();
    let mut enabled = true;
    let mut sweep: Option<Sweep> = None;
    let mut kvdb: Option<NodeHandle<Message>> = None;

    node.set_event_callback(
        move |node, param| match param {
            EventParam::Publish { message, .. } => {
                match message {
                    Message::Global(GlobalInfo::DataProcInitFinished) => {
                        kvdb = node.subscribe(ids::KVDB);
                        if let Some(kvdb) = &kvdb {
                            let mut query = Message::Kvdb(KvdbInfo::Get {
                                key: MAP_KEY.to_owned(),
                                value: KvdbValue::Empty,
                            });
                            if node.pull(kvdb, &mut query).is_ok() {
                                if let Message::Kvdb(KvdbInfo::Get {
                                    value: KvdbValue::Blob(blob),
                                    ..
                                }) = &query
                                {
                                    match decode_map(blob) {
                                        Some(loaded) => {
                                            info!(entries = loaded.len(), "clock map restored");
                                            entries = loaded;
                                        }
                                        None => {
                                            warn!(len = blob.len(), "stored clock map rejected")
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Message::Clock(time) => {
                        // The sweep test owns the motors while it runs.
                        if enabled && sweep.is_none() {
                            let second_of_day = u32::from(time.hour) * 3600
                                + u32::from(time.minute) * 60
                                + u32::from(time.second);
                            motor.set_value(HOUR_HAND, interpolate(&entries, second_of_day));

                            let second_of_hour =
                                u32::from(time.minute) * 60 + u32::from(time.second);
                            let minute_value =
                                (second_of_hour * u32::from(MOTOR_VALUE_MAX) / 3600) as u16;
                            motor.set_value(MINUTE_HAND, minute_value);
                        }
                    }
                    _ => {}
                }
                Ok(Handled::Ok)
            }
            EventParam::Notify { message } => match message {
                Message::Ctrl(cmd) => match cmd {
                    CtrlInfo::SweepTest { channel } => {
                        if *channel >= MOTOR_CHANNELS {
                            return Err(NodeError::InvalidParam);
                        }
                        info!(channel, "sweep test started");
                        motor.set_value(*channel, 0);
                        sweep = Some(Sweep {
                            channel: *channel,
                            value: 0,
                            rising: true,
                        });
                        node.start_timer(SWEEP_PERIOD_MS);
                        Ok(Handled::Ok)
                    }
                    CtrlInfo::SetMotorValue { channel, value } => {
                        if *channel >= MOTOR_CHANNELS || *value > MOTOR_VALUE_MAX {
                            return Err(NodeError::InvalidParam);
                        }
                        motor.set_value(*channel, *value);
                        Ok(Handled::Ok)
                    }
                    CtrlInfo::SetClockMap { hour, value } => {
                        if *hour > 24 || *value > MOTOR_VALUE_MAX {
                            return Err(NodeError::InvalidParam);
                        }
                        match entries.iter_mut().find(|(h, _)| *h == *hour) {
                            Some(entry) => entry.1 = *value,
                            None => {
                                entries.push((*hour, *value));
                                entries.sort_by_key(|(h, _)| *h);
                            }
                        }
                        if let Some(kvdb) = &kvdb {
                            node.notify(
                                kvdb,
                                &Message::Kvdb(KvdbInfo::Set {
                                    key: MAP_KEY.to_owned(),
                                    value: KvdbValue::Blob(encode_map(&entries)),
                                }),
                            )?;
                        }
                        Ok(Handled::Ok)
                    }
                    CtrlInfo::EnableClockMap(on) => {
                        enabled = *on;
                        debug!(enabled, "clock map tracking");
                        Ok(Handled::Ok)
                    }
                    CtrlInfo::QueryClockMap(_) => Err(NodeError::Unsupported),
                },
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Pull { message } => match message {
                Message::Ctrl(CtrlInfo::QueryClockMap(out)) => {
                    *out = ClockMapTable {
                        enabled,
                        entries: entries.clone(),
                    };
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Timer => {
                let done = match sweep.as_mut() {
                    Some(state) => {
                        if state.rising {
                            state.value = state.value.saturating_add(SWEEP_STEP);
                            if state.value >= MOTOR_VALUE_MAX {
                                state.value = MOTOR_VALUE_MAX;
                                state.rising = false;
                            }
                        } else {
                            state.value = state.value.saturating_sub(SWEEP_STEP);
                        }
                        motor.set_value(state.channel, state.value);
                        !state.rising && state.value == 0
                    }
                    None => true,
                };
                if done {
                    node.stop_timer();
                    if sweep.take().is_some() {
                        info!("sweep test finished");
                    }
                }
                Ok(Handled::Ok)
            }
        },
        Interest::ALL,
    );

    Ok(node)
}
