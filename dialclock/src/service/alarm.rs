/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Alarm service: wake-up alarms and the hourly chime.
//!
//! Four configurable slots fire on the minute edge from the time monitor;
//! the hourly chime fires on the hour edge when enabled and inside its
//! active window (`start > end` wraps around midnight, e.g. 22–6). The
//! table is persisted as a fixed-length blob in the key/value store and
//! reloaded when the application starts.
//!
//! Audio and persistence are best-effort: if the audio or KVDB node is
//! absent the alarm logic still runs, it just stays silent or volatile.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{debug, info, warn};

use crate::message::{
    AlarmInfo, AlarmSlot, AlarmTable, GlobalInfo, KvdbInfo, KvdbValue, Message, MusicId,
    TimeMonitorInfo, ALARM_SLOTS,
};
use crate::service::audio::music;
use crate::service::ids;

const TABLE_KEY: &str = "alarm.table";
/// Four slots of `[used, hour, minute, music]` plus the hourly settings.
const TABLE_BLOB_LEN: usize = ALARM_SLOTS * 4 + 3;

// ── Persistence blob ──────────────────────────────────────────────────────────

fn encode_table(table: &AlarmTable) -> Vec<u8> {
    let mut blob = Vec::with_capacity(TABLE_BLOB_LEN);
    for slot in &table.slots {
        match slot {
            Some(slot) => blob.extend([1, slot.hour, slot.minute, slot.music.index()]),
            None => blob.extend([0, 0, 0, 0]),
        }
    }
    blob.extend([
        u8::from(table.hourly_enabled),
        table.hourly_start,
        table.hourly_end,
    ]);
    blob
}

fn decode_table(blob: &[u8]) -> Option<AlarmTable> {
    if blob.len() != TABLE_BLOB_LEN {
        return None;
    }
    let mut table = AlarmTable::default();
    for (index, chunk) in blob[..ALARM_SLOTS * 4].chunks_exact(4).enumerate() {
        if chunk[0] != 0 {
            table.slots[index] = Some(AlarmSlot {
                hour: chunk[1],
                minute: chunk[2],
                music: MusicId::from_index(chunk[3])?,
            });
        }
    }
    table.hourly_enabled = blob[ALARM_SLOTS * 4] != 0;
    table.hourly_start = blob[ALARM_SLOTS * 4 + 1];
    table.hourly_end = blob[ALARM_SLOTS * 4 + 2];
    Some(table)
}

/// Active-window test with midnight wrap-around.
fn in_hourly_window(hour: u8, start: u8, end: u8) -> bool {
    if start <= end {
        (start..=end).contains(&hour)
    } else {
        hour >= start || hour <= end
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

pub fn register(broker: &DataBroker<Message>) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::ALARM)?;

    let mut table = AlarmTable {
        slots: [None; ALARM_SLOTS],
        hourly_enabled: false,
        hourly_start: 9,
        hourly_end: 21,
    };
    let mut audio: Option<NodeHandle<Message>> = None;
    let mut kvdb: Option<NodeHandle<Message>> = None;

    node.set_event_callback(
        move |node, param| match param {
            EventParam::Publish { message, .. } => {
                match message {
                    Message::Global(GlobalInfo::DataProcInitFinished) => {
                        audio = node.subscribe(ids::AUDIO);
                        kvdb = node.subscribe(ids::KVDB);
                    }
                    Message::Global(GlobalInfo::AppStarted) => {
                        if let Some(kvdb) = &kvdb {
                            let mut query = Message::Kvdb(KvdbInfo::Get {
                                key: TABLE_KEY.to_owned(),
                                value: KvdbValue::Empty,
                            });
                            match node.pull(kvdb, &mut query) {
                                Ok(_) => {
                                    if let Message::Kvdb(KvdbInfo::Get {
                                        value: KvdbValue::Blob(blob),
                                        ..
                                    }) = &query
                                    {
                                        match decode_table(blob) {
                                            Some(loaded) => {
                                                info!("alarm table restored");
                                                table = loaded;
                                            }
                                            None => warn!(
                                                len = blob.len(),
                                                "stored alarm table rejected"
                                            ),
                                        }
                                    }
                                }
                                Err(NodeError::NoData) => {
                                    debug!("no stored alarm table")
                                }
                                Err(err) => warn!(%err, "alarm table load failed"),
                            }
                        }
                    }
                    Message::TimeMonitor(TimeMonitorInfo::MinuteChanged(time)) => {
                        // Exactly one playback per matching minute, first
                        // matching slot wins.
                        let hit = table.slots.iter().flatten().find(|slot| {
                            slot.hour == time.hour && slot.minute == time.minute
                        });
                        if let Some(slot) = hit {
                            info!(
                                hour = time.hour,
                                minute = time.minute,
                                music = ?slot.music,
                                "alarm fired"
                            );
                            play(node, &audio, slot.music);
                        }
                    }
                    Message::TimeMonitor(TimeMonitorInfo::HourChanged(time)) => {
                        if table.hourly_enabled
                            && in_hourly_window(
                                time.hour,
                                table.hourly_start,
                                table.hourly_end,
                            )
                        {
                            debug!(hour = time.hour, "hourly chime");
                            play(node, &audio, MusicId::HourlyChime);
                        }
                    }
                    _ => {}
                }
                Ok(Handled::Ok)
            }
            EventParam::Notify { message } => match message {
                Message::Alarm(cmd) => match cmd {
                    AlarmInfo::Set {
                        slot,
                        hour,
                        minute,
                        music,
                    } => {
                        if *slot >= ALARM_SLOTS || *hour >= 24 || *minute >= 60 {
                            return Err(NodeError::InvalidParam);
                        }
                        table.slots[*slot] = Some(AlarmSlot {
                            hour: *hour,
                            minute: *minute,
                            music: *music,
                        });
                        info!(slot, hour, minute, "alarm set");
                        Ok(Handled::Ok)
                    }
                    AlarmInfo::Clear { slot } => {
                        if *slot >= ALARM_SLOTS {
                            return Err(NodeError::InvalidParam);
                        }
                        table.slots[*slot] = None;
                        info!(slot, "alarm cleared");
                        Ok(Handled::Ok)
                    }
                    AlarmInfo::Save => {
                        let Some(kvdb) = &kvdb else {
                            return Err(NodeError::Unsupported);
                        };
                        node.notify(
                            kvdb,
                            &Message::Kvdb(KvdbInfo::Set {
                                key: TABLE_KEY.to_owned(),
                                value: KvdbValue::Blob(encode_table(&table)),
                            }),
                        )?;
                        node.notify(kvdb, &Message::Kvdb(KvdbInfo::Save))
                    }
                    AlarmInfo::EnableHourly => {
                        table.hourly_enabled = true;
                        Ok(Handled::Ok)
                    }
                    AlarmInfo::DisableHourly => {
                        table.hourly_enabled = false;
                        Ok(Handled::Ok)
                    }
                    AlarmInfo::SetHourlyStart(hour) => {
                        if *hour >= 24 {
                            return Err(NodeError::InvalidParam);
                        }
                        table.hourly_start = *hour;
                        Ok(Handled::Ok)
                    }
                    AlarmInfo::SetHourlyEnd(hour) => {
                        if *hour >= 24 {
                            return Err(NodeError::InvalidParam);
                        }
                        table.hourly_end = *hour;
                        Ok(Handled::Ok)
                    }
                    AlarmInfo::PlayMusic(id) => {
                        play(node, &audio, *id);
                        Ok(Handled::Ok)
                    }
                    AlarmInfo::Query(_) => Err(NodeError::Unsupported),
                },
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Pull { message } => match message {
                Message::Alarm(AlarmInfo::Query(out)) => {
                    *out = table;
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            _ => Err(NodeError::Unsupported),
        },
        Interest::ALL,
    );

    Ok(node)
}

fn play(node: &NodeHandle<Message>, audio: &Option<NodeHandle<Message>>, id: MusicId) {
    let Some(audio) = audio else {
        warn!(music = ?id, "audio unavailable, alarm stays silent");
        return;
    };
    if let Err(err) = node.notify(audio, &Message::Audio(crate::message::AudioInfo::Play(music(id)))) {
        warn!(music = ?id, %err, "alarm playback refused");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::{fake_tick, FakeBuzzer};
    use crate::message::ClockInfo;
    use crate::service::audio;

    fn at(hour: u8, minute: u8) -> ClockInfo {
        ClockInfo {
            year: 2026,
            month: 8,
            day: 23,
            weekday: 6,
            hour,
            minute,
            second: 0,
            millisecond: 0,
        }
    }

    /// Alarm + audio topology with a scriptable buzzer; the `edge` node
    /// stands in for the time monitor.
    fn setup() -> (
        DataBroker<Message>,
        NodeHandle<Message>,
        NodeHandle<Message>,
        std::rc::Rc<std::cell::RefCell<Vec<u16>>>,
    ) {
        let broker: DataBroker<Message> = DataBroker::new();
        let (_clock_ms, tick) = fake_tick();
        broker.init_timer_manager(tick);

        let alarm = register(&broker).unwrap();
        let (tones, buzzer) = FakeBuzzer::new();
        audio::register(&broker, Some(buzzer)).unwrap();
        let edge = broker.add("Edge").unwrap();

        edge.publish(&Message::Global(GlobalInfo::DataProcInitFinished))
            .unwrap();
        (broker, alarm, edge, tones)
    }

    #[test]
    fn table_blob_round_trips() {
        let mut table = AlarmTable {
            slots: [None; ALARM_SLOTS],
            hourly_enabled: true,
            hourly_start: 22,
            hourly_end: 6,
        };
        table.slots[1] = Some(AlarmSlot {
            hour: 7,
            minute: 30,
            music: MusicId::Morning,
        });

        let blob = encode_table(&table);
        assert_eq!(blob.len(), TABLE_BLOB_LEN);
        assert_eq!(decode_table(&blob), Some(table));
    }

    #[test]
    fn wrong_length_blob_is_rejected() {
        assert_eq!(decode_table(&[0u8; TABLE_BLOB_LEN - 1]), None);
        assert_eq!(decode_table(&[0u8; TABLE_BLOB_LEN + 4]), None);
    }

    #[test]
    fn hourly_window_wraps_around_midnight() {
        assert!(in_hourly_window(9, 9, 21));
        assert!(in_hourly_window(21, 9, 21));
        assert!(!in_hourly_window(22, 9, 21));

        assert!(in_hourly_window(23, 22, 6));
        assert!(in_hourly_window(2, 22, 6));
        assert!(!in_hourly_window(12, 22, 6));
    }

    #[test]
    fn matching_minute_edge_plays_exactly_once() {
        let (_broker, alarm, edge, tones) = setup();

        edge.notify(
            &alarm,
            &Message::Alarm(AlarmInfo::Set {
                slot: 0,
                hour: 7,
                minute: 30,
                music: MusicId::Morning,
            }),
        )
        .unwrap();

        edge.publish(&Message::TimeMonitor(TimeMonitorInfo::MinuteChanged(at(
            7, 29,
        ))))
        .unwrap();
        assert!(tones.borrow().is_empty());

        edge.publish(&Message::TimeMonitor(TimeMonitorInfo::MinuteChanged(at(
            7, 30,
        ))))
        .unwrap();
        let after_match = tones.borrow().len();
        assert!(after_match > 0, "alarm must start playback");

        edge.publish(&Message::TimeMonitor(TimeMonitorInfo::MinuteChanged(at(
            7, 31,
        ))))
        .unwrap();
        assert_eq!(tones.borrow().len(), after_match, "one playback only");
    }

    #[test]
    fn set_validates_slot_and_time() {
        let (_broker, alarm, edge, _tones) = setup();

        for bad in [
            AlarmInfo::Set { slot: ALARM_SLOTS, hour: 7, minute: 0, music: MusicId::Bell },
            AlarmInfo::Set { slot: 0, hour: 24, minute: 0, music: MusicId::Bell },
            AlarmInfo::Set { slot: 0, hour: 7, minute: 60, music: MusicId::Bell },
            AlarmInfo::SetHourlyStart(24),
            AlarmInfo::SetHourlyEnd(24),
        ] {
            assert_eq!(
                edge.notify(&alarm, &Message::Alarm(bad)),
                Err(NodeError::InvalidParam)
            );
        }
    }

    #[test]
    fn hourly_chime_respects_enable_and_window() {
        let (_broker, alarm, edge, tones) = setup();

        edge.notify(&alarm, &Message::Alarm(AlarmInfo::SetHourlyStart(9)))
            .unwrap();
        edge.notify(&alarm, &Message::Alarm(AlarmInfo::SetHourlyEnd(21)))
            .unwrap();

        // Disabled: silent.
        edge.publish(&Message::TimeMonitor(TimeMonitorInfo::HourChanged(at(10, 0))))
            .unwrap();
        assert!(tones.borrow().is_empty());

        edge.notify(&alarm, &Message::Alarm(AlarmInfo::EnableHourly))
            .unwrap();
        edge.publish(&Message::TimeMonitor(TimeMonitorInfo::HourChanged(at(10, 0))))
            .unwrap();
        assert!(!tones.borrow().is_empty());

        // Outside the window: silent again.
        let count = tones.borrow().len();
        edge.publish(&Message::TimeMonitor(TimeMonitorInfo::HourChanged(at(23, 0))))
            .unwrap();
        assert_eq!(tones.borrow().len(), count);
    }

    #[test]
    fn pull_returns_the_table() {
        let (_broker, alarm, edge, _tones) = setup();

        edge.notify(
            &alarm,
            &Message::Alarm(AlarmInfo::Set {
                slot: 2,
                hour: 6,
                minute: 15,
                music: MusicId::Bell,
            }),
        )
        .unwrap();

        let mut query = Message::Alarm(AlarmInfo::Query(AlarmTable::default()));
        edge.pull(&alarm, &mut query).unwrap();
        match query {
            Message::Alarm(AlarmInfo::Query(table)) => {
                assert_eq!(
                    table.slots[2],
                    Some(AlarmSlot {
                        hour: 6,
                        minute: 15,
                        music: MusicId::Bell
                    })
                );
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn missing_audio_degrades_to_silence() {
        let broker: DataBroker<Message> = DataBroker::new();
        let (_clock_ms, tick) = fake_tick();
        broker.init_timer_manager(tick);

        let alarm = register(&broker).unwrap();
        let edge = broker.add("Edge").unwrap();
        edge.publish(&Message::Global(GlobalInfo::DataProcInitFinished))
            .unwrap();

        edge.notify(
            &alarm,
            &Message::Alarm(AlarmInfo::Set {
                slot: 0,
                hour: 7,
                minute: 30,
                music: MusicId::Morning,
            }),
        )
        .unwrap();

        // No audio node anywhere: the edge is absorbed without failure.
        assert_eq!(
            edge.publish(&Message::TimeMonitor(TimeMonitorInfo::MinuteChanged(at(
                7, 30
            )))),
            Ok(Handled::Ok)
        );

        // Playback via the audio service is refused cleanly too.
        assert_eq!(
            edge.notify(&alarm, &Message::Alarm(AlarmInfo::PlayMusic(MusicId::Bell))),
            Ok(Handled::Ok)
        );
    }

    #[test]
    fn save_and_reload_through_a_kvdb_stub() {
        let broker: DataBroker<Message> = DataBroker::new();
        let (_clock_ms, tick) = fake_tick();
        broker.init_timer_manager(tick);

        let alarm = register(&broker).unwrap();

        // Minimal in-memory store standing in for the KVDB service.
        let store: std::rc::Rc<std::cell::RefCell<Option<Vec<u8>>>> = Default::default();
        let kvdb = broker.add(ids::KVDB).unwrap();
        let store_cb = std::rc::Rc::clone(&store);
        kvdb.set_event_callback(
            move |_node, param| match param {
                EventParam::Notify {
                    message: Message::Kvdb(KvdbInfo::Set { value: KvdbValue::Blob(blob), .. }),
                } => {
                    *store_cb.borrow_mut() = Some(blob.clone());
                    Ok(Handled::Ok)
                }
                EventParam::Notify {
                    message: Message::Kvdb(KvdbInfo::Save),
                } => Ok(Handled::Ok),
                EventParam::Pull { message } => match message {
                    Message::Kvdb(KvdbInfo::Get { value, .. }) => match &*store_cb.borrow() {
                        Some(blob) => {
                            *value = KvdbValue::Blob(blob.clone());
                            Ok(Handled::Ok)
                        }
                        None => Err(NodeError::NoData),
                    },
                    _ => Err(NodeError::TypeMismatch),
                },
                _ => Err(NodeError::Unsupported),
            },
            Interest::NOTIFY | Interest::PULL,
        );

        let edge = broker.add("Edge").unwrap();
        edge.publish(&Message::Global(GlobalInfo::DataProcInitFinished))
            .unwrap();

        edge.notify(
            &alarm,
            &Message::Alarm(AlarmInfo::Set {
                slot: 3,
                hour: 5,
                minute: 45,
                music: MusicId::Bell,
            }),
        )
        .unwrap();
        edge.notify(&alarm, &Message::Alarm(AlarmInfo::Save)).unwrap();
        assert!(store.borrow().is_some());

        // Fresh alarm service restores the slot from the stored blob.
        broker.remove(ids::ALARM);
        let alarm2 = register(&broker).unwrap();
        edge.publish(&Message::Global(GlobalInfo::DataProcInitFinished))
            .unwrap();
        edge.publish(&Message::Global(GlobalInfo::AppStarted)).unwrap();

        let mut query = Message::Alarm(AlarmInfo::Query(AlarmTable::default()));
        edge.pull(&alarm2, &mut query).unwrap();
        match query {
            Message::Alarm(AlarmInfo::Query(table)) => {
                assert_eq!(
                    table.slots[3],
                    Some(AlarmSlot {
                        hour: 5,
                        minute: 45,
                        music: MusicId::Bell
                    })
                );
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
