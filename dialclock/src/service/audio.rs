/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Audio service: owns the buzzer and steps through tone sequences.
//!
//! Playback is driven by the service's own node timer, re-perioded for
//! every step so arbitrary rhythms work without a dedicated thread. A
//! non-interruptible sequence refuses replacement and vetoes a power-down
//! broadcast until it finishes.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{debug, warn};

use crate::hal::BuzzerDevice;
use crate::message::{
    AudioInfo, Message, MusicId, PlaybackInfo, PowerInfo, ToneSequence, ToneStep,
};
use crate::service::ids;

/// Built-in melody library.
pub fn music(id: MusicId) -> ToneSequence {
    match id {
        MusicId::HourlyChime => ToneSequence {
            name: "hourly-chime",
            bpm: 240,
            interruptible: true,
            steps: vec![
                ToneStep { frequency_hz: 1319, beats: 1 },
                ToneStep { frequency_hz: 0, beats: 1 },
                ToneStep { frequency_hz: 1047, beats: 2 },
            ],
        },
        MusicId::Bell => ToneSequence {
            name: "bell",
            bpm: 180,
            interruptible: false,
            steps: vec![
                ToneStep { frequency_hz: 1760, beats: 1 },
                ToneStep { frequency_hz: 0, beats: 1 },
                ToneStep { frequency_hz: 1760, beats: 1 },
                ToneStep { frequency_hz: 0, beats: 1 },
                ToneStep { frequency_hz: 1760, beats: 1 },
                ToneStep { frequency_hz: 0, beats: 3 },
                ToneStep { frequency_hz: 1760, beats: 1 },
                ToneStep { frequency_hz: 0, beats: 1 },
                ToneStep { frequency_hz: 1760, beats: 1 },
            ],
        },
        MusicId::Morning => ToneSequence {
            name: "morning",
            bpm: 120,
            interruptible: false,
            steps: vec![
                ToneStep { frequency_hz: 784, beats: 1 },
                ToneStep { frequency_hz: 659, beats: 1 },
                ToneStep { frequency_hz: 523, beats: 1 },
                ToneStep { frequency_hz: 659, beats: 1 },
                ToneStep { frequency_hz: 784, beats: 2 },
                ToneStep { frequency_hz: 1047, beats: 2 },
            ],
        },
        MusicId::ButtonPress => ToneSequence {
            name: "button-press",
            bpm: 600,
            interruptible: true,
            steps: vec![ToneStep { frequency_hz: 2000, beats: 1 }],
        },
        MusicId::ButtonRelease => ToneSequence {
            name: "button-release",
            bpm: 600,
            interruptible: true,
            steps: vec![ToneStep { frequency_hz: 1500, beats: 1 }],
        },
    }
}

fn step_ms(seq: &ToneSequence, step: usize) -> u32 {
    u32::from(seq.steps[step].beats) * 60_000 / u32::from(seq.bpm)
}

pub fn register(
    broker: &DataBroker<Message>,
    buzzer: Option<Box<dyn BuzzerDevice>>,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::AUDIO)?;

    let Some(mut buzzer) = buzzer else {
        warn!("buzzer device missing, audio service disabled");
        return Ok(node);
    };

    let mut current: Option<(ToneSequence, usize)> = None;

    node.set_event_callback(
        move |node, param| match param {
            EventParam::Notify { message } => match message {
                Message::Audio(AudioInfo::Play(seq)) => {
                    if seq.bpm == 0 || seq.steps.is_empty() {
                        return Err(NodeError::InvalidParam);
                    }
                    if let Some((playing, _)) = &current {
                        if !playing.interruptible {
                            debug!(
                                refused = seq.name,
                                playing = playing.name,
                                "non-interruptible playback in progress"
                            );
                            return Err(NodeError::Unsupported);
                        }
                    }
                    debug!(name = seq.name, bpm = seq.bpm, "playback started");
                    buzzer.tone(seq.steps[0].frequency_hz);
                    node.start_timer(step_ms(seq, 0));
                    current = Some((seq.clone(), 0));
                    Ok(Handled::Ok)
                }
                Message::Audio(AudioInfo::Stop) => {
                    if current.take().is_some() {
                        buzzer.off();
                        node.stop_timer();
                    }
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Timer => {
                let finished = match current.as_mut() {
                    Some((seq, step)) => {
                        *step += 1;
                        if *step >= seq.steps.len() {
                            debug!(name = seq.name, "playback finished");
                            true
                        } else {
                            buzzer.tone(seq.steps[*step].frequency_hz);
                            node.set_timer_period(step_ms(seq, *step));
                            false
                        }
                    }
                    // Stray expiry after a stop; just silence the timer.
                    None => {
                        node.stop_timer();
                        false
                    }
                };
                if finished {
                    buzzer.off();
                    node.stop_timer();
                    current = None;
                }
                Ok(Handled::Ok)
            }
            EventParam::Pull { message } => match message {
                Message::Audio(AudioInfo::Playback(info)) => {
                    *info = match &current {
                        Some((seq, _)) => PlaybackInfo {
                            playing: true,
                            name: seq.name.to_owned(),
                            interruptible: seq.interruptible,
                        },
                        None => PlaybackInfo::default(),
                    };
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Publish { message, .. } => {
                if let Message::Power(PowerInfo::ShuttingDown) = message {
                    if let Some((seq, _)) = &current {
                        if !seq.interruptible {
                            warn!(name = seq.name, "vetoing power-down during playback");
                            return Ok(Handled::Stop);
                        }
                    }
                }
                Ok(Handled::Ok)
            }
        },
        Interest::ALL,
    );

    Ok(node)
}
