/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Button service: debounced edge detection with feedback tones.
//!
//! The buttons are only polled while something is happening: activity seen
//! at run-loop begin arms a fast poll timer, and half a second of
//! all-released silence disarms it again so an idle appliance stays idle.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{debug, warn};

use crate::hal::ButtonDevice;
use crate::message::{AudioInfo, ButtonEvent, ButtonInfo, GlobalInfo, Message, MusicId};
use crate::service::audio::music;
use crate::service::ids;

const POLL_PERIOD_MS: u32 = 20;
const IDLE_STOP_MS: u32 = 500;

pub fn register(
    broker: &DataBroker<Message>,
    device: Option<Box<dyn ButtonDevice>>,
    long_press_ms: u32,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::BUTTON)?;

    let Some(device) = device else {
        warn!("button device missing, button service disabled");
        return Ok(node);
    };

    let count = usize::from(device.count());
    let mut last = vec![false; count];
    let mut held_ms = vec![0u32; count];
    let mut long_fired = vec![false; count];
    let mut idle_ms = 0u32;
    let mut audio: Option<NodeHandle<Message>> = None;

    node.set_event_callback(
        move |node, param| match param {
            EventParam::Publish { message, .. } => {
                match message {
                    Message::Global(GlobalInfo::DataProcInitFinished) => {
                        audio = node.subscribe(ids::AUDIO);
                    }
                    Message::Global(GlobalInfo::RunLoopBegin) => {
                        let any_pressed = (0..count).any(|id| device.is_pressed(id as u8));
                        if any_pressed && !node.is_timer_running() {
                            debug!("button activity, poll timer armed");
                            idle_ms = 0;
                            node.start_timer(POLL_PERIOD_MS);
                        }
                    }
                    _ => {}
                }
                Ok(Handled::Ok)
            }
            EventParam::Timer => {
                let mut any_pressed = false;
                for id in 0..count {
                    let pressed = device.is_pressed(id as u8);
                    any_pressed |= pressed;

                    if pressed && !last[id] {
                        held_ms[id] = 0;
                        long_fired[id] = false;
                        emit(node, &audio, id as u8, ButtonEvent::Pressed);
                    } else if !pressed && last[id] {
                        emit(node, &audio, id as u8, ButtonEvent::Released);
                    } else if pressed {
                        held_ms[id] += POLL_PERIOD_MS;
                        if held_ms[id] >= long_press_ms && !long_fired[id] {
                            long_fired[id] = true;
                            emit(node, &audio, id as u8, ButtonEvent::LongPressed);
                        }
                    }
                    last[id] = pressed;
                }

                if any_pressed {
                    idle_ms = 0;
                } else {
                    idle_ms += POLL_PERIOD_MS;
                    if idle_ms >= IDLE_STOP_MS {
                        debug!("buttons idle, poll timer disarmed");
                        node.stop_timer();
                    }
                }
                Ok(Handled::Ok)
            }
            _ => Err(NodeError::Unsupported),
        },
        Interest::PUBLISH | Interest::TIMER,
    );

    Ok(node)
}

fn emit(
    node: &NodeHandle<Message>,
    audio: &Option<NodeHandle<Message>>,
    id: u8,
    event: ButtonEvent,
) {
    debug!(id, ?event, "button event");
    if let Err(err) = node.publish(&Message::Button(ButtonInfo { id, event })) {
        warn!(id, %err, "button broadcast failed");
    }
    let feedback = match event {
        ButtonEvent::Pressed => Some(MusicId::ButtonPress),
        ButtonEvent::Released => Some(MusicId::ButtonRelease),
        ButtonEvent::LongPressed => None,
    };
    if let (Some(audio), Some(tone)) = (audio, feedback) {
        // Feedback is best-effort; a busy buzzer just skips the click.
        let _ = node.notify(audio, &Message::Audio(AudioInfo::Play(music(tone))));
    }
}
