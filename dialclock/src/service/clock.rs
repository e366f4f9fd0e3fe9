/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Clock service: owns the RTC and broadcasts the current time.
//!
//! A periodic node timer reads the device and publishes the snapshot for
//! everyone downstream (time monitor, motor control, displays). Pull
//! answers with a fresh reading; notify `SetTime` calibrates the device.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{info, warn};

use crate::hal::ClockDevice;
use crate::message::{ClockCommand, Message};
use crate::service::ids;

pub fn register(
    broker: &DataBroker<Message>,
    device: Option<Box<dyn ClockDevice>>,
    period_ms: u32,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::CLOCK)?;

    let Some(mut device) = device else {
        warn!("clock device missing, clock service disabled");
        return Ok(node);
    };

    node.set_event_callback(
        move |node, param| match param {
            EventParam::Timer => node.publish(&Message::Clock(device.now())),
            EventParam::Pull { message } => match message {
                Message::Clock(info) => {
                    *info = device.now();
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Notify { message } => match message {
                Message::ClockCmd(ClockCommand::SetTime(time)) => {
                    if !time.is_valid() {
                        return Err(NodeError::InvalidParam);
                    }
                    device.set(time);
                    info!(
                        hour = time.hour,
                        minute = time.minute,
                        second = time.second,
                        "clock calibrated"
                    );
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            _ => Err(NodeError::Unsupported),
        },
        Interest::NOTIFY | Interest::PULL | Interest::TIMER,
    );

    node.start_timer(period_ms);
    Ok(node)
}
