/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Watchdog service: keeps the hardware watchdog fed.
//!
//! Feeding happens from a node timer at half the configured timeout, so a
//! wedged run loop stops feeding and the watchdog resets the appliance.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::warn;

use crate::hal::WatchdogDevice;
use crate::message::Message;
use crate::service::ids;

pub fn register(
    broker: &DataBroker<Message>,
    device: Option<Box<dyn WatchdogDevice>>,
    timeout_s: u32,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::WATCHDOG)?;

    let Some(mut device) = device else {
        warn!("watchdog device missing, watchdog service disabled");
        return Ok(node);
    };
    if timeout_s == 0 {
        warn!("watchdog timeout 0, watchdog service disabled");
        return Ok(node);
    }

    device.configure(timeout_s);
    node.set_event_callback(
        move |_node, param| match param {
            EventParam::Timer => {
                device.feed();
                Ok(Handled::Ok)
            }
            EventParam::Publish { .. } => Ok(Handled::Ok),
            _ => Err(NodeError::Unsupported),
        },
        Interest::TIMER,
    );
    node.start_timer(timeout_s * 500);
    Ok(node)
}
