/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Version service: answers pull queries with the build identification.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::info;

use crate::message::{Message, VersionInfo};
use crate::service::ids;

const HARDWARE: &str = "dial-clock rev B";

fn current() -> VersionInfo {
    VersionInfo {
        name: env!("CARGO_PKG_NAME").to_owned(),
        software: env!("CARGO_PKG_VERSION").to_owned(),
        hardware: HARDWARE.to_owned(),
        author: env!("CARGO_PKG_AUTHORS").to_owned(),
        website: env!("CARGO_PKG_HOMEPAGE").to_owned(),
    }
}

pub fn register(broker: &DataBroker<Message>) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::VERSION)?;

    let version = current();
    info!(
        name = version.name.as_str(),
        software = version.software.as_str(),
        hardware = version.hardware.as_str(),
        "firmware version"
    );

    node.set_event_callback(
        move |_node, param| match param {
            EventParam::Pull { message } => match message {
                Message::Version(out) => {
                    *out = version.clone();
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Publish { .. } => Ok(Handled::Ok),
            _ => Err(NodeError::Unsupported),
        },
        Interest::PULL,
    );

    Ok(node)
}
