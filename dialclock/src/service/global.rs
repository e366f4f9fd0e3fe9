/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The lifecycle publisher node.
//!
//! The app context owns this node and publishes every [`GlobalInfo`]
//! broadcast through it. It installs no callback; it only originates
//! events, so fan-out naturally skips it.

use databroker::{BrokerError, DataBroker, NodeHandle};

use crate::message::{GlobalInfo, Message};
use crate::service::ids;

pub fn register(broker: &DataBroker<Message>) -> Result<NodeHandle<Message>, BrokerError> {
    broker.add(ids::GLOBAL)
}

/// Convenience for the app context's lifecycle broadcasts. A veto makes no
/// sense for lifecycle events, so the result is discarded after logging.
pub fn publish(node: &NodeHandle<Message>, info: GlobalInfo) {
    if let Err(err) = node.publish(&Message::Global(info)) {
        tracing::warn!(?info, %err, "lifecycle broadcast failed");
    }
}
