/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time monitor: derives hour/minute edges from the clock broadcasts.
//!
//! Consumers that only care about "the minute changed" (alarms, the dial)
//! subscribe to these edges instead of diffing raw snapshots themselves.
//! The first snapshot seeds the baseline without publishing an edge.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{debug, warn};

use crate::message::{ClockInfo, Message, TimeMonitorInfo};
use crate::service::ids;

pub fn register(broker: &DataBroker<Message>) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::TIME_MONITOR)?;

    if broker.search(ids::CLOCK).is_none() {
        warn!("clock node missing, time monitor disabled");
        return Ok(node);
    }

    let mut last: Option<ClockInfo> = None;
    node.set_event_callback(
        move |node, param| match param {
            EventParam::Publish {
                message: Message::Clock(info),
                ..
            } => {
                let prev = last.replace(*info);
                if let Some(prev) = prev {
                    if prev.minute != info.minute || prev.hour != info.hour {
                        debug!(hour = info.hour, minute = info.minute, "minute edge");
                        node.publish(&Message::TimeMonitor(TimeMonitorInfo::MinuteChanged(
                            *info,
                        )))?;
                    }
                    if prev.hour != info.hour {
                        debug!(hour = info.hour, "hour edge");
                        node.publish(&Message::TimeMonitor(TimeMonitorInfo::HourChanged(*info)))?;
                    }
                }
                Ok(Handled::Ok)
            }
            EventParam::Publish { .. } => Ok(Handled::Ok),
            _ => Err(NodeError::Unsupported),
        },
        Interest::PUBLISH,
    );

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

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

    fn edges_probe(
        broker: &DataBroker<Message>,
    ) -> Rc<RefCell<Vec<TimeMonitorInfo>>> {
        let probe = broker.add("Probe").unwrap();
        let seen: Rc<RefCell<Vec<TimeMonitorInfo>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = Rc::clone(&seen);
        probe.set_event_callback(
            move |_node, param| match param {
                EventParam::Publish {
                    message: Message::TimeMonitor(edge),
                    ..
                } => {
                    seen_cb.borrow_mut().push(*edge);
                    Ok(Handled::Ok)
                }
                _ => Ok(Handled::Ok),
            },
            Interest::PUBLISH,
        );
        seen
    }

    #[test]
    fn first_snapshot_seeds_without_edges() {
        let broker: DataBroker<Message> = DataBroker::new();
        let clock = broker.add(ids::CLOCK).unwrap();
        register(&broker).unwrap();
        let seen = edges_probe(&broker);

        clock.publish(&Message::Clock(at(7, 29))).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn minute_change_publishes_one_edge() {
        let broker: DataBroker<Message> = DataBroker::new();
        let clock = broker.add(ids::CLOCK).unwrap();
        register(&broker).unwrap();
        let seen = edges_probe(&broker);

        clock.publish(&Message::Clock(at(7, 29))).unwrap();
        clock.publish(&Message::Clock(at(7, 30))).unwrap();
        // Same minute again: no further edge.
        clock.publish(&Message::Clock(at(7, 30))).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![TimeMonitorInfo::MinuteChanged(at(7, 30))]
        );
    }

    #[test]
    fn hour_change_publishes_minute_and_hour_edges() {
        let broker: DataBroker<Message> = DataBroker::new();
        let clock = broker.add(ids::CLOCK).unwrap();
        register(&broker).unwrap();
        let seen = edges_probe(&broker);

        clock.publish(&Message::Clock(at(7, 59))).unwrap();
        clock.publish(&Message::Clock(at(8, 0))).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                TimeMonitorInfo::MinuteChanged(at(8, 0)),
                TimeMonitorInfo::HourChanged(at(8, 0)),
            ]
        );
    }

    #[test]
    fn without_a_clock_node_the_monitor_is_inert() {
        let broker: DataBroker<Message> = DataBroker::new();
        let monitor = register(&broker).unwrap();
        let caller = broker.add("Caller").unwrap();

        assert_eq!(
            caller.notify(&monitor, &Message::Clock(at(0, 0))),
            Err(NodeError::Unsupported)
        );
    }
}
