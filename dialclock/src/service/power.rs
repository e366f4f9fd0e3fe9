/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Power service: battery telemetry, wakeup locks and auto-shutdown.
//!
//! A one-second timer refreshes the battery status and counts the idle
//! auto-shutdown budget down while no wakeup lock is held. Any shutdown,
//! requested or automatic, is announced with a `ShuttingDown` broadcast
//! first; a single veto from any receiver aborts it and restarts the
//! countdown.

use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{info, warn};

use crate::hal::{BatteryDevice, PowerDevice};
use crate::message::{BatteryStatus, Message, PowerInfo};
use crate::service::ids;

const TICK_MS: u32 = 1000;
/// Charge percentage below which the appliance saves itself by shutting
/// down.
const LOW_BATTERY_PERCENT: u8 = 5;

/// Announce, then cut power unless somebody vetoes. Returns `true` when the
/// device was actually powered off.
fn try_power_down(node: &NodeHandle<Message>, device: &mut dyn PowerDevice) -> bool {
    match node.publish(&Message::Power(PowerInfo::ShuttingDown)) {
        Ok(Handled::Stop) => {
            warn!("shutdown vetoed");
            false
        }
        Ok(Handled::Ok) => {
            info!("powering down");
            device.power_off();
            true
        }
        Err(err) => {
            warn!(%err, "shutdown broadcast failed");
            false
        }
    }
}

pub fn register(
    broker: &DataBroker<Message>,
    battery: Option<Box<dyn BatteryDevice>>,
    power: Option<Box<dyn PowerDevice>>,
    auto_shutdown_s: u32,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::POWER)?;

    let Some(mut power) = power else {
        warn!("power device missing, power service disabled");
        return Ok(node);
    };

    let auto_shutdown_ms = auto_shutdown_s.saturating_mul(1000);
    let mut countdown_ms = auto_shutdown_ms;
    let mut auto_budget_ms = auto_shutdown_ms;
    let mut locks = 0u32;
    let mut uptime_ms = 0u32;
    let mut status = BatteryStatus::default();

    node.set_event_callback(
        move |node, param| match param {
            EventParam::Timer => {
                uptime_ms = uptime_ms.wrapping_add(TICK_MS);

                if let Some(battery) = &battery {
                    status = BatteryStatus {
                        is_ready: true,
                        is_charging: battery.is_charging(),
                        is_battery_low: battery.level_percent() <= LOW_BATTERY_PERCENT,
                        level_percent: battery.level_percent(),
                        voltage_mv: battery.voltage_mv(),
                        auto_shutdown_s: auto_budget_ms / 1000,
                        uptime_ms,
                    };
                    if status.is_battery_low && !status.is_charging {
                        warn!(level = status.level_percent, "battery critically low");
                        if try_power_down(node, power.as_mut()) {
                            node.stop_timer();
                            return Ok(Handled::Ok);
                        }
                    }
                }

                if auto_budget_ms > 0 && locks == 0 {
                    countdown_ms = countdown_ms.saturating_sub(TICK_MS);
                    if countdown_ms == 0 {
                        info!("auto-shutdown budget exhausted");
                        if try_power_down(node, power.as_mut()) {
                            node.stop_timer();
                        } else {
                            countdown_ms = auto_budget_ms;
                        }
                    }
                }
                Ok(Handled::Ok)
            }
            EventParam::Notify { message } => match message {
                Message::Power(cmd) => match cmd {
                    PowerInfo::RequestShutdown => {
                        if try_power_down(node, power.as_mut()) {
                            node.stop_timer();
                        }
                        Ok(Handled::Ok)
                    }
                    PowerInfo::RequestReboot => {
                        if node.publish(&Message::Power(PowerInfo::ShuttingDown))
                            == Ok(Handled::Stop)
                        {
                            warn!("reboot vetoed");
                        } else {
                            info!("rebooting");
                            power.reboot();
                            node.stop_timer();
                        }
                        Ok(Handled::Ok)
                    }
                    PowerInfo::LockWakeup => {
                        locks += 1;
                        Ok(Handled::Ok)
                    }
                    PowerInfo::UnlockWakeup => {
                        if locks == 0 {
                            warn!("wakeup unlock without a matching lock");
                            return Err(NodeError::InvalidParam);
                        }
                        locks -= 1;
                        if locks == 0 {
                            countdown_ms = auto_budget_ms;
                        }
                        Ok(Handled::Ok)
                    }
                    PowerInfo::KickWakeup => {
                        countdown_ms = auto_budget_ms;
                        Ok(Handled::Ok)
                    }
                    PowerInfo::SetAutoShutdownTime(seconds) => {
                        auto_budget_ms = seconds.saturating_mul(1000);
                        countdown_ms = auto_budget_ms;
                        info!(seconds, "auto-shutdown time set");
                        Ok(Handled::Ok)
                    }
                    _ => Err(NodeError::InvalidParam),
                },
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Pull { message } => match message {
                Message::Power(PowerInfo::Status(out)) => {
                    let mut current = status;
                    current.auto_shutdown_s = auto_budget_ms / 1000;
                    current.uptime_ms = uptime_ms;
                    *out = current;
                    Ok(Handled::Ok)
                }
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Publish { .. } => Ok(Handled::Ok),
        },
        Interest::ALL,
    );

    node.start_timer(TICK_MS);
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::{fake_tick, FakeBattery, FakePower};
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup(
        auto_shutdown_s: u32,
        battery_level: u8,
    ) -> (
        DataBroker<Message>,
        Rc<Cell<u32>>,
        Rc<Cell<bool>>,
        NodeHandle<Message>,
        NodeHandle<Message>,
        crate::hal::fake::FakeBatteryState,
    ) {
        let broker: DataBroker<Message> = DataBroker::new();
        let (clock_ms, tick) = fake_tick();
        broker.init_timer_manager(tick);

        let (battery_state, battery) = FakeBattery::new(battery_level);
        let (off, power) = FakePower::new();
        let node = register(&broker, Some(battery), Some(power), auto_shutdown_s).unwrap();
        let caller = broker.add("Caller").unwrap();
        (broker, clock_ms, off, node, caller, battery_state)
    }

    fn run_seconds(broker: &DataBroker<Message>, clock_ms: &Rc<Cell<u32>>, seconds: u32) {
        let base = clock_ms.get();
        for s in 1..=seconds {
            clock_ms.set(base + s * 1000);
            broker.handle_timer();
        }
    }

    #[test]
    fn auto_shutdown_fires_after_the_budget() {
        let (broker, clock_ms, off, _node, _caller, _battery) = setup(3, 80);

        run_seconds(&broker, &clock_ms, 2);
        assert!(!off.get());
        run_seconds(&broker, &clock_ms, 1);
        assert!(off.get());
    }

    #[test]
    fn wakeup_lock_pauses_the_countdown() {
        let (broker, clock_ms, off, node, caller, _battery) = setup(3, 80);

        caller
            .notify(&node, &Message::Power(PowerInfo::LockWakeup))
            .unwrap();
        run_seconds(&broker, &clock_ms, 10);
        assert!(!off.get(), "locked: no auto-shutdown");

        // Unlock restarts a full budget.
        caller
            .notify(&node, &Message::Power(PowerInfo::UnlockWakeup))
            .unwrap();
        run_seconds(&broker, &clock_ms, 2);
        assert!(!off.get());
        run_seconds(&broker, &clock_ms, 1);
        assert!(off.get());
    }

    #[test]
    fn unlock_without_lock_is_invalid() {
        let (_broker, _clock_ms, _off, node, caller, _battery) = setup(3, 80);
        assert_eq!(
            caller.notify(&node, &Message::Power(PowerInfo::UnlockWakeup)),
            Err(NodeError::InvalidParam)
        );
    }

    #[test]
    fn kick_restarts_the_countdown() {
        let (broker, clock_ms, off, node, caller, _battery) = setup(3, 80);

        run_seconds(&broker, &clock_ms, 2);
        caller
            .notify(&node, &Message::Power(PowerInfo::KickWakeup))
            .unwrap();
        run_seconds(&broker, &clock_ms, 2);
        assert!(!off.get());
        run_seconds(&broker, &clock_ms, 1);
        assert!(off.get());
    }

    #[test]
    fn requested_shutdown_respects_a_veto() {
        let (broker, clock_ms, off, node, caller, _battery) = setup(0, 80);

        let veto_on = Rc::new(Cell::new(true));
        let veto = broker.add("Veto").unwrap();
        let veto_flag = Rc::clone(&veto_on);
        veto.set_event_callback(
            move |_node, param| match param {
                EventParam::Publish {
                    message: Message::Power(PowerInfo::ShuttingDown),
                    ..
                } if veto_flag.get() => Ok(Handled::Stop),
                _ => Ok(Handled::Ok),
            },
            Interest::PUBLISH,
        );

        caller
            .notify(&node, &Message::Power(PowerInfo::RequestShutdown))
            .unwrap();
        assert!(!off.get(), "vetoed shutdown must not power off");

        veto_on.set(false);
        caller
            .notify(&node, &Message::Power(PowerInfo::RequestShutdown))
            .unwrap();
        assert!(off.get());

        let _ = clock_ms;
    }

    #[test]
    fn low_battery_forces_shutdown() {
        let (broker, clock_ms, off, _node, _caller, battery) = setup(0, 50);

        run_seconds(&broker, &clock_ms, 1);
        assert!(!off.get());

        battery.level.set(4);
        run_seconds(&broker, &clock_ms, 1);
        assert!(off.get());
    }

    #[test]
    fn charging_suppresses_the_low_battery_shutdown() {
        let (broker, clock_ms, off, _node, _caller, battery) = setup(0, 4);

        battery.charging.set(true);
        run_seconds(&broker, &clock_ms, 5);
        assert!(!off.get());
    }

    #[test]
    fn pull_reports_battery_status() {
        let (broker, clock_ms, _off, node, caller, _battery) = setup(120, 80);

        run_seconds(&broker, &clock_ms, 2);

        let mut query = Message::Power(PowerInfo::Status(BatteryStatus::default()));
        caller.pull(&node, &mut query).unwrap();
        match query {
            Message::Power(PowerInfo::Status(status)) => {
                assert!(status.is_ready);
                assert_eq!(status.level_percent, 80);
                assert_eq!(status.auto_shutdown_s, 120);
                assert_eq!(status.uptime_ms, 2000);
                assert!(!status.is_battery_low);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
