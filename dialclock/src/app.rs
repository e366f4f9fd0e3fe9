/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Topology assembly and the cooperative run loop.
//!
//! [`AppContext::new`] registers every service in a fixed order, which
//! pins the registry and therefore the publish fan-out order for the whole
//! process lifetime. After registration the lifecycle broadcasts fire:
//! `DataProcInitFinished` (peers resolve each other) then `AppStarted`
//! (persistent state is reloaded).
//!
//! One [`run_loop_execute`](AppContext::run_loop_execute) call is one bus
//! pass; the returned idle budget tells the caller how long it may sleep
//! before the next timer deadline.

use std::cell::Cell;
use std::rc::Rc;

use databroker::{BrokerError, DataBroker, NodeHandle};
use tracing::info;

use crate::config::AppConfig;
use crate::hal::{host, Hal};
use crate::message::{GlobalInfo, Message};
use crate::service::{
    alarm, audio, button, clock, ctrl, global, kvdb, power, shell, time_monitor, version,
    watchdog,
};

pub struct AppContext {
    broker: Rc<DataBroker<Message>>,
    global: NodeHandle<Message>,
    power_flag: Rc<Cell<bool>>,
    stopped: bool,
}

impl AppContext {
    /// Builds the whole node topology and runs the startup lifecycle.
    ///
    /// `power_flag` is set by the power device when the appliance turns
    /// itself off; the run-loop driver polls it through
    /// [`powered_off`](Self::powered_off).
    pub fn new(
        mut hal: Hal,
        config: &AppConfig,
        power_flag: Rc<Cell<bool>>,
    ) -> Result<AppContext, BrokerError> {
        let broker = Rc::new(DataBroker::new());
        broker.init_timer_manager(hal.tick.take().unwrap_or_else(host::host_tick));

        // Registration order is fan-out order; keep it stable.
        let global = global::register(&broker)?;
        clock::register(&broker, hal.clock.take(), config.clock_period_ms)?;
        time_monitor::register(&broker)?;
        alarm::register(&broker)?;
        audio::register(&broker, hal.buzzer.take())?;
        button::register(&broker, hal.button.take(), config.long_press_ms)?;
        power::register(
            &broker,
            hal.battery.take(),
            hal.power.take(),
            config.auto_shutdown_s,
        )?;
        ctrl::register(&broker, hal.motor.take())?;
        kvdb::register(&broker, config.kvdb_path.clone())?;
        shell::register(&broker, hal.serial.take())?;
        watchdog::register(&broker, hal.watchdog.take(), config.watchdog_timeout_s)?;
        version::register(&broker)?;

        info!(nodes = broker.len(), "topology assembled");
        global::publish(&global, GlobalInfo::DataProcInitFinished);
        global::publish(&global, GlobalInfo::AppStarted);

        Ok(AppContext {
            broker,
            global,
            power_flag,
            stopped: false,
        })
    }

    /// One run-loop pass. Returns the idle budget in milliseconds
    /// ([`databroker::TIME_TILL_NEXT_IDLE`] when no timer is pending).
    pub fn run_loop_execute(&self) -> u32 {
        global::publish(&self.global, GlobalInfo::RunLoopBegin);
        let time_till_next = self.broker.handle_timer();
        global::publish(&self.global, GlobalInfo::RunLoopEnd { time_till_next });
        time_till_next
    }

    /// `true` once the power service has cut the (virtual) power.
    pub fn powered_off(&self) -> bool {
        self.power_flag.get()
    }

    /// Runs the `AppStopped` lifecycle exactly once, flushing persistent
    /// state. Also invoked from `Drop`.
    pub fn shutdown(&mut self) {
        if !self.stopped {
            self.stopped = true;
            info!("application stopping");
            global::publish(&self.global, GlobalInfo::AppStopped);
        }
    }

    pub fn broker(&self) -> &Rc<DataBroker<Message>> {
        &self.broker
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
