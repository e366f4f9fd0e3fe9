/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-node software timers.
//!
//! One monotonic millisecond tick source drives every timer. The manager is
//! advanced once per run-loop pass by [`DataBroker::handle_timer`]
//! (crate::broker::DataBroker::handle_timer): elapsed wall time is
//! subtracted from every countdown, expired timers are reloaded to their
//! full period measured from *now* (a slow pass never produces a burst of
//! catch-up expiries), and only then are the expiry events dispatched. The
//! two-phase shape lets a timer callback freely start, stop or re-period
//! any timer, including its own.

use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::Handled;
use crate::node::{DataNode, EventParam, NodeHandle};

/// Sentinel returned by [`TimerManager::time_till_next`] when no timer is
/// running: the run loop may sleep indefinitely.
pub const TIME_TILL_NEXT_IDLE: u32 = u32::MAX;

struct NodeTimer<M> {
    node: Weak<DataNode<M>>,
    period_ms: u32,
    remaining_ms: u32,
}

/// Owns every running timer plus the tick source.
///
/// Held by the broker core behind a `RefCell`; all mutation happens on the
/// single bus thread.
pub(crate) struct TimerManager<M> {
    timers: Vec<NodeTimer<M>>,
    /// Monotonic millisecond counter; wraps at `u32::MAX`.
    tick: Option<Box<dyn FnMut() -> u32>>,
    last_tick: u32,
}

impl<M: 'static> TimerManager<M> {
    pub(crate) fn new() -> Self {
        TimerManager {
            timers: Vec::new(),
            tick: None,
            last_tick: 0,
        }
    }

    /// Installs the monotonic tick source. Timers started before this point
    /// simply wait for the first `advance`.
    pub(crate) fn init(&mut self, mut tick: Box<dyn FnMut() -> u32>) {
        self.last_tick = tick();
        self.tick = Some(tick);
    }

    pub(crate) fn start(&mut self, node: &Rc<DataNode<M>>, period_ms: u32) {
        let lead = self.interval_elapsed();
        if let Some(timer) = self.find_mut(node) {
            timer.period_ms = period_ms;
            timer.remaining_ms = period_ms.saturating_add(lead);
            return;
        }
        trace!(node = node.id(), period_ms, "timer started");
        self.timers.push(NodeTimer {
            node: Rc::downgrade(node),
            period_ms,
            remaining_ms: period_ms.saturating_add(lead),
        });
    }

    pub(crate) fn stop(&mut self, node: &DataNode<M>) {
        let target = node as *const DataNode<M>;
        self.timers.retain(|timer| timer.node.as_ptr() != target);
    }

    pub(crate) fn set_period(&mut self, node: &DataNode<M>, period_ms: u32) {
        let lead = self.interval_elapsed();
        if let Some(timer) = self.find_raw_mut(node) {
            timer.period_ms = period_ms;
            timer.remaining_ms = period_ms.saturating_add(lead);
        }
    }

    /// Milliseconds already elapsed in the current advance interval.
    ///
    /// The next `advance` charges every countdown with the full interval
    /// since the previous pass, so a timer started or re-armed mid-interval
    /// is pre-credited with this lead; its first expiry then lands a full
    /// period after the call, not after the previous pass.
    fn interval_elapsed(&mut self) -> u32 {
        match self.tick.as_mut() {
            Some(tick) => tick().wrapping_sub(self.last_tick),
            None => 0,
        }
    }

    pub(crate) fn is_running(&self, node: &DataNode<M>) -> bool {
        let target = node as *const DataNode<M>;
        self.timers.iter().any(|timer| timer.node.as_ptr() == target)
    }

    pub(crate) fn remaining(&self, node: &DataNode<M>) -> Option<u32> {
        let target = node as *const DataNode<M>;
        self.timers
            .iter()
            .find(|timer| timer.node.as_ptr() == target)
            .map(|timer| timer.remaining_ms)
    }

    fn find_mut(&mut self, node: &Rc<DataNode<M>>) -> Option<&mut NodeTimer<M>> {
        self.find_raw_mut(Rc::as_ref(node))
    }

    fn find_raw_mut(&mut self, node: &DataNode<M>) -> Option<&mut NodeTimer<M>> {
        let target = node as *const DataNode<M>;
        self.timers
            .iter_mut()
            .find(|timer| timer.node.as_ptr() == target)
    }

    /// Phase one of a run-loop pass: subtract elapsed time, collect expired
    /// nodes, reload their countdowns from now.
    ///
    /// Returns the expired nodes (registry-insertion order of their timers)
    /// and the milliseconds until the *next* expiry among the timers that
    /// did not fire this pass, [`TIME_TILL_NEXT_IDLE`] if none remain.
    /// Expired timers are reloaded to their full period, so their next
    /// deadline is measured from this pass, not from the missed one.
    pub(crate) fn advance(&mut self) -> (Vec<NodeHandle<M>>, u32) {
        let Some(tick) = self.tick.as_mut() else {
            return (Vec::new(), TIME_TILL_NEXT_IDLE);
        };

        let now = tick();
        let elapsed = now.wrapping_sub(self.last_tick);
        self.last_tick = now;

        let mut expired = Vec::new();
        let mut till_next = TIME_TILL_NEXT_IDLE;

        self.timers.retain_mut(|timer| {
            let Some(node) = timer.node.upgrade() else {
                return false; // owner dropped, timer dies with it
            };

            timer.remaining_ms = timer.remaining_ms.saturating_sub(elapsed);
            if timer.remaining_ms == 0 {
                expired.push(node);
                timer.remaining_ms = timer.period_ms;
            } else {
                till_next = till_next.min(timer.remaining_ms);
            }
            true
        });

        (expired, till_next)
    }

    /// Milliseconds until the earliest running timer expires, without
    /// advancing anything.
    pub(crate) fn time_till_next(&self) -> u32 {
        self.timers
            .iter()
            .filter(|timer| timer.node.strong_count() > 0)
            .map(|timer| timer.remaining_ms)
            .min()
            .unwrap_or(TIME_TILL_NEXT_IDLE)
    }
}

/// Phase two: deliver the expiry events outside any manager borrow.
///
/// A `Stop` from a timer callback has no broadcast to veto and is treated
/// as a normal completion.
pub(crate) fn dispatch_expired<M: 'static>(expired: Vec<NodeHandle<M>>) {
    for node in expired {
        match node.dispatch(EventParam::Timer) {
            Ok(Handled::Ok) | Ok(Handled::Stop) => {}
            Err(err) => {
                trace!(node = node.id(), %err, "timer event rejected");
            }
        }
    }
}
