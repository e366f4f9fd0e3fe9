/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Registry of every node on the bus.
//!
//! The [`DataBroker`] owns the node registry and the timer manager. The
//! topology is fixed in practice: the application registers every node once
//! at startup, so registry order is construction order and publish fan-out
//! order is deterministic for the lifetime of the process.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::node::{DataNode, NodeHandle};
use crate::timer::{self, TimerManager};

/// Registry-level failures. Distinct from [`crate::NodeError`], which covers
/// event dispatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("node id {0:?} is already registered")]
    DuplicateId(String),
}

/// Shared state behind every node's back-reference.
pub(crate) struct BrokerCore<M> {
    nodes: RefCell<Vec<NodeHandle<M>>>,
    timers: RefCell<TimerManager<M>>,
}

impl<M: 'static> BrokerCore<M> {
    pub(crate) fn search(&self, id: &str) -> Option<NodeHandle<M>> {
        self.nodes
            .borrow()
            .iter()
            .find(|node| node.id() == id)
            .cloned()
    }

    /// Clone of the registry for borrow-free iteration during fan-out.
    pub(crate) fn snapshot(&self) -> Vec<NodeHandle<M>> {
        self.nodes.borrow().clone()
    }

    pub(crate) fn timers(&self) -> &RefCell<TimerManager<M>> {
        &self.timers
    }
}

/// The bus itself: node registry plus timer manager.
///
/// Not `Clone` and not `Sync`; the application owns exactly one and drives
/// it from a single thread.
pub struct DataBroker<M: 'static> {
    core: Rc<BrokerCore<M>>,
}

impl<M: 'static> DataBroker<M> {
    pub fn new() -> Self {
        DataBroker {
            core: Rc::new(BrokerCore {
                nodes: RefCell::new(Vec::new()),
                timers: RefCell::new(TimerManager::new()),
            }),
        }
    }

    /// Registers a new node under `id` and returns its handle. Identifiers
    /// are unique; fan-out visits nodes in registration order.
    pub fn add(&self, id: &str) -> Result<NodeHandle<M>, BrokerError> {
        if self.core.search(id).is_some() {
            warn!(id, "node id already registered");
            return Err(BrokerError::DuplicateId(id.to_owned()));
        }

        let node = DataNode::new(id.to_owned(), Rc::downgrade(&self.core));
        self.core.nodes.borrow_mut().push(Rc::clone(&node));
        debug!(id, "node registered");
        Ok(node)
    }

    /// Looks up a registered node by identifier.
    pub fn search(&self, id: &str) -> Option<NodeHandle<M>> {
        self.core.search(id)
    }

    /// Unregisters `id`: its timer is stopped, its callback cleared and the
    /// registry entry dropped. Outstanding handles held by other services
    /// keep the node alive but every dispatch to it returns `Unsupported`.
    pub fn remove(&self, id: &str) -> bool {
        let found = {
            let mut nodes = self.core.nodes.borrow_mut();
            match nodes.iter().position(|node| node.id() == id) {
                Some(pos) => Some(nodes.remove(pos)),
                None => None,
            }
        };

        match found {
            Some(node) => {
                self.core.timers.borrow_mut().stop(&node);
                node.clear_callback();
                debug!(id, "node removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.core.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.nodes.borrow().is_empty()
    }

    /// Identifiers of every registered node, in registration order.
    pub fn node_ids(&self) -> Vec<String> {
        self.core
            .nodes
            .borrow()
            .iter()
            .map(|node| node.id().to_owned())
            .collect()
    }

    /// Advisory interest masks alongside the identifiers, for listings.
    pub fn node_table(&self) -> Vec<(String, crate::node::Interest)> {
        self.core
            .nodes
            .borrow()
            .iter()
            .map(|node| (node.id().to_owned(), node.interest()))
            .collect()
    }

    // ── Timers ────────────────────────────────────────────────────────────────

    /// Installs the monotonic millisecond tick source. Must be called once
    /// before the first [`handle_timer`](Self::handle_timer) pass.
    pub fn init_timer_manager(&self, tick: Box<dyn FnMut() -> u32>) {
        self.core.timers.borrow_mut().init(tick);
    }

    /// One run-loop timer pass: subtracts elapsed time from every countdown,
    /// dispatches the expiries and returns the milliseconds until the next
    /// deadline ([`crate::TIME_TILL_NEXT_IDLE`] when no timer is pending).
    ///
    /// Expiry callbacks run after all countdowns are settled, so they may
    /// start, stop or re-period any timer, including their own.
    pub fn handle_timer(&self) -> u32 {
        let (expired, till_next) = self.core.timers.borrow_mut().advance();
        timer::dispatch_expired(expired);
        till_next
    }

    /// Milliseconds until the earliest pending timer deadline, without
    /// advancing anything.
    pub fn time_till_next(&self) -> u32 {
        self.core.timers.borrow().time_till_next()
    }
}

impl<M: 'static> Default for DataBroker<M> {
    fn default() -> Self {
        DataBroker::new()
    }
}

impl<M: 'static> Drop for DataBroker<M> {
    /// Teardown breaks the node → callback → captured-handle cycles by
    /// clearing every callback, then reports nodes still referenced from
    /// outside the registry.
    fn drop(&mut self) {
        let nodes = std::mem::take(&mut *self.core.nodes.borrow_mut());
        for node in &nodes {
            node.clear_callback();
        }
        for node in &nodes {
            // Registry holds the one strong count in `nodes` right now.
            let outside = Rc::strong_count(node) - 1;
            if outside > 0 {
                warn!(
                    id = node.id(),
                    handles = outside,
                    "node still referenced at broker teardown"
                );
            }
        }
    }
}
