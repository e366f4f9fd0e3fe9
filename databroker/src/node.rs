/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The addressable unit of the bus.
//!
//! A [`DataNode`] holds an immutable identifier, a single event callback and
//! an advisory interest mask. Service modules receive their node at
//! construction time, resolve the peers they depend on with
//! [`DataNode::subscribe`], and install their callback with
//! [`DataNode::set_event_callback`]. If a required peer is missing the
//! idiomatic reaction is to return *without* installing a callback, leaving
//! the module permanently inert but harmless.
//!
//! # Ownership
//! Nodes are reference counted ([`NodeHandle`] = `Rc<DataNode<M>>`). The
//! registry holds one strong handle per node; services may retain as many
//! additional handles as they like. The node's own callback typically
//! captures the service state, so the broker breaks the resulting cycles by
//! clearing every callback at teardown.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::BitOr;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::broker::BrokerCore;
use crate::error::{EventResult, Handled, NodeError};

/// Shared handle to a registered node.
pub type NodeHandle<M> = Rc<DataNode<M>>;

// ── Event kinds and interest mask ─────────────────────────────────────────────

/// The four delivery forms a callback can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Publish,
    Notify,
    Pull,
    Timer,
}

impl EventKind {
    fn bit(self) -> u8 {
        match self {
            EventKind::Publish => 1 << 0,
            EventKind::Notify => 1 << 1,
            EventKind::Pull => 1 << 2,
            EventKind::Timer => 1 << 3,
        }
    }
}

/// Advisory bitmask of the event kinds a node claims to handle.
///
/// Dispatch happens regardless of the mask; a callback receiving a kind it
/// does not handle must return [`NodeError::Unsupported`] itself. The mask
/// exists for introspection (e.g. the shell's `nodes` listing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest(u8);

impl Interest {
    pub const NONE: Interest = Interest(0);
    pub const PUBLISH: Interest = Interest(1 << 0);
    pub const NOTIFY: Interest = Interest(1 << 1);
    pub const PULL: Interest = Interest(1 << 2);
    pub const TIMER: Interest = Interest(1 << 3);
    pub const ALL: Interest = Interest(0b1111);

    /// Returns `true` if the mask claims `kind`.
    pub fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, rhs: Interest) -> Interest {
        Interest(self.0 | rhs.0)
    }
}

impl fmt::Display for Interest {
    /// Compact four-letter form, e.g. `P-LT` for publish+pull+timer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, c) in [
            (EventKind::Publish, 'P'),
            (EventKind::Notify, 'N'),
            (EventKind::Pull, 'L'),
            (EventKind::Timer, 'T'),
        ] {
            write!(f, "{}", if self.contains(kind) { c } else { '-' })?;
        }
        Ok(())
    }
}

// ── Event parameter ───────────────────────────────────────────────────────────

/// The message envelope passed into every callback.
///
/// The payload type `M` is chosen by the application — a closed enum with
/// one variant per message family recovers type safety at compile time while
/// the receivers' variant check preserves the "unexpected payload ⇒ reject"
/// runtime fallback.
pub enum EventParam<'a, M> {
    /// One-to-many broadcast. `origin` identifies the publishing node.
    Publish {
        origin: NodeHandle<M>,
        message: &'a M,
    },
    /// One-to-one command delivery.
    Notify { message: &'a M },
    /// One-to-one query: the receiver writes its current state into
    /// `message` in place.
    Pull { message: &'a mut M },
    /// This node's own software timer expired. No payload.
    Timer,
}

impl<M> EventParam<'_, M> {
    /// The delivery form of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            EventParam::Publish { .. } => EventKind::Publish,
            EventParam::Notify { .. } => EventKind::Notify,
            EventParam::Pull { .. } => EventKind::Pull,
            EventParam::Timer => EventKind::Timer,
        }
    }
}

/// The node's single polymorphic event callback.
pub type EventCallback<M> =
    Box<dyn FnMut(&NodeHandle<M>, EventParam<'_, M>) -> EventResult>;

// ── DataNode ──────────────────────────────────────────────────────────────────

/// An addressable endpoint on the bus.
pub struct DataNode<M> {
    id: String,
    broker: Weak<BrokerCore<M>>,
    callback: RefCell<Option<EventCallback<M>>>,
    interest: Cell<Interest>,
}

impl<M: 'static> DataNode<M> {
    pub(crate) fn new(id: String, broker: Weak<BrokerCore<M>>) -> Rc<Self> {
        Rc::new(DataNode {
            id,
            broker,
            callback: RefCell::new(None),
            interest: Cell::new(Interest::NONE),
        })
    }

    /// The node's unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The advisory interest mask declared with
    /// [`set_event_callback`](Self::set_event_callback).
    pub fn interest(&self) -> Interest {
        self.interest.get()
    }

    /// Installs the node's single callback and declares the event kinds it
    /// claims to handle. Re-installation overwrites.
    pub fn set_event_callback<F>(&self, callback: F, interest: Interest)
    where
        F: FnMut(&NodeHandle<M>, EventParam<'_, M>) -> EventResult + 'static,
    {
        if self.callback.borrow().is_some() {
            warn!(node = self.id.as_str(), "event callback re-installed");
        }
        *self.callback.borrow_mut() = Some(Box::new(callback));
        self.interest.set(interest);
    }

    /// Resolves another node by identifier via the owning broker.
    ///
    /// Returns `None` when no node with that identifier is registered —
    /// callers treat this as "feature unavailable" and disable themselves
    /// gracefully.
    pub fn subscribe(&self, id: &str) -> Option<NodeHandle<M>> {
        let broker = self.broker.upgrade()?;
        let found = broker.search(id);
        if found.is_none() {
            warn!(
                node = self.id.as_str(),
                target = id,
                "subscribe failed, node not registered"
            );
        }
        found
    }

    /// Releases a previously obtained handle. Purely a bookkeeping courtesy
    /// for callers whose handle is scoped shorter than the node itself; the
    /// registry is unaffected.
    pub fn unsubscribe(&self, handle: NodeHandle<M>) {
        debug!(
            node = self.id.as_str(),
            target = handle.id(),
            "handle released"
        );
        drop(handle);
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Broadcasts `message` to every *other* registered node, in registry
    /// order, synchronously.
    ///
    /// A receiver returning [`Handled::Stop`] halts the remaining fan-out
    /// and `Stop` is returned to the caller. Receiver failures are logged
    /// and do not abort the broadcast.
    pub fn publish(self: &Rc<Self>, message: &M) -> EventResult {
        let Some(broker) = self.broker.upgrade() else {
            return Err(NodeError::Unknown);
        };

        // Snapshot so cascaded dispatches never hold the registry borrow.
        for peer in broker.snapshot() {
            if Rc::ptr_eq(&peer, self) {
                continue;
            }

            let param = EventParam::Publish {
                origin: Rc::clone(self),
                message,
            };
            match peer.dispatch(param) {
                Ok(Handled::Stop) => {
                    warn!(
                        origin = self.id.as_str(),
                        vetoed_by = peer.id(),
                        "publish stopped"
                    );
                    return Ok(Handled::Stop);
                }
                Ok(Handled::Ok) => {}
                Err(err) => {
                    // The receiver's business; the fan-out continues.
                    debug!(
                        origin = self.id.as_str(),
                        receiver = peer.id(),
                        %err,
                        "publish receiver rejected event"
                    );
                }
            }
        }

        Ok(Handled::Ok)
    }

    /// Delivers `message` directly to `target` and returns its callback
    /// result verbatim.
    pub fn notify(&self, target: &NodeHandle<M>, message: &M) -> EventResult {
        target.dispatch(EventParam::Notify { message })
    }

    /// Read-style query: `target` writes its current state into `message`.
    pub fn pull(&self, target: &NodeHandle<M>, message: &mut M) -> EventResult {
        target.dispatch(EventParam::Pull { message })
    }

    pub(crate) fn dispatch(self: &Rc<Self>, param: EventParam<'_, M>) -> EventResult {
        let mut slot = match self.callback.try_borrow_mut() {
            Ok(slot) => slot,
            Err(_) => {
                // A cascade circled back into a node that is still mid-dispatch.
                warn!(node = self.id.as_str(), "re-entrant dispatch refused");
                return Err(NodeError::Unknown);
            }
        };

        match slot.as_mut() {
            Some(callback) => callback(self, param),
            None => Err(NodeError::Unsupported),
        }
    }

    pub(crate) fn clear_callback(&self) {
        *self.callback.borrow_mut() = None;
        self.interest.set(Interest::NONE);
    }

    // ── Node timer ────────────────────────────────────────────────────────────

    /// Starts (or restarts) this node's software timer. An already-running
    /// timer has its period and deadline reset.
    pub fn start_timer(self: &Rc<Self>, period_ms: u32) {
        if let Some(broker) = self.broker.upgrade() {
            broker.timers().borrow_mut().start(self, period_ms);
        }
    }

    /// Stops this node's timer; it is removed from consideration entirely.
    pub fn stop_timer(&self) {
        if let Some(broker) = self.broker.upgrade() {
            broker.timers().borrow_mut().stop(self);
        }
    }

    /// Changes the running timer's period and resets its countdown. No-op if
    /// the timer is not running.
    pub fn set_timer_period(&self, period_ms: u32) {
        if let Some(broker) = self.broker.upgrade() {
            broker.timers().borrow_mut().set_period(self, period_ms);
        }
    }

    /// Returns `true` while this node's timer is running.
    pub fn is_timer_running(&self) -> bool {
        match self.broker.upgrade() {
            Some(broker) => broker.timers().borrow().is_running(self),
            None => false,
        }
    }

    /// Remaining countdown of the running timer, if any. Introspection only.
    pub fn timer_remaining(&self) -> Option<u32> {
        self.broker
            .upgrade()
            .and_then(|broker| broker.timers().borrow().remaining(self))
    }
}

impl<M> fmt::Debug for DataNode<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataNode")
            .field("id", &self.id)
            .field("interest", &self.interest.get())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
