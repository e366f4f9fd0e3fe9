/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Single-threaded publish/subscribe data-node bus.
//!
//! Every independent firmware service owns one [`DataNode`] registered in a
//! [`DataBroker`]. Nodes talk to each other through three synchronous
//! delivery forms plus a timer event:
//!
//! ```text
//! publish  ──► every other registered node   (one-to-many, veto-able)
//! notify   ──► one target node               (one-to-one, fire/command)
//! pull     ──► one target node               (one-to-one, query; the target
//!                                             writes into the caller's message)
//! timer    ──► the owning node               (countdown expiry, no payload)
//! ```
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── error.rs   – result codes returned by every dispatch
//! ├── node.rs    – DataNode, event parameter, interest mask
//! ├── broker.rs  – registry of all nodes, owns the timer manager
//! └── timer.rs   – per-node software timers, idle-time computation
//! ```
//!
//! The bus is cooperative and runs on exactly one logical thread: a dispatch
//! always completes before control returns to its caller, and a callback may
//! itself publish/notify/pull, cascading depth-first. There is no queueing
//! and no locking. The payload type is a caller-chosen parameter `M`
//! (typically a closed enum with one variant per message family), so the
//! framework itself carries no domain content.

pub mod broker;
pub mod error;
pub mod node;
pub mod timer;

pub use broker::{BrokerError, DataBroker};
pub use error::{EventResult, Handled, NodeError};
pub use node::{DataNode, EventKind, EventParam, Interest, NodeHandle};
pub use timer::TIME_TILL_NEXT_IDLE;
