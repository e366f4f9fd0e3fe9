/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Result codes returned by every event dispatch.
//!
//! Two layers model the two kinds of outcome:
//!
//! * [`Handled`] — successful completion, including the deliberate
//!   [`Handled::Stop`] broadcast veto (control flow, not a failure).
//! * [`NodeError`] — why a receiver rejected the event.
//!
//! The bus never retries and never aborts on a bad result: every dispatch
//! call hands the code back to its immediate caller, which decides whether
//! to log, ignore or propagate.

use thiserror::Error;

/// Successful outcome of an event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Event processed normally.
    Ok,
    /// Receiver vetoed the broadcast: the remaining fan-out of the current
    /// `publish` is skipped and `Stop` propagates back to the publisher.
    /// Meaningful only for publish deliveries; side effects already performed
    /// by earlier receivers are *not* reversed.
    Stop,
}

/// Why a receiver rejected an event.
///
/// Every variant maps to a log-and-degrade decision in the caller; none of
/// them aborts the bus.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// No callback installed, or the callback does not handle this event
    /// kind, or the dispatch target is gone.
    #[error("event kind not handled or target unavailable")]
    Unsupported,

    /// The payload is not the message family this node expects. Receivers
    /// check this before touching the payload contents; for raw-blob
    /// payloads the check degrades to an exact length comparison.
    #[error("payload does not match the expected message family")]
    TypeMismatch,

    /// A payload field is outside its valid domain (e.g. hour 25).
    #[error("parameter out of range")]
    InvalidParam,

    /// A query had nothing to return.
    #[error("no data available")]
    NoData,

    /// Unspecified failure, also returned when a dispatch would re-enter a
    /// node that is already mid-dispatch.
    #[error("unspecified failure")]
    Unknown,
}

/// Result of one event dispatch.
pub type EventResult = Result<Handled, NodeError>;
