// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for execution channel events.
//!
//! This module contains message types for logging events related to:
//! * Channel state transitions
//! * Worker thread lifecycle in the isolated topology
//! * Request submission and rejection

use std::fmt::{Display, Formatter};

/// Channel moved between lifecycle states.
///
/// # Log Level
/// `debug!`
///
/// # Example
/// ```
/// use loxi_host::observability::messages::channel::StateChanged;
///
/// let msg = StateChanged {
///     topology: "inline",
///     from: "Uninitialized",
///     to: "Loading",
/// };
///
/// assert_eq!(msg.to_string(), "inline channel: Uninitialized -> Loading");
/// ```
pub struct StateChanged<'a> {
    pub topology: &'a str,
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for StateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} channel: {} -> {}", self.topology, self.from, self.to)
    }
}

/// Request accepted by a channel.
///
/// # Log Level
/// `debug!`
pub struct RequestSubmitted<'a> {
    pub topology: &'a str,
    pub execution_id: u64,
    pub code_size: usize,
}

impl Display for RequestSubmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Submitted request #{} to {} channel: {} bytes of source",
            self.execution_id, self.topology, self.code_size
        )
    }
}

/// Request rejected because the session already failed.
///
/// # Log Level
/// `warn!`
pub struct RequestRejected<'a> {
    pub execution_id: u64,
    pub reason: &'a str,
}

impl Display for RequestRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected request #{}: {}",
            self.execution_id, self.reason
        )
    }
}

/// Worker thread started.
///
/// # Log Level
/// `info!`
pub struct WorkerStarted<'a> {
    pub thread_name: &'a str,
    pub source: &'a str,
}

impl Display for WorkerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Started worker thread '{}' for module '{}'",
            self.thread_name, self.source
        )
    }
}

/// Worker thread leaving its request loop.
///
/// # Log Level
/// `info!`
pub struct WorkerStopped<'a> {
    pub thread_name: &'a str,
    pub requests_served: u64,
}

impl Display for WorkerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker thread '{}' stopped after {} requests",
            self.thread_name, self.requests_served
        )
    }
}

/// Message for a request the console no longer displays.
///
/// # Log Level
/// `debug!`
pub struct StaleMessageIgnored {
    pub execution_id: u64,
    pub current: Option<u64>,
}

impl Display for StaleMessageIgnored {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.current {
            Some(current) => write!(
                f,
                "Ignoring message for request #{} while showing #{}",
                self.execution_id, current
            ),
            None => write!(
                f,
                "Ignoring message for request #{} with no request shown",
                self.execution_id
            ),
        }
    }
}

/// Message posted after the UI side dropped its receiver.
///
/// # Log Level
/// `debug!`
pub struct ReplyDropped<'a> {
    pub execution_id: u64,
    pub kind: &'a str,
}

impl Display for ReplyDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropped '{}' message for request #{}: receiver is gone",
            self.kind, self.execution_id
        )
    }
}
