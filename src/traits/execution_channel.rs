// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::bridge::error::BridgeResult;
use crate::bridge::output::ExecutionId;
use crate::channel::{ChannelState, Topology, WorkerMessage};

/// Orchestrates execution requests against the interpreter, one at a time.
///
/// Requests are served in submission order. Every message produced for a
/// request carries the id `submit` returned, and each request ends with
/// exactly one terminal message (`done`, `fault` or `fatal`).
#[async_trait]
pub trait ExecutionChannel: Send {
    /// Hand a program to the interpreter.
    ///
    /// The inline topology runs it to completion before returning; the
    /// isolated topology only enqueues it.
    async fn submit(&mut self, code: String) -> BridgeResult<ExecutionId>;

    /// Wait for the next outbound message. `None` once the producer is gone.
    async fn next_message(&mut self) -> Option<WorkerMessage>;

    /// Take a message if one is already waiting.
    fn try_next_message(&mut self) -> Option<WorkerMessage>;

    fn topology(&self) -> Topology;

    fn state(&self) -> ChannelState;
}
