// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! UI side of the host.
//!
//! The console owns the output surface and the two entry points a user has:
//! submit a program, and clear the output. It consumes channel messages and
//! keeps only those for the request it is currently showing.

mod surface;

pub use surface::{paint, OutputSurface};

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::output::{ExecutionId, OutputEvent};
use crate::channel::{ChannelState, Topology, WorkerMessage};
use crate::observability::messages::channel::StaleMessageIgnored;
use crate::traits::ExecutionChannel;

/// How the current request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The module trapped; the session continues.
    Faulted(String),
    /// The host cannot run programs any more.
    Failed(String),
}

pub struct Console {
    channel: Box<dyn ExecutionChannel>,
    surface: OutputSurface,
    current: Option<ExecutionId>,
    outcome: Option<RunOutcome>,
    fatal: Option<String>,
}

impl Console {
    pub fn new(channel: Box<dyn ExecutionChannel>) -> Self {
        Self {
            channel,
            surface: OutputSurface::new(),
            current: None,
            outcome: None,
            fatal: None,
        }
    }

    /// Clear the surface, then hand `code` to the channel.
    ///
    /// Messages still arriving for earlier requests are ignored from here on.
    pub async fn submit(&mut self, code: impl Into<String>) -> BridgeResult<ExecutionId> {
        self.surface.clear();
        self.outcome = None;
        self.current = None;

        let id = self.channel.submit(code.into()).await?;
        self.current = Some(id);
        Ok(id)
    }

    /// Empty the surface without touching the module.
    pub fn clear_output(&mut self) {
        self.surface.clear();
    }

    /// Fold one message into the console.
    ///
    /// Returns the outcome once the current request has finished.
    pub fn apply(&mut self, message: WorkerMessage) -> Option<RunOutcome> {
        let id = message.id();
        if self.current != Some(id) {
            tracing::debug!(
                "{}",
                StaleMessageIgnored {
                    execution_id: id.0,
                    current: self.current.map(|c| c.0),
                }
            );
            return None;
        }

        let outcome = match message {
            WorkerMessage::Stdout { text, .. } => {
                self.surface.append(OutputEvent::stdout(text));
                return None;
            }
            WorkerMessage::Stderr { text, .. } => {
                self.surface.append(OutputEvent::stderr(text));
                return None;
            }
            WorkerMessage::Done { .. } => RunOutcome::Completed,
            WorkerMessage::Fault { message, .. } => RunOutcome::Faulted(message),
            WorkerMessage::Fatal { message, .. } => {
                self.fatal = Some(message.clone());
                RunOutcome::Failed(message)
            }
        };
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    /// Apply every message that is already waiting, without blocking.
    ///
    /// Returns how many messages were consumed.
    pub fn poll(&mut self) -> usize {
        let mut consumed = 0;
        while let Some(message) = self.channel.try_next_message() {
            self.apply(message);
            consumed += 1;
        }
        consumed
    }

    /// Wait until the current request finishes.
    ///
    /// `on_message` sees each message for the current request before it is
    /// applied.
    pub async fn pump<F>(&mut self, mut on_message: F) -> BridgeResult<RunOutcome>
    where
        F: FnMut(&WorkerMessage) + Send,
    {
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }
        if self.current.is_none() {
            return Ok(RunOutcome::Completed);
        }

        loop {
            let message = self
                .channel
                .next_message()
                .await
                .ok_or(BridgeError::ChannelClosed)?;
            if self.current == Some(message.id()) {
                on_message(&message);
            }
            if let Some(outcome) = self.apply(message) {
                return Ok(outcome);
            }
        }
    }

    /// Submit and wait for the outcome.
    pub async fn run(&mut self, code: impl Into<String>) -> BridgeResult<RunOutcome> {
        self.run_streaming(code, |_| {}).await
    }

    /// Submit and wait, observing each message as it arrives.
    pub async fn run_streaming<F>(&mut self, code: impl Into<String>, on_message: F) -> BridgeResult<RunOutcome>
    where
        F: FnMut(&WorkerMessage) + Send,
    {
        self.submit(code).await?;
        self.pump(on_message).await
    }

    pub fn surface(&self) -> &OutputSurface {
        &self.surface
    }

    pub fn current(&self) -> Option<ExecutionId> {
        self.current
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// The host-level failure, once one has been reported.
    pub fn fatal(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    pub fn topology(&self) -> Topology {
        self.channel.topology()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }
}
