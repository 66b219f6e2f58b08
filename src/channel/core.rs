// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The execution core owns the one live instance for a session.
//!
//! Both topologies drive a core: the inline channel on the caller's task, the
//! isolated channel on its worker thread. The core loads lazily on the first
//! request, remembers a failed load forever, and runs requests strictly one at
//! a time (`&mut self`).

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::loader::{ExecutionReport, LoxInstance, ModuleLoader};
use crate::bridge::output::ExecutionRequest;
use crate::channel::message::{post, WorkerMessage};
use crate::channel::{ChannelState, Topology};
use crate::observability::messages::channel::{RequestRejected, StateChanged};
use crate::traits::OutputSink;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// What the core currently holds.
pub enum ModuleSlot {
    Empty,
    Ready(Box<LoxInstance>),
    /// Terminal until `teardown`; carries the load failure.
    Failed(String),
}

pub struct ExecutionCore {
    loader: ModuleLoader,
    sink: Arc<dyn OutputSink>,
    slot: ModuleSlot,
    state: ChannelState,
    topology: Topology,
}

impl ExecutionCore {
    pub fn new(loader: ModuleLoader, sink: Arc<dyn OutputSink>, topology: Topology) -> Self {
        Self {
            loader,
            sink,
            slot: ModuleSlot::Empty,
            state: ChannelState::Uninitialized,
            topology,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn instance(&self) -> Option<&LoxInstance> {
        match &self.slot {
            ModuleSlot::Ready(instance) => Some(&**instance),
            _ => None,
        }
    }

    fn transition(&mut self, to: ChannelState) {
        tracing::debug!(
            "{}",
            StateChanged {
                topology: self.topology.as_str(),
                from: self.state.as_str(),
                to: to.as_str(),
            }
        );
        self.state = to;
    }

    /// Load the module unless it is already live.
    ///
    /// A Ready core returns immediately, so `setup` never runs twice. A
    /// Failed core never retries.
    pub async fn ensure_loaded(&mut self) -> BridgeResult<()> {
        match &self.slot {
            ModuleSlot::Ready(_) => return Ok(()),
            ModuleSlot::Failed(reason) => return Err(BridgeError::SessionFailed(reason.clone())),
            ModuleSlot::Empty => {}
        }

        self.transition(ChannelState::Loading);
        match self.loader.load(self.sink.clone()).await {
            Ok(instance) => {
                self.slot = ModuleSlot::Ready(Box::new(instance));
                self.transition(ChannelState::Ready);
                Ok(())
            }
            Err(e) => {
                self.slot = ModuleSlot::Failed(e.to_string());
                self.transition(ChannelState::Failed);
                Err(e)
            }
        }
    }

    /// Run one request, loading first if needed.
    pub async fn execute(&mut self, request: ExecutionRequest) -> BridgeResult<ExecutionReport> {
        let id = request.id;
        if let Err(e) = self.ensure_loaded().await {
            if let BridgeError::SessionFailed(reason) = &e {
                tracing::warn!(
                    "{}",
                    RequestRejected {
                        execution_id: id.0,
                        reason,
                    }
                );
            }
            return Err(e);
        }

        self.transition(ChannelState::Executing);
        let result = match &mut self.slot {
            ModuleSlot::Ready(instance) => instance.run(request),
            _ => Err(BridgeError::SessionFailed("module is not loaded".to_string())),
        };
        self.transition(ChannelState::Ready);
        result
    }

    /// Run one request and post its terminal message to `replies`.
    ///
    /// Output messages have already gone out through the sink by the time
    /// the terminal message is sent.
    pub async fn serve(&mut self, request: ExecutionRequest, replies: &UnboundedSender<WorkerMessage>) {
        let id = request.id;
        let message = match self.execute(request).await {
            Ok(_) => WorkerMessage::Done { id },
            Err(e) if e.is_fatal() => WorkerMessage::Fatal {
                id,
                message: e.to_string(),
            },
            Err(e) => WorkerMessage::Fault {
                id,
                message: e.to_string(),
            },
        };
        post(replies, message);
    }

    /// Drop the instance; the next request loads afresh.
    pub fn teardown(&mut self) {
        self.slot = ModuleSlot::Empty;
        self.transition(ChannelState::Uninitialized);
    }
}
