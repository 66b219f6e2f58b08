// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::bridge::error::BridgeResult;
use crate::bridge::loader::ModuleLoader;
use crate::bridge::output::{ExecutionId, ExecutionRequest};
use crate::channel::core::ExecutionCore;
use crate::channel::message::WorkerMessage;
use crate::channel::{ChannelState, Topology};
use crate::observability::messages::channel::RequestSubmitted;
use crate::traits::ExecutionChannel;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Runs the module on the caller's task.
///
/// `submit` does not return until `run_file` does, so every message for the
/// request is already queued when it returns. A long-running program blocks
/// the caller for its whole duration.
pub struct InlineChannel {
    core: ExecutionCore,
    next_id: ExecutionId,
    replies: UnboundedSender<WorkerMessage>,
    inbox: UnboundedReceiver<WorkerMessage>,
}

impl InlineChannel {
    pub fn new(loader: ModuleLoader) -> Self {
        let (replies, inbox) = mpsc::unbounded_channel();
        let core = ExecutionCore::new(loader, Arc::new(replies.clone()), Topology::Inline);
        Self {
            core,
            next_id: ExecutionId(1),
            replies,
            inbox,
        }
    }

    /// Load the module ahead of the first request.
    pub async fn preload(&mut self) -> BridgeResult<()> {
        self.core.ensure_loaded().await
    }

    pub fn core(&self) -> &ExecutionCore {
        &self.core
    }
}

#[async_trait]
impl ExecutionChannel for InlineChannel {
    async fn submit(&mut self, code: String) -> BridgeResult<ExecutionId> {
        let id = self.next_id;
        self.next_id = id.next();

        tracing::debug!(
            "{}",
            RequestSubmitted {
                topology: Topology::Inline.as_str(),
                execution_id: id.0,
                code_size: code.len(),
            }
        );
        self.core.serve(ExecutionRequest { id, code }, &self.replies).await;
        Ok(id)
    }

    async fn next_message(&mut self) -> Option<WorkerMessage> {
        // The channel holds its own sender, so an empty inbox would never
        // close. Only hand out what is already queued.
        self.inbox.try_recv().ok()
    }

    fn try_next_message(&mut self) -> Option<WorkerMessage> {
        self.inbox.try_recv().ok()
    }

    fn topology(&self) -> Topology {
        Topology::Inline
    }

    fn state(&self) -> ChannelState {
        self.core.state()
    }
}
