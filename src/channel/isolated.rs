// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::loader::ModuleLoader;
use crate::bridge::output::ExecutionId;
use crate::channel::core::ExecutionCore;
use crate::channel::message::{WorkerMessage, WorkerRequest};
use crate::channel::{ChannelState, Topology};
use crate::observability::messages::channel::{RequestSubmitted, WorkerStarted, WorkerStopped};
use crate::traits::ExecutionChannel;
use async_trait::async_trait;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const WORKER_THREAD_NAME: &str = "lox-worker";

/// Runs the module on a dedicated worker thread.
///
/// The worker owns the loader, the instance and a current-thread tokio
/// runtime. The UI side only holds the two queue ends, so it stays
/// responsive however long `run_file` takes.
///
/// Dropping the channel closes the request queue; the worker exits after the
/// call it is in. A worker stuck in a non-terminating program is detached,
/// not killed.
pub struct IsolatedChannel {
    requests: UnboundedSender<WorkerRequest>,
    inbox: UnboundedReceiver<WorkerMessage>,
    next_id: ExecutionId,
    outstanding: usize,
    started: bool,
    failed: bool,
    worker: Option<JoinHandle<()>>,
}

impl IsolatedChannel {
    pub fn spawn(loader: ModuleLoader) -> BridgeResult<Self> {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (replies, inbox) = mpsc::unbounded_channel();

        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop(loader, request_rx, replies))?;

        Ok(Self {
            requests,
            inbox,
            next_id: ExecutionId(1),
            outstanding: 0,
            started: false,
            failed: false,
            worker: Some(worker),
        })
    }

    /// Close the queue, wait for the worker to drain it, and return the
    /// messages nobody consumed.
    ///
    /// Blocks until every queued request has been served.
    pub fn shutdown(self) -> Vec<WorkerMessage> {
        let IsolatedChannel {
            requests,
            mut inbox,
            worker,
            ..
        } = self;
        drop(requests);
        if let Some(worker) = worker {
            let _ = worker.join();
        }

        let mut remaining = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            remaining.push(message);
        }
        remaining
    }

    fn observe(&mut self, message: &WorkerMessage) {
        if message.is_terminal() {
            self.outstanding = self.outstanding.saturating_sub(1);
        }
        if matches!(message, WorkerMessage::Fatal { .. }) {
            self.failed = true;
        }
    }
}

#[async_trait]
impl ExecutionChannel for IsolatedChannel {
    async fn submit(&mut self, code: String) -> BridgeResult<ExecutionId> {
        let id = self.next_id;
        let code_size = code.len();

        self.requests
            .send(WorkerRequest { id, code })
            .map_err(|_| BridgeError::ChannelClosed)?;
        self.next_id = id.next();
        self.started = true;
        self.outstanding += 1;

        tracing::debug!(
            "{}",
            RequestSubmitted {
                topology: Topology::Isolated.as_str(),
                execution_id: id.0,
                code_size,
            }
        );
        Ok(id)
    }

    async fn next_message(&mut self) -> Option<WorkerMessage> {
        let message = self.inbox.recv().await?;
        self.observe(&message);
        Some(message)
    }

    fn try_next_message(&mut self) -> Option<WorkerMessage> {
        let message = self.inbox.try_recv().ok()?;
        self.observe(&message);
        Some(message)
    }

    fn topology(&self) -> Topology {
        Topology::Isolated
    }

    /// Seen from the UI side: loading is reported as `Executing` since the
    /// worker loads while serving its first request.
    fn state(&self) -> ChannelState {
        if self.failed {
            ChannelState::Failed
        } else if !self.started {
            ChannelState::Uninitialized
        } else if self.outstanding > 0 {
            ChannelState::Executing
        } else {
            ChannelState::Ready
        }
    }
}

fn worker_loop(
    loader: ModuleLoader,
    mut requests: UnboundedReceiver<WorkerRequest>,
    replies: UnboundedSender<WorkerMessage>,
) {
    let source = loader.source().to_string();
    tracing::info!(
        "{}",
        WorkerStarted {
            thread_name: WORKER_THREAD_NAME,
            source: &source,
        }
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let message = BridgeError::from(e).to_string();
            while let Some(request) = requests.blocking_recv() {
                let _ = replies.send(WorkerMessage::Fatal {
                    id: request.id,
                    message: message.clone(),
                });
            }
            return;
        }
    };

    let requests_served = runtime.block_on(async move {
        let sink = Arc::new(replies.clone());
        let mut core = ExecutionCore::new(loader, sink, Topology::Isolated);
        let mut served = 0u64;
        while let Some(request) = requests.recv().await {
            core.serve(request.into(), &replies).await;
            served += 1;
        }
        served
    });

    tracing::info!(
        "{}",
        WorkerStopped {
            thread_name: WORKER_THREAD_NAME,
            requests_served,
        }
    );
}
