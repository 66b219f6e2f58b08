// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Messages exchanged between the UI side and the execution side.
//!
//! Both directions are serde types so the isolated topology could move them
//! over any byte transport; in-process they travel through tokio channels.

use crate::bridge::output::{ExecutionId, ExecutionRequest, OutputEvent, OutputKind};
use crate::observability::messages::channel::ReplyDropped;
use crate::traits::OutputSink;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::UnboundedSender;

/// Inbound request: `{"id":1,"code":"print 1;"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub id: ExecutionId,
    pub code: String,
}

impl From<WorkerRequest> for ExecutionRequest {
    fn from(request: WorkerRequest) -> Self {
        ExecutionRequest {
            id: request.id,
            code: request.code,
        }
    }
}

/// Outbound message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    #[serde(rename = "out")]
    Stdout { id: ExecutionId, text: String },
    #[serde(rename = "err")]
    Stderr { id: ExecutionId, text: String },
    /// `run_file` returned.
    Done { id: ExecutionId },
    /// The request trapped; the instance is still live.
    Fault { id: ExecutionId, message: String },
    /// The session is unusable; this and every later request fail.
    Fatal { id: ExecutionId, message: String },
}

impl WorkerMessage {
    pub fn from_event(id: ExecutionId, event: OutputEvent) -> Self {
        match event.kind {
            OutputKind::Stdout => WorkerMessage::Stdout { id, text: event.text },
            OutputKind::Stderr => WorkerMessage::Stderr { id, text: event.text },
        }
    }

    pub fn id(&self) -> ExecutionId {
        match self {
            WorkerMessage::Stdout { id, .. }
            | WorkerMessage::Stderr { id, .. }
            | WorkerMessage::Done { id }
            | WorkerMessage::Fault { id, .. }
            | WorkerMessage::Fatal { id, .. } => *id,
        }
    }

    /// The `type` tag this message serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::Stdout { .. } => "out",
            WorkerMessage::Stderr { .. } => "err",
            WorkerMessage::Done { .. } => "done",
            WorkerMessage::Fault { .. } => "fault",
            WorkerMessage::Fatal { .. } => "fatal",
        }
    }

    /// Whether this is the last message for its request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerMessage::Done { .. } | WorkerMessage::Fault { .. } | WorkerMessage::Fatal { .. }
        )
    }
}

/// Send `message`, logging it when the receiver is gone.
///
/// Returns whether the message was queued.
pub fn post(replies: &UnboundedSender<WorkerMessage>, message: WorkerMessage) -> bool {
    match replies.send(message) {
        Ok(()) => true,
        Err(SendError(message)) => {
            tracing::debug!(
                "{}",
                ReplyDropped {
                    execution_id: message.id().0,
                    kind: message.kind(),
                }
            );
            false
        }
    }
}

impl OutputSink for UnboundedSender<WorkerMessage> {
    fn emit(&self, id: ExecutionId, event: OutputEvent) {
        post(self, WorkerMessage::from_event(id, event));
    }
}
