// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Store data shared by the host functions during a module call.
//!
//! The pending input lives here only for the duration of one `run_file`
//! call: `begin` moves it in, the first pull-input consumes it, and `finish`
//! discards anything left over.

use crate::bridge::abi::ClockUnit;
use crate::bridge::output::{ExecutionId, ExecutionRequest, OutputEvent, OutputKind};
use crate::observability::messages::bridge::{InputTruncated, OutputWithoutRequest};
use crate::traits::OutputSink;
use std::sync::Arc;
use wasmtime::Memory;

/// Source text awaiting transfer into linear memory.
#[derive(Debug)]
pub struct PendingInput {
    text: String,
}

impl PendingInput {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Per-call counters reported back to the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub bytes_pulled: usize,
    pub truncated: bool,
    pub events_emitted: usize,
}

pub struct HostState {
    pending: Option<PendingInput>,
    active: Option<ExecutionId>,
    sink: Arc<dyn OutputSink>,
    clock: ClockUnit,
    input_capacity: usize,
    memory: Option<Memory>,
    stats: CallStats,
}

impl HostState {
    pub fn new(sink: Arc<dyn OutputSink>, clock: ClockUnit, input_capacity: usize) -> Self {
        Self {
            pending: None,
            active: None,
            sink,
            clock,
            input_capacity,
            memory: None,
            stats: CallStats::default(),
        }
    }

    pub(crate) fn begin(&mut self, request: ExecutionRequest) {
        self.active = Some(request.id);
        self.pending = Some(PendingInput { text: request.code });
        self.stats = CallStats::default();
    }

    pub(crate) fn finish(&mut self) -> CallStats {
        self.pending = None;
        self.active = None;
        std::mem::take(&mut self.stats)
    }

    /// Hand out the pending input; later pulls in the same call see nothing.
    pub fn take_input(&mut self) -> Option<PendingInput> {
        self.pending.take()
    }

    pub(crate) fn record_pull(&mut self, written: usize, available: usize) {
        self.stats.bytes_pulled = written;
        if written < available {
            self.stats.truncated = true;
            tracing::warn!(
                "{}",
                InputTruncated {
                    available,
                    written,
                }
            );
        }
    }

    pub fn emit(&mut self, kind: OutputKind, text: String) {
        match self.active {
            Some(id) => {
                self.stats.events_emitted += 1;
                self.sink.emit(id, OutputEvent { kind, text });
            }
            None => tracing::debug!("{}", OutputWithoutRequest { text: &text }),
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn input_capacity(&self) -> usize {
        self.input_capacity
    }

    pub fn memory(&self) -> Option<Memory> {
        self.memory
    }

    pub(crate) fn attach_memory(&mut self, memory: Memory) {
        self.memory = Some(memory);
    }
}
