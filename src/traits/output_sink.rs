// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::bridge::output::{ExecutionId, OutputEvent};

/// Destination for output pushed by the module during a call.
///
/// Host functions run synchronously inside `run_file`, so `emit` must not
/// block or fail; a sink whose receiver is gone drops the event.
pub trait OutputSink: Send + Sync {
    fn emit(&self, id: ExecutionId, event: OutputEvent);
}
