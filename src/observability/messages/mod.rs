// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` so log lines stay consistent and
//! free of scattered format strings. Messages that describe a unit of work
//! also implement [`StructuredLog`] to emit typed fields and open a span.
//!
//! # Organization
//!
//! * `bridge` - module loading, ABI negotiation and module calls
//! * `channel` - execution channel states and the worker thread
//!
//! # Usage Pattern
//!
//! ```rust
//! use loxi_host::observability::messages::channel::WorkerStarted;
//!
//! let msg = WorkerStarted {
//!     thread_name: "lox-worker",
//!     source: "web/loxi.wasm",
//! };
//!
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod bridge;
pub mod channel;

/// Message that can log itself with structured fields.
pub trait StructuredLog {
    /// Emit the message at its natural level with typed fields.
    fn log(&self);

    /// Open a span carrying the message's identifying fields.
    fn span(&self, name: &str) -> Span;
}
