// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for module loading, ABI negotiation and module calls.
//!
//! This module contains message types for logging events related to:
//! * Fetching and validating the interpreter binary
//! * Import negotiation and one-time setup
//! * Input transfer and output pushes during `run_file`
//! * Call lifecycle (start, completion, trap)

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Module binary fetched successfully.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use loxi_host::observability::messages::bridge::ModuleLoaded;
///
/// let msg = ModuleLoaded {
///     source: "web/loxi.wasm",
///     size_bytes: 4096,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ModuleLoaded<'a> {
    pub source: &'a str,
    pub size_bytes: usize,
}

impl Display for ModuleLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded WASM module: {} ({} bytes)",
            self.source, self.size_bytes
        )
    }
}

/// Module fetch or instantiation failed.
///
/// # Log Level
/// `error!` - Fatal for the session
///
/// # Example
/// ```
/// use loxi_host::observability::messages::bridge::ModuleLoadFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
/// let msg = ModuleLoadFailed {
///     source: "web/missing.wasm",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ModuleLoadFailed<'a> {
    pub source: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ModuleLoadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to load WASM module '{}': {}",
            self.source, self.error
        )
    }
}

/// Import object negotiated against the module's manifest.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ImportsNegotiated<'a> {
    pub source: &'a str,
    pub import_count: usize,
    pub input: &'a str,
    pub output: &'a str,
}

impl Display for ImportsNegotiated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Negotiated {} imports for '{}': input={}, output={}",
            self.import_count, self.source, self.input, self.output
        )
    }
}

/// One-time `setup` export invoked after instantiation.
///
/// # Log Level
/// `debug!`
pub struct SetupInvoked<'a> {
    pub source: &'a str,
}

impl Display for SetupInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Invoked setup for '{}'", self.source)
    }
}

/// Source text exceeded the transfer capacity and was cut.
///
/// # Log Level
/// `warn!` - Execution continues with the truncated input
///
/// # Example
/// ```
/// use loxi_host::observability::messages::bridge::InputTruncated;
///
/// let msg = InputTruncated {
///     available: 5000,
///     written: 4096,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Input truncated to transfer capacity: wrote 4096 of 5000 bytes"
/// );
/// ```
pub struct InputTruncated {
    pub available: usize,
    pub written: usize,
}

impl Display for InputTruncated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Input truncated to transfer capacity: wrote {} of {} bytes",
            self.written, self.available
        )
    }
}

/// Module pushed output while no request was active (e.g. from `setup`).
pub struct OutputWithoutRequest<'a> {
    pub text: &'a str,
}

impl Display for OutputWithoutRequest<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropping {} bytes of output pushed outside a request",
            self.text.len()
        )
    }
}

/// `run_file` call started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionStarted<'a> {
    pub source: &'a str,
    pub execution_id: u64,
    pub input_size: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Running request #{} on '{}': input_size={} bytes",
            self.execution_id, self.source, self.input_size
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            source = self.source,
            execution_id = self.execution_id,
            input_size = self.input_size,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_file",
            span_name = name,
            source = self.source,
            execution_id = self.execution_id,
        )
    }
}

/// `run_file` returned normally.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use loxi_host::observability::messages::bridge::ExecutionCompleted;
/// use std::time::Duration;
///
/// let msg = ExecutionCompleted {
///     execution_id: 3,
///     bytes_pulled: 12,
///     events_emitted: 2,
///     memory_bytes: 65536,
///     duration: Duration::from_millis(5),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionCompleted {
    pub execution_id: u64,
    pub bytes_pulled: usize,
    pub events_emitted: usize,
    pub memory_bytes: usize,
    pub duration: Duration,
}

impl Display for ExecutionCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Request #{} completed in {:?}: pulled {} bytes, emitted {} events, memory at {} bytes",
            self.execution_id, self.duration, self.bytes_pulled, self.events_emitted, self.memory_bytes
        )
    }
}

impl StructuredLog for ExecutionCompleted {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            bytes_pulled = self.bytes_pulled,
            events_emitted = self.events_emitted,
            memory_bytes = self.memory_bytes,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_file_completed",
            span_name = name,
            execution_id = self.execution_id,
        )
    }
}

/// `run_file` trapped.
///
/// # Log Level
/// `warn!` - The request is faulted, the instance stays live
pub struct ExecutionTrapped<'a> {
    pub execution_id: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for ExecutionTrapped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Request #{} trapped: {}", self.execution_id, self.error)
    }
}
