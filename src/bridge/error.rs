// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for the host bridge.
//!
//! Errors fall into two groups. Load-time failures (fetch, parse, compile,
//! import negotiation) are fatal for the session: the execution core moves to
//! its terminal `Failed` state and every later request is rejected. Per-call
//! failures (traps, bad pointers from the module) only fault the request that
//! triggered them; the instance stays live.
//!
//! Program-level errors raised by the interpreter itself are not represented
//! here at all. They arrive as ordinary stderr output events.

use thiserror::Error;

/// Error message for component-model binaries handed to the host.
pub const WASM_UNSUPPORTED_ENCODING: &str = "Unsupported WASM binary: component-model binaries are not supported, \
the interpreter must be compiled as a core WASM module.";

/// Error type for all bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Fetch or instantiate failure for the module at `source`.
    #[error("Failed to load module '{source_ref}': {reason}")]
    Load { source_ref: String, reason: String },

    /// The module requires an import the host cannot satisfy.
    #[error("Import mismatch for '{module}.{name}': {reason}")]
    ImportMismatch {
        module: String,
        name: String,
        reason: String,
    },

    /// A required export (`memory`, `run_file`) is absent or has the wrong type.
    #[error("Module is missing required export '{0}'")]
    MissingExport(String),

    /// Module binary exceeds the host's size limit.
    #[error("Module too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    /// Component-model or otherwise unsupported binary encoding.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Filesystem error while reading a module.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error while fetching a module.
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Malformed binary reported by wasmparser.
    #[error("WASM parser error: {0}")]
    Parser(#[from] wasmparser::BinaryReaderError),

    /// Wasmtime engine creation or configuration error.
    #[error("Engine creation error: {0}")]
    Engine(String),

    /// Host function could not be registered with the linker.
    #[error("Linker error: {0}")]
    Link(String),

    /// Every request after a fatal load failure.
    #[error("Session failed, module is unavailable: {0}")]
    SessionFailed(String),

    /// A pointer/length pair supplied by the module falls outside linear memory.
    #[error("Memory access out of bounds: ptr={ptr} len={len} memory_size={memory_size}")]
    OutOfBounds {
        ptr: usize,
        len: usize,
        memory_size: usize,
    },

    /// The module trapped while running a request.
    #[error("Module trapped: {0}")]
    Trap(String),

    /// The worker side of an isolated channel is gone.
    #[error("Execution channel closed")]
    ChannelClosed,
}

impl BridgeError {
    /// Whether this error ends the session.
    ///
    /// Traps and bad pointers only fault a single request; everything raised
    /// while loading, plus the rejected-after-failure state, is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BridgeError::Trap(_) | BridgeError::OutOfBounds { .. }
        )
    }

    /// Wrap any error raised while loading as a `Load` error for `source`.
    ///
    /// Import mismatches keep their own variant so the UI can tell a version
    /// skew from a broken download.
    pub fn into_load_error(self, source: &str) -> BridgeError {
        match self {
            BridgeError::ImportMismatch { .. }
            | BridgeError::MissingExport(_)
            | BridgeError::Load { .. }
            | BridgeError::SessionFailed(_) => self,
            other => BridgeError::Load {
                source_ref: source.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
