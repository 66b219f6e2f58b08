// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types live under `messages`, organized by subsystem. They follow a
//! struct-based pattern with a `Display` implementation:
//!
//! * No magic strings scattered through the bridge and channel code
//! * Consistent wording between log sites that describe the same event
//! * Typed fields for subscribers through [`messages::StructuredLog`]
//!
//! # Usage
//!
//! ```rust
//! use loxi_host::observability::messages::bridge::ModuleLoadFailed;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
//! let msg = ModuleLoadFailed {
//!     source: "loxi.wasm",
//!     error: &error,
//! };
//!
//! tracing::error!("{}", msg);
//! ```
//!
//! The CLI installs a `tracing-subscriber` fmt layer writing to stderr; see
//! [`init_logging`].

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is harmless; the
/// second install is ignored.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
