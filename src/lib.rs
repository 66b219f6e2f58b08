// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod bridge;     // module loading, ABI, memory marshaling
pub mod channel;    // inline and isolated execution
pub mod config;     // host configuration
pub mod console;    // output surface and UI entry points
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // unified abstractions
