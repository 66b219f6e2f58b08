// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Module reference used when neither the config file nor the CLI names one
pub const DEFAULT_MODULE_SOURCE: &str = "loxi.wasm";
/// Capacity handed to the legacy `read_in(ptr)` import (worker builds)
pub const DEFAULT_INPUT_CAPACITY: usize = 4096;
/// Largest accepted `read_in` capacity (1 MiB)
pub const MAX_INPUT_CAPACITY: usize = 1024 * 1024;
/// Tracing filter applied when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";
