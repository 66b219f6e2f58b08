// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;

pub use crate::bridge::error::{BridgeError, BridgeResult};
pub use config::{ConfigError, ConfigResult};
