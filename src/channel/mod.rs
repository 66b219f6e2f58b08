// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution channels
//!
//! A channel decides where the interpreter runs relative to the UI:
//!
//! * [`InlineChannel`] calls `run_file` on the caller's task. Output is
//!   complete by the time `submit` returns, and the caller is blocked for the
//!   whole call.
//! * [`IsolatedChannel`] owns a `lox-worker` thread holding the loader and
//!   the instance. `submit` only enqueues; messages stream back as the
//!   module produces them.
//!
//! Both serve requests one at a time in submission order.

mod core;
mod inline;
mod isolated;
mod message;

#[cfg(test)]
mod integration_tests;

pub use self::core::{ExecutionCore, ModuleSlot};
pub use inline::InlineChannel;
pub use isolated::{IsolatedChannel, WORKER_THREAD_NAME};
pub use message::{WorkerMessage, WorkerRequest};

use crate::bridge::error::BridgeResult;
use crate::bridge::loader::ModuleLoader;
use crate::config::HostConfig;
use crate::traits::ExecutionChannel;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

/// Where the module runs relative to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    Inline,
    #[default]
    Isolated,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Inline => "inline",
            Topology::Isolated => "isolated",
        }
    }
}

impl Display for Topology {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the instance behind a channel.
///
/// `Uninitialized -> Loading -> Ready <-> Executing`, with `Failed` terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Uninitialized,
    Loading,
    Ready,
    Executing,
    Failed,
}

impl ChannelState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelState::Uninitialized => "Uninitialized",
            ChannelState::Loading => "Loading",
            ChannelState::Ready => "Ready",
            ChannelState::Executing => "Executing",
            ChannelState::Failed => "Failed",
        }
    }
}

/// Open the channel the configuration asks for.
///
/// Nothing is loaded yet; the module is fetched on the first request.
pub fn open(config: &HostConfig) -> BridgeResult<Box<dyn ExecutionChannel>> {
    let loader = ModuleLoader::from_config(config);
    let channel: Box<dyn ExecutionChannel> = match config.topology {
        Topology::Inline => Box::new(InlineChannel::new(loader)),
        Topology::Isolated => Box::new(IsolatedChannel::spawn(loader)?),
    };
    Ok(channel)
}
