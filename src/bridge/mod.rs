// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Host bridge for the Lox interpreter module
//!
//! Everything that touches the module directly lives here: marshaling
//! strings across linear memory, the host import ABI, manifest inspection,
//! and loading a binary into a live [`loader::LoxInstance`].

pub mod abi;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod marshal;
pub mod output;
pub mod state;

#[cfg(test)]
pub(crate) mod fixtures;

pub use abi::{AbiProfile, ClockUnit};
pub use error::{BridgeError, BridgeResult};
pub use loader::{ExecutionReport, LoxInstance, ModuleLoader, ModuleSource};
pub use output::{ExecutionId, ExecutionRequest, OutputEvent, OutputKind};
