// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod execution_channel;
pub mod output_sink;

pub use execution_channel::ExecutionChannel;
pub use output_sink::OutputSink;
