// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module Loading and Instantiation
//!
//! This module turns a module source into the single live [`LoxInstance`]:
//! - Fetch the binary from the filesystem or over HTTP(S)
//! - Validate its size and encoding
//! - Negotiate the import ABI against the binary's manifest
//! - Compile, link and instantiate with wasmtime
//! - Invoke `setup` once, when the module exports it
//!
//! Every failure here is fatal for the session. Idempotence (one load per
//! session, one `setup` per instance) is owned by the execution core, not the
//! loader; calling [`ModuleLoader::load`] twice builds two instances.

use crate::bridge::abi::{AbiProfile, ClockUnit};
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::manifest::ModuleManifest;
use crate::bridge::output::{ExecutionId, ExecutionRequest};
use crate::bridge::state::{CallStats, HostState};
use crate::config::HostConfig;
use crate::observability::messages::bridge::{
    ExecutionCompleted, ExecutionStarted, ExecutionTrapped, ImportsNegotiated, ModuleLoadFailed,
    ModuleLoaded, SetupInvoked,
};
use crate::observability::messages::StructuredLog;
use crate::traits::OutputSink;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wasmtime::{
    Config, Engine, Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams, WasmResults,
};

/// Maximum allowed module size (16 MB)
pub const MAX_MODULE_SIZE: usize = 16 * 1024 * 1024;

/// Where the interpreter binary comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Path(PathBuf),
    Url(String),
}

impl ModuleSource {
    /// `http://` and `https://` references are URLs; anything else is a path.
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            ModuleSource::Url(reference.to_string())
        } else {
            ModuleSource::Path(PathBuf::from(reference))
        }
    }
}

impl Display for ModuleSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleSource::Path(path) => write!(f, "{}", path.display()),
            ModuleSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Create a wasmtime engine for the interpreter.
///
/// No fuel and no epoch interruption: a `run_file` call is never preempted.
/// Proposals the host ABI cannot serve are switched off so a binary that
/// depends on them fails at compile time instead of at the first call.
fn create_engine() -> BridgeResult<Engine> {
    let mut config = Config::new();

    config.wasm_threads(false);
    config.wasm_multi_memory(false);
    config.wasm_memory64(false);
    config.wasm_component_model(false);
    config.consume_fuel(false);
    config.epoch_interruption(false);

    Engine::new(&config).map_err(|e| BridgeError::Engine(e.to_string()))
}

/// Fetches, validates and instantiates the interpreter module.
#[derive(Debug, Clone)]
pub struct ModuleLoader {
    source: ModuleSource,
    input_capacity: usize,
    clock: ClockUnit,
}

impl ModuleLoader {
    pub fn new(source: ModuleSource, input_capacity: usize, clock: ClockUnit) -> Self {
        Self {
            source,
            input_capacity,
            clock,
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(
            ModuleSource::parse(&config.module.source),
            config.abi.input_capacity,
            config.abi.clock_unit,
        )
    }

    pub fn source(&self) -> &ModuleSource {
        &self.source
    }

    /// Read the binary and enforce the size limit.
    pub async fn fetch(&self) -> BridgeResult<Vec<u8>> {
        let bytes = match &self.source {
            ModuleSource::Path(path) => {
                let size = tokio::fs::metadata(path).await?.len() as usize;
                check_size(size)?;
                tokio::fs::read(path).await?
            }
            ModuleSource::Url(url) => {
                let response = reqwest::get(url.as_str()).await?.error_for_status()?;
                if let Some(length) = response.content_length() {
                    check_size(length as usize)?;
                }
                response.bytes().await?.to_vec()
            }
        };
        check_size(bytes.len())?;

        tracing::info!(
            "{}",
            ModuleLoaded {
                source: &self.source.to_string(),
                size_bytes: bytes.len(),
            }
        );
        Ok(bytes)
    }

    /// Fetch and negotiate without instantiating.
    pub async fn inspect(&self) -> BridgeResult<AbiProfile> {
        let result = match self.fetch().await {
            Ok(bytes) => ModuleManifest::parse(&bytes)
                .and_then(|manifest| AbiProfile::negotiate(&manifest, self.input_capacity)),
            Err(e) => Err(e),
        };
        result.map_err(|e| self.load_failed(e))
    }

    /// Build a live instance whose output goes to `sink`.
    ///
    /// # Errors
    /// Every error is fatal. Import negotiation failures surface as
    /// `ImportMismatch` or `MissingExport`; everything else as `Load`.
    pub async fn load(&self, sink: Arc<dyn OutputSink>) -> BridgeResult<LoxInstance> {
        let result = match self.fetch().await {
            Ok(bytes) => self.instantiate(&bytes, sink),
            Err(e) => Err(e),
        };
        result.map_err(|e| self.load_failed(e))
    }

    /// Instantiate an already fetched binary.
    pub fn instantiate(&self, bytes: &[u8], sink: Arc<dyn OutputSink>) -> BridgeResult<LoxInstance> {
        let source = self.source.to_string();

        let manifest = ModuleManifest::parse(bytes)?;
        let profile = AbiProfile::negotiate(&manifest, self.input_capacity)?;
        tracing::info!(
            "{}",
            ImportsNegotiated {
                source: &source,
                import_count: profile.bindings.len(),
                input: &format!("{:?}", profile.input),
                output: &format!("{:?}", profile.output),
            }
        );

        let engine = create_engine()?;
        let module = Module::new(&engine, bytes).map_err(|e| BridgeError::Load {
            source_ref: source.clone(),
            reason: format!("compile failed: {e}"),
        })?;

        let mut linker = Linker::new(&engine);
        profile.link(&mut linker)?;

        let state = HostState::new(sink, self.clock, self.input_capacity);
        let mut store = Store::new(&engine, state);
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| BridgeError::Load {
                source_ref: source.clone(),
                reason: format!("instantiation failed: {e}"),
            })?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| BridgeError::MissingExport("memory".to_string()))?;
        store.data_mut().attach_memory(memory);
        let run_file = instance
            .get_typed_func::<(), ()>(&mut store, "run_file")
            .map_err(|_| BridgeError::MissingExport("run_file".to_string()))?;

        let has_setup = profile.has_setup;
        let mut lox = LoxInstance {
            store,
            instance,
            run_file,
            memory,
            profile,
            source,
        };

        if has_setup {
            lox.call_export::<(), ()>("setup", ())
                .map_err(|e| match e {
                    BridgeError::MissingExport(_) => e,
                    other => BridgeError::Load {
                        source_ref: lox.source.clone(),
                        reason: format!("setup trapped: {other}"),
                    },
                })?;
            tracing::debug!("{}", SetupInvoked { source: &lox.source });
        }

        Ok(lox)
    }

    fn load_failed(&self, error: BridgeError) -> BridgeError {
        let source = self.source.to_string();
        let error = error.into_load_error(&source);
        tracing::error!(
            "{}",
            ModuleLoadFailed {
                source: &source,
                error: &error,
            }
        );
        error
    }
}

fn check_size(size: usize) -> BridgeResult<()> {
    if size > MAX_MODULE_SIZE {
        return Err(BridgeError::TooLarge {
            size,
            max: MAX_MODULE_SIZE,
        });
    }
    Ok(())
}

/// Result of one completed `run_file` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub id: ExecutionId,
    pub stats: CallStats,
    /// Linear memory size after the call.
    pub memory_bytes: usize,
    pub duration: Duration,
}

/// The single live interpreter instance.
///
/// Owns the store, and through it the linear memory. Not `Clone`; exactly one
/// exists per execution core.
pub struct LoxInstance {
    store: Store<HostState>,
    instance: Instance,
    run_file: TypedFunc<(), ()>,
    memory: Memory,
    profile: AbiProfile,
    source: String,
}

impl LoxInstance {
    /// Run one request to completion.
    ///
    /// The request's source is staged for the module's pull-input call and
    /// discarded when `run_file` returns, whether or not it was pulled.
    ///
    /// # Errors
    /// `Trap` or `OutOfBounds` when the call faults. The instance remains
    /// usable afterwards.
    pub fn run(&mut self, request: ExecutionRequest) -> BridgeResult<ExecutionReport> {
        let id = request.id;
        let started = ExecutionStarted {
            source: &self.source,
            execution_id: id.0,
            input_size: request.code.len(),
        };
        started.log();
        let span = started.span("lox");
        let _entered = span.enter();

        let start = Instant::now();
        self.store.data_mut().begin(request);
        let outcome = self.run_file.call(&mut self.store, ());
        let stats = self.store.data_mut().finish();
        let duration = start.elapsed();

        match outcome {
            Ok(()) => {
                let memory_bytes = self.memory_size();
                ExecutionCompleted {
                    execution_id: id.0,
                    bytes_pulled: stats.bytes_pulled,
                    events_emitted: stats.events_emitted,
                    memory_bytes,
                    duration,
                }
                .log();
                Ok(ExecutionReport {
                    id,
                    stats,
                    memory_bytes,
                    duration,
                })
            }
            Err(e) => {
                let error = call_error(e);
                tracing::warn!(
                    "{}",
                    ExecutionTrapped {
                        execution_id: id.0,
                        error: &error,
                    }
                );
                Err(error)
            }
        }
    }

    /// Call an auxiliary export outside of any request.
    ///
    /// Output pushed during such a call is dropped.
    pub(crate) fn call_export<Params, Results>(&mut self, name: &str, params: Params) -> BridgeResult<Results>
    where
        Params: WasmParams,
        Results: WasmResults,
    {
        let func = self
            .instance
            .get_typed_func::<Params, Results>(&mut self.store, name)
            .map_err(|_| BridgeError::MissingExport(name.to_string()))?;
        func.call(&mut self.store, params).map_err(call_error)
    }

    pub fn profile(&self) -> &AbiProfile {
        &self.profile
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current size of linear memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }
}

/// Recover the host error behind a trap, if a host function raised it.
fn call_error(error: wasmtime::Error) -> BridgeError {
    match error.downcast::<BridgeError>() {
        Ok(bridge @ BridgeError::OutOfBounds { .. }) => bridge,
        Ok(other) => BridgeError::Trap(other.to_string()),
        Err(error) => BridgeError::Trap(format!("{error:#}")),
    }
}
