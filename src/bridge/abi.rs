// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Host import ABI
//!
//! The interpreter treats the host as a peripheral: a source of bytes, time
//! and math, and a sink for output. Every function here is synchronous and
//! returns immediately.
//!
//! Interpreter builds disagree on the details. Function names vary
//! (`read_in` vs `read_input`, split `write_out`/`write_err` vs a single
//! `write_output`), as does the input buffer size, and some builds export
//! `setup`. The loader therefore negotiates an [`AbiProfile`] from the
//! module's manifest instead of linking one fixed import object: every
//! declared import is resolved by name and checked against the signature the
//! host implements, whatever namespace the module put it in.
//!
//! | Import | Signature | Host behavior |
//! |---|---|---|
//! | `time_now` | `() -> i64` | wall clock in the configured [`ClockUnit`] |
//! | `write` | any | legacy byte sink, no-op |
//! | `cos sin tan sqrt floor ceil trunc log exp` | `(f64) -> f64` | `f64` std |
//! | `pow atan2` | `(f64, f64) -> f64` | `f64` std |
//! | `set_allocator get_allocator free` | any | no-op, zero results |
//! | `read_in` | `(i32) -> i32` | pull input, configured capacity |
//! | `read_input` | `(i32, i32) -> i32` | pull input, capacity argument |
//! | `write_out` / `write_err` | `(i32, i32) -> ()` | push stdout / stderr |
//! | `write_output` | `(i32, i32) -> ()` | push stdout |

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::manifest::{EntityKind, ModuleManifest, Scalar, Signature};
use crate::bridge::marshal;
use crate::bridge::output::OutputKind;
use crate::bridge::state::HostState;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use wasmtime::{Caller, Engine, Extern, FuncType, Linker, Memory, Val, ValType};

/// Unit the linked interpreter expects from `time_now`.
///
/// Both variants count from the Unix epoch. Builds differ: some scale the
/// reading as nanoseconds, others as milliseconds, and nothing in the binary
/// says which, so it is a host setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockUnit {
    #[default]
    Nanoseconds,
    Milliseconds,
}

impl ClockUnit {
    pub fn now(self) -> i64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let reading = match self {
            ClockUnit::Nanoseconds => elapsed.as_nanos(),
            ClockUnit::Milliseconds => elapsed.as_millis(),
        };
        i64::try_from(reading).unwrap_or(i64::MAX)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClockUnit::Nanoseconds => "nanoseconds",
            ClockUnit::Milliseconds => "milliseconds",
        }
    }
}

/// Math primitives passed through to the host's `f64` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Cos,
    Sin,
    Tan,
    Sqrt,
    Floor,
    Ceil,
    Trunc,
    Log,
    Exp,
    Pow,
    Atan2,
}

impl MathFn {
    fn from_name(name: &str) -> Option<Self> {
        let math = match name {
            "cos" => MathFn::Cos,
            "sin" => MathFn::Sin,
            "tan" => MathFn::Tan,
            "sqrt" => MathFn::Sqrt,
            "floor" => MathFn::Floor,
            "ceil" => MathFn::Ceil,
            "trunc" => MathFn::Trunc,
            "log" => MathFn::Log,
            "exp" => MathFn::Exp,
            "pow" => MathFn::Pow,
            "atan2" => MathFn::Atan2,
            _ => return None,
        };
        Some(math)
    }

    fn unary(self) -> Option<fn(f64) -> f64> {
        let f: fn(f64) -> f64 = match self {
            MathFn::Cos => f64::cos,
            MathFn::Sin => f64::sin,
            MathFn::Tan => f64::tan,
            MathFn::Sqrt => f64::sqrt,
            MathFn::Floor => f64::floor,
            MathFn::Ceil => f64::ceil,
            MathFn::Trunc => f64::trunc,
            MathFn::Log => f64::ln,
            MathFn::Exp => f64::exp,
            MathFn::Pow | MathFn::Atan2 => return None,
        };
        Some(f)
    }

    fn binary(self) -> Option<fn(f64, f64) -> f64> {
        match self {
            MathFn::Pow => Some(f64::powf),
            MathFn::Atan2 => Some(f64::atan2),
            _ => None,
        }
    }
}

/// Pluggable-allocator seam the module may probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorHook {
    SetAllocator,
    GetAllocator,
    Free,
}

/// A host function the module can link against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostImport {
    Clock,
    RawWrite,
    Math(MathFn),
    Allocator(AllocatorHook),
    /// `read_in(ptr)`: capacity fixed by host configuration.
    PullInputFixed,
    /// `read_input(ptr, capacity)`.
    PullInputSized,
    PushStdout,
    PushStderr,
    /// `write_output(ptr, len)`: one stream, routed to stdout.
    PushCombined,
}

impl HostImport {
    /// Resolve an import by function name, regardless of namespace.
    pub fn resolve(name: &str) -> Option<Self> {
        let import = match name {
            "time_now" => HostImport::Clock,
            "write" => HostImport::RawWrite,
            "set_allocator" => HostImport::Allocator(AllocatorHook::SetAllocator),
            "get_allocator" => HostImport::Allocator(AllocatorHook::GetAllocator),
            "free" => HostImport::Allocator(AllocatorHook::Free),
            "read_in" => HostImport::PullInputFixed,
            "read_input" => HostImport::PullInputSized,
            "write_out" => HostImport::PushStdout,
            "write_err" => HostImport::PushStderr,
            "write_output" => HostImport::PushCombined,
            other => HostImport::Math(MathFn::from_name(other)?),
        };
        Some(import)
    }

    /// The signature the host implements; `None` accepts any scalar signature.
    pub fn expected_signature(&self) -> Option<Signature> {
        use Scalar::{F64, I32, I64};
        match self {
            HostImport::Clock => Some(Signature::new(&[], &[I64])),
            HostImport::RawWrite | HostImport::Allocator(_) => None,
            HostImport::Math(math) if math.binary().is_some() => Some(Signature::new(&[F64, F64], &[F64])),
            HostImport::Math(_) => Some(Signature::new(&[F64], &[F64])),
            HostImport::PullInputFixed => Some(Signature::new(&[I32], &[I32])),
            HostImport::PullInputSized => Some(Signature::new(&[I32, I32], &[I32])),
            HostImport::PushStdout | HostImport::PushStderr | HostImport::PushCombined => {
                Some(Signature::new(&[I32, I32], &[]))
            }
        }
    }
}

impl Display for HostImport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HostImport::Clock => write!(f, "clock"),
            HostImport::RawWrite => write!(f, "raw write sink (no-op)"),
            HostImport::Math(math) => write!(f, "math {:?}", math),
            HostImport::Allocator(hook) => write!(f, "allocator {:?} (no-op)", hook),
            HostImport::PullInputFixed => write!(f, "pull input (fixed capacity)"),
            HostImport::PullInputSized => write!(f, "pull input (sized)"),
            HostImport::PushStdout => write!(f, "push stdout"),
            HostImport::PushStderr => write!(f, "push stderr"),
            HostImport::PushCombined => write!(f, "push combined"),
        }
    }
}

/// How the module pulls its source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTransfer {
    /// The module never pulls input.
    None,
    Fixed { capacity: usize },
    Sized,
}

/// How the module pushes output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRouting {
    None,
    Split,
    Combined,
}

/// One resolved import: where the module expects it and what backs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub module: String,
    pub name: String,
    pub import: HostImport,
    pub signature: Signature,
}

/// The import object negotiated for one module binary.
#[derive(Debug, Clone)]
pub struct AbiProfile {
    pub bindings: Vec<ImportBinding>,
    pub input: InputTransfer,
    pub output: OutputRouting,
    pub has_setup: bool,
}

impl AbiProfile {
    /// Match every import the module declares against the host ABI.
    ///
    /// # Errors
    /// - `MissingExport` when `memory` or `run_file: () -> ()` is absent
    /// - `ImportMismatch` for unknown names, non-function imports, or a
    ///   signature the host does not implement
    pub fn negotiate(manifest: &ModuleManifest, input_capacity: usize) -> BridgeResult<Self> {
        let void = Signature::new(&[], &[]);
        if !manifest.exports_memory("memory") {
            return Err(BridgeError::MissingExport("memory".to_string()));
        }
        if !manifest.exports_function("run_file", &void) {
            return Err(BridgeError::MissingExport("run_file".to_string()));
        }

        let mut bindings = Vec::with_capacity(manifest.imports.len());
        for required in &manifest.imports {
            let mismatch = |reason: String| BridgeError::ImportMismatch {
                module: required.module.clone(),
                name: required.name.clone(),
                reason,
            };

            let EntityKind::Func(declared) = &required.kind else {
                return Err(mismatch(format!(
                    "host provides no {} imports",
                    required.kind.describe()
                )));
            };
            let import = HostImport::resolve(&required.name)
                .ok_or_else(|| mismatch("not provided by host".to_string()))?;
            let signature = declared
                .clone()
                .ok_or_else(|| mismatch("signature uses non-scalar types".to_string()))?;
            if let Some(expected) = import.expected_signature() {
                if expected != signature {
                    return Err(mismatch(format!(
                        "host implements {expected}, module declares {signature}"
                    )));
                }
            }

            bindings.push(ImportBinding {
                module: required.module.clone(),
                name: required.name.clone(),
                import,
                signature,
            });
        }

        let links = |wanted: HostImport| bindings.iter().any(|b| b.import == wanted);
        let input = if links(HostImport::PullInputSized) {
            InputTransfer::Sized
        } else if links(HostImport::PullInputFixed) {
            InputTransfer::Fixed {
                capacity: input_capacity,
            }
        } else {
            InputTransfer::None
        };
        let output = if links(HostImport::PushStdout) || links(HostImport::PushStderr) {
            OutputRouting::Split
        } else if links(HostImport::PushCombined) {
            OutputRouting::Combined
        } else {
            OutputRouting::None
        };

        Ok(Self {
            bindings,
            input,
            output,
            has_setup: manifest.exports_function("setup", &void),
        })
    }

    /// Human-readable summary, one line per binding plus the transfer modes.
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .bindings
            .iter()
            .map(|b| format!("{}.{} {} => {}", b.module, b.name, b.signature, b.import))
            .collect();
        lines.push(format!("input: {:?}", self.input));
        lines.push(format!("output: {:?}", self.output));
        lines.push(format!("setup: {}", if self.has_setup { "exported" } else { "absent" }));
        lines
    }

    /// Register a host function for every binding.
    pub fn link(&self, linker: &mut Linker<HostState>) -> BridgeResult<()> {
        let engine = linker.engine().clone();
        for binding in &self.bindings {
            define(linker, &engine, binding).map_err(|e| {
                BridgeError::Link(format!("{}.{}: {}", binding.module, binding.name, e))
            })?;
        }
        Ok(())
    }
}

fn define(linker: &mut Linker<HostState>, engine: &Engine, binding: &ImportBinding) -> wasmtime::Result<()> {
    let (module, name) = (binding.module.as_str(), binding.name.as_str());

    match binding.import {
        HostImport::Clock => {
            linker.func_wrap(module, name, |caller: Caller<'_, HostState>| -> i64 {
                caller.data().now()
            })?;
        }
        HostImport::RawWrite | HostImport::Allocator(_) => {
            define_noop(linker, engine, binding)?;
        }
        HostImport::Math(math) => {
            if let Some(f) = math.binary() {
                linker.func_wrap(module, name, move |x: f64, y: f64| -> f64 { f(x, y) })?;
            } else if let Some(f) = math.unary() {
                linker.func_wrap(module, name, move |x: f64| -> f64 { f(x) })?;
            }
        }
        HostImport::PullInputFixed => {
            linker.func_wrap(
                module,
                name,
                |caller: Caller<'_, HostState>, ptr: i32| -> wasmtime::Result<i32> {
                    let capacity = caller.data().input_capacity();
                    pull_input(caller, ptr, capacity)
                },
            )?;
        }
        HostImport::PullInputSized => {
            linker.func_wrap(
                module,
                name,
                |caller: Caller<'_, HostState>, ptr: i32, capacity: i32| -> wasmtime::Result<i32> {
                    pull_input(caller, ptr, capacity.max(0) as usize)
                },
            )?;
        }
        HostImport::PushStdout | HostImport::PushCombined => {
            linker.func_wrap(
                module,
                name,
                |caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
                    push_output(caller, ptr, len, OutputKind::Stdout)
                },
            )?;
        }
        HostImport::PushStderr => {
            linker.func_wrap(
                module,
                name,
                |caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
                    push_output(caller, ptr, len, OutputKind::Stderr)
                },
            )?;
        }
    }

    Ok(())
}

/// Accept whatever scalar signature the module declared and return zeroes.
fn define_noop(linker: &mut Linker<HostState>, engine: &Engine, binding: &ImportBinding) -> wasmtime::Result<()> {
    let signature = &binding.signature;
    let ty = FuncType::new(
        engine,
        signature.params.iter().map(|s| val_type(*s)),
        signature.results.iter().map(|s| val_type(*s)),
    );
    let results = signature.results.clone();

    linker.func_new(
        &binding.module,
        &binding.name,
        ty,
        move |_caller, _params, out| {
            for (slot, scalar) in out.iter_mut().zip(&results) {
                *slot = zero(*scalar);
            }
            Ok(())
        },
    )?;
    Ok(())
}

fn val_type(scalar: Scalar) -> ValType {
    match scalar {
        Scalar::I32 => ValType::I32,
        Scalar::I64 => ValType::I64,
        Scalar::F32 => ValType::F32,
        Scalar::F64 => ValType::F64,
    }
}

fn zero(scalar: Scalar) -> Val {
    match scalar {
        Scalar::I32 => Val::I32(0),
        Scalar::I64 => Val::I64(0),
        Scalar::F32 => Val::F32(0),
        Scalar::F64 => Val::F64(0),
    }
}

/// Module pointers are unsigned offsets carried in an `i32`.
fn offset(value: i32) -> usize {
    value as u32 as usize
}

fn caller_memory(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<Memory> {
    if let Some(memory) = caller.data().memory() {
        return Ok(memory);
    }
    let memory = caller
        .get_export("memory")
        .and_then(Extern::into_memory)
        .ok_or_else(|| BridgeError::MissingExport("memory".to_string()))?;
    caller.data_mut().attach_memory(memory);
    Ok(memory)
}

fn pull_input(mut caller: Caller<'_, HostState>, ptr: i32, capacity: usize) -> wasmtime::Result<i32> {
    let memory = caller_memory(&mut caller)?;
    let (bytes, state) = memory.data_and_store_mut(&mut caller);

    let Some(input) = state.take_input() else {
        return Ok(0);
    };
    let written = marshal::write_into(bytes, offset(ptr), capacity, input.text())?;
    state.record_pull(written, input.len());

    Ok(written as i32)
}

fn push_output(mut caller: Caller<'_, HostState>, ptr: i32, len: i32, kind: OutputKind) -> wasmtime::Result<()> {
    let memory = caller_memory(&mut caller)?;
    let (bytes, state) = memory.data_and_store_mut(&mut caller);

    let text = marshal::read_from(bytes, offset(ptr), offset(len))?;
    state.emit(kind, text);
    Ok(())
}
