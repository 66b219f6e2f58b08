// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module manifest introspection
//!
//! Reads a WASM binary with wasmparser and records what the module declares
//! before anything is compiled: its encoding, every required import with its
//! function signature, and its exports. The loader negotiates the host ABI
//! from this manifest, so an import the host cannot satisfy is reported by
//! name instead of as an opaque instantiation failure.

use crate::bridge::error::{BridgeError, BridgeResult, WASM_UNSUPPORTED_ENCODING};
use std::fmt::{Display, Formatter};
use wasmparser::{Encoding, ExternalKind, FuncType, Parser, Payload, TypeRef, ValType};

/// Numeric value types the host ABI can carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scalar {
    I32,
    I64,
    F32,
    F64,
}

impl Scalar {
    fn from_val_type(ty: &ValType) -> Option<Self> {
        match ty {
            ValType::I32 => Some(Scalar::I32),
            ValType::I64 => Some(Scalar::I64),
            ValType::F32 => Some(Scalar::F32),
            ValType::F64 => Some(Scalar::F64),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scalar::I32 => "i32",
            Scalar::I64 => "i64",
            Scalar::F32 => "f32",
            Scalar::F64 => "f64",
        }
    }
}

/// A function signature restricted to scalar types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Scalar>,
    pub results: Vec<Scalar>,
}

impl Signature {
    pub fn new(params: &[Scalar], results: &[Scalar]) -> Self {
        Self {
            params: params.to_vec(),
            results: results.to_vec(),
        }
    }

    /// Convert a wasmparser type; `None` when any slot is a vector or reference type.
    fn from_func_type(ty: &FuncType) -> Option<Self> {
        let params = ty
            .params()
            .iter()
            .map(Scalar::from_val_type)
            .collect::<Option<Vec<_>>>()?;
        let results = ty
            .results()
            .iter()
            .map(Scalar::from_val_type)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { params, results })
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let join = |types: &[Scalar]| {
            types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "({}) -> ({})", join(&self.params), join(&self.results))
    }
}

/// What kind of entity an import or export refers to.
///
/// Function signatures are `None` when they use types outside [`Scalar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Func(Option<Signature>),
    Memory,
    Table,
    Global,
    Tag,
}

impl EntityKind {
    pub fn describe(&self) -> &'static str {
        match self {
            EntityKind::Func(_) => "function",
            EntityKind::Memory => "memory",
            EntityKind::Table => "table",
            EntityKind::Global => "global",
            EntityKind::Tag => "tag",
        }
    }
}

/// One import the module requires before it can be instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredImport {
    pub module: String,
    pub name: String,
    pub kind: EntityKind,
}

/// One export the module provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExport {
    pub name: String,
    pub kind: EntityKind,
}

/// Imports and exports declared by a core WASM module.
#[derive(Debug, Clone, Default)]
pub struct ModuleManifest {
    pub imports: Vec<RequiredImport>,
    pub exports: Vec<ModuleExport>,
}

impl ModuleManifest {
    /// Parse the manifest of a core WASM module.
    ///
    /// # Errors
    /// - the input is empty, truncated or otherwise invalid
    /// - the binary is a component-model component
    pub fn parse(bytes: &[u8]) -> BridgeResult<Self> {
        let mut saw_version = false;
        let mut types: Vec<Option<Signature>> = Vec::new();
        // Type index of every function in the function index space, imports first.
        let mut function_types: Vec<u32> = Vec::new();
        let mut imports = Vec::new();
        let mut raw_exports: Vec<(String, ExternalKind, u32)> = Vec::new();

        for payload in Parser::new(0).parse_all(bytes) {
            match payload? {
                Payload::Version { encoding, .. } => {
                    if matches!(encoding, Encoding::Component) {
                        return Err(BridgeError::UnsupportedEncoding(
                            WASM_UNSUPPORTED_ENCODING.to_string(),
                        ));
                    }
                    saw_version = true;
                }
                Payload::TypeSection(reader) => {
                    for func_type in reader.into_iter_err_on_gc_types() {
                        types.push(Signature::from_func_type(&func_type?));
                    }
                }
                Payload::ImportSection(reader) => {
                    for import in reader {
                        let import = import?;
                        let kind = match import.ty {
                            TypeRef::Func(type_index) => {
                                function_types.push(type_index);
                                EntityKind::Func(types.get(type_index as usize).cloned().flatten())
                            }
                            TypeRef::Memory(_) => EntityKind::Memory,
                            TypeRef::Table(_) => EntityKind::Table,
                            TypeRef::Global(_) => EntityKind::Global,
                            TypeRef::Tag(_) => EntityKind::Tag,
                        };
                        imports.push(RequiredImport {
                            module: import.module.to_string(),
                            name: import.name.to_string(),
                            kind,
                        });
                    }
                }
                Payload::FunctionSection(reader) => {
                    for type_index in reader {
                        function_types.push(type_index?);
                    }
                }
                Payload::ExportSection(reader) => {
                    for export in reader {
                        let export = export?;
                        raw_exports.push((export.name.to_string(), export.kind, export.index));
                    }
                }
                _ => {}
            }
        }

        if !saw_version {
            return Err(BridgeError::UnsupportedEncoding(
                "Invalid WASM binary: missing header".to_string(),
            ));
        }

        let exports = raw_exports
            .into_iter()
            .map(|(name, kind, index)| {
                let kind = match kind {
                    ExternalKind::Func => EntityKind::Func(
                        function_types
                            .get(index as usize)
                            .and_then(|type_index| types.get(*type_index as usize))
                            .cloned()
                            .flatten(),
                    ),
                    ExternalKind::Memory => EntityKind::Memory,
                    ExternalKind::Table => EntityKind::Table,
                    ExternalKind::Global => EntityKind::Global,
                    ExternalKind::Tag => EntityKind::Tag,
                };
                ModuleExport { name, kind }
            })
            .collect();

        Ok(Self { imports, exports })
    }

    /// Look up an export by name.
    pub fn export(&self, name: &str) -> Option<&ModuleExport> {
        self.exports.iter().find(|export| export.name == name)
    }

    /// Whether `name` is exported as a function with exactly `signature`.
    pub fn exports_function(&self, name: &str, signature: &Signature) -> bool {
        matches!(
            self.export(name),
            Some(ModuleExport { kind: EntityKind::Func(Some(sig)), .. }) if sig == signature
        )
    }

    /// Whether `name` is exported as a memory.
    pub fn exports_memory(&self, name: &str) -> bool {
        matches!(
            self.export(name),
            Some(ModuleExport {
                kind: EntityKind::Memory,
                ..
            })
        )
    }
}
