// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test modules standing in for the interpreter binary.
//!
//! Each fixture links against one variant of the host ABI. "Echo" fixtures
//! push the pulled source straight back out, which makes output ordering and
//! truncation observable without a real interpreter.

use crate::bridge::output::{ExecutionId, OutputEvent};
use crate::traits::OutputSink;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Legacy split ABI: `read_in(ptr)` with a fixed host capacity, separate
/// stdout/stderr pushes.
pub const ECHO_SPLIT: &str = r#"
(module
  (import "odin_env" "write" (func $write (param i32)))
  (import "odin_env" "time_now" (func $time_now (result i64)))
  (import "dom_interface" "read_in" (func $read_in (param i32) (result i32)))
  (import "dom_interface" "write_out" (func $write_out (param i32 i32)))
  (import "dom_interface" "write_err" (func $write_err (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "run_file")
    (local $n i32)
    (local.set $n (call $read_in (i32.const 1024)))
    (call $write_out (i32.const 1024) (local.get $n))))
"#;

/// Sized combined ABI: `read_input(ptr, cap)` with an 8 byte capacity, one
/// combined push, and a `setup` export that counts its invocations.
pub const SIZED_COMBINED: &str = r#"
(module
  (import "odin_env" "time_now" (func $time_now (result i64)))
  (import "dom_interface" "read_input" (func $read_input (param i32 i32) (result i32)))
  (import "dom_interface" "write_output" (func $write_output (param i32 i32)))
  (memory (export "memory") 1)
  (global $setups (mut i32) (i32.const 0))
  (func (export "setup")
    (global.set $setups (i32.add (global.get $setups) (i32.const 1))))
  (func (export "setup_calls") (result i32)
    (global.get $setups))
  (func (export "run_file")
    (local $n i32)
    (local.set $n (call $read_input (i32.const 2048) (i32.const 8)))
    (call $write_output (i32.const 2048) (local.get $n))))
"#;

/// Pulls with a negative capacity, then pulls again, keeping both counts.
pub const NEGATIVE_CAPACITY: &str = r#"
(module
  (import "dom_interface" "read_input" (func $read_input (param i32 i32) (result i32)))
  (import "dom_interface" "write_output" (func $write_output (param i32 i32)))
  (memory (export "memory") 1)
  (global $first (mut i32) (i32.const -1))
  (global $second (mut i32) (i32.const -1))
  (func (export "first_pull") (result i32)
    (global.get $first))
  (func (export "second_pull") (result i32)
    (global.get $second))
  (func (export "run_file")
    (global.set $first (call $read_input (i32.const 100) (i32.const -1)))
    (global.set $second (call $read_input (i32.const 200) (i32.const 16)))))
"#;

/// Pushes "one " to stdout, "two " to stderr, then "three" to stdout.
pub const INTERLEAVED: &str = r#"
(module
  (import "dom_interface" "write_out" (func $write_out (param i32 i32)))
  (import "dom_interface" "write_err" (func $write_err (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "one ")
  (data (i32.const 16) "two ")
  (data (i32.const 32) "three")
  (func (export "run_file")
    (call $write_out (i32.const 0) (i32.const 4))
    (call $write_err (i32.const 16) (i32.const 4))
    (call $write_out (i32.const 32) (i32.const 5))))
"#;

/// Reports an interpreter error on stderr, the way a parse failure would.
pub const STDERR_ONLY: &str = r#"
(module
  (import "dom_interface" "write_err" (func $write_err (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "[line 1] Error at end: Expect ';' after value.\n")
  (func (export "run_file")
    (call $write_err (i32.const 0) (i32.const 47))))
"#;

/// Exposes the host clock through an extra export.
pub const CLOCK_PROBE: &str = r#"
(module
  (import "odin_env" "time_now" (func $time_now (result i64)))
  (memory (export "memory") 1)
  (func (export "run_file"))
  (func (export "clock_probe") (result i64)
    (call $time_now)))
"#;

/// Links the math primitives and allocator hooks.
pub const MATH_AND_ALLOCATOR: &str = r#"
(module
  (import "env" "sqrt" (func $sqrt (param f64) (result f64)))
  (import "env" "pow" (func $pow (param f64 f64) (result f64)))
  (import "env" "atan2" (func $atan2 (param f64 f64) (result f64)))
  (import "env" "floor" (func $floor (param f64) (result f64)))
  (import "env" "set_allocator" (func $set_allocator (param i32 i32)))
  (import "env" "get_allocator" (func $get_allocator (result i32)))
  (import "env" "free" (func $free (param i32)))
  (memory (export "memory") 1)
  (func (export "run_file"))
  (func (export "hypot") (param $x f64) (param $y f64) (result f64)
    (call $sqrt
      (f64.add
        (call $pow (local.get $x) (f64.const 2))
        (call $pow (local.get $y) (f64.const 2)))))
  (func (export "angle") (param $y f64) (param $x f64) (result f64)
    (call $atan2 (local.get $y) (local.get $x)))
  (func (export "floored") (param $x f64) (result f64)
    (call $floor (local.get $x)))
  (func (export "allocator") (result i32)
    (call $set_allocator (i32.const 7) (i32.const 9))
    (call $free (i32.const 16))
    (call $get_allocator)))
"#;

/// Spins on the clock for 300 units before pushing "done".
pub const SLOW: &str = r#"
(module
  (import "odin_env" "time_now" (func $time_now (result i64)))
  (import "dom_interface" "write_out" (func $write_out (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "done")
  (func (export "run_file")
    (local $start i64)
    (local.set $start (call $time_now))
    (block $exit
      (loop $spin
        (br_if $exit
          (i64.ge_s
            (i64.sub (call $time_now) (local.get $start))
            (i64.const 300)))
        (br $spin)))
    (call $write_out (i32.const 0) (i32.const 4))))
"#;

/// Traps on every call.
pub const TRAPS: &str = r#"
(module
  (import "dom_interface" "write_out" (func $write_out (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "before")
  (func (export "run_file")
    (call $write_out (i32.const 0) (i32.const 6))
    unreachable))
"#;

/// Hands the host a pointer past the end of its one-page memory.
pub const BAD_POINTER: &str = r#"
(module
  (import "dom_interface" "write_out" (func $write_out (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "run_file")
    (call $write_out (i32.const 65534) (i32.const 16))))
"#;

/// Requires an import the host does not provide.
pub const UNKNOWN_IMPORT: &str = r#"
(module
  (import "dom_interface" "open_socket" (func $open_socket (param i32) (result i32)))
  (memory (export "memory") 1)
  (func (export "run_file")))
"#;

/// Declares `write_out` with a signature the host does not implement.
pub const WRONG_SIGNATURE: &str = r#"
(module
  (import "dom_interface" "write_out" (func $write_out (param i64)))
  (memory (export "memory") 1)
  (func (export "run_file")))
"#;

/// Expects the host to supply linear memory (and re-exports it).
pub const IMPORTS_MEMORY: &str = r#"
(module
  (import "env" "memory" (memory 1))
  (export "memory" (memory 0))
  (func (export "run_file")))
"#;

/// Has no `run_file` entry point.
pub const NO_RUN_FILE: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "main")))
"#;

/// Compile a fixture to binary.
pub fn wasm(wat_source: &str) -> Vec<u8> {
    wat::parse_str(wat_source).expect("fixture must be valid WAT")
}

/// Write a compiled fixture to a temp file the loader can read.
pub fn module_file(wat_source: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".wasm")
        .tempfile()
        .expect("create temp module");
    file.write_all(&wasm(wat_source)).expect("write temp module");
    file.flush().expect("flush temp module");
    file
}

/// Sink that records every event with its request id.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(ExecutionId, OutputEvent)>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(ExecutionId, OutputEvent)> {
        self.events.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingSink {
    fn emit(&self, id: ExecutionId, event: OutputEvent) {
        self.events.lock().unwrap().push((id, event));
    }
}
