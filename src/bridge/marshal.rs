// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Linear memory marshaling between host strings and module byte ranges.
//!
//! Both directions operate on a plain byte slice (the module's memory as
//! returned by `Memory::data`/`data_mut`) so they can be used from inside host
//! functions without holding on to the store.

use crate::bridge::error::{BridgeError, BridgeResult};

/// Copy at most `capacity` UTF-8 bytes of `text` into `memory[ptr..]`.
///
/// Returns the number of bytes written. Input longer than `capacity` is cut at
/// the byte boundary without raising; the cut may land inside a multi-byte
/// character. A destination range that does not fit in `memory` is an error.
pub fn write_into(memory: &mut [u8], ptr: usize, capacity: usize, text: &str) -> BridgeResult<usize> {
    let bytes = text.as_bytes();
    let count = bytes.len().min(capacity);

    let end = ptr.checked_add(count).filter(|end| *end <= memory.len());
    let Some(end) = end else {
        return Err(BridgeError::OutOfBounds {
            ptr,
            len: count,
            memory_size: memory.len(),
        });
    };

    memory[ptr..end].copy_from_slice(&bytes[..count]);
    Ok(count)
}

/// Decode `memory[ptr..ptr + len)` as UTF-8, replacing malformed sequences
/// with U+FFFD.
pub fn read_from(memory: &[u8], ptr: usize, len: usize) -> BridgeResult<String> {
    let end = ptr.checked_add(len).filter(|end| *end <= memory.len());
    let Some(end) = end else {
        return Err(BridgeError::OutOfBounds {
            ptr,
            len,
            memory_size: memory.len(),
        });
    };

    Ok(String::from_utf8_lossy(&memory[ptr..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_under_capacity() {
        let mut memory = vec![0u8; 4096];
        let inputs = ["print 1;", "", "var s = \"héllo wörld\";\nprint s;", "fun f() { return \"日本\"; }"];

        for input in inputs {
            let written = write_into(&mut memory, 128, 1024, input).unwrap();
            assert_eq!(written, input.len());
            assert_eq!(read_from(&memory, 128, written).unwrap(), input);
        }
    }

    #[test]
    fn test_truncates_to_exact_capacity() {
        let mut memory = vec![0u8; 4096];
        let input = "x".repeat(1500);

        let written = write_into(&mut memory, 0, 1024, &input).unwrap();
        assert_eq!(written, 1024);
        assert_eq!(read_from(&memory, 0, written).unwrap(), "x".repeat(1024));
    }

    #[test]
    fn test_never_writes_past_capacity() {
        let mut memory = vec![0xAAu8; 64];

        let written = write_into(&mut memory, 8, 4, "abcdefgh").unwrap();
        assert_eq!(written, 4);
        assert_eq!(&memory[8..12], b"abcd");
        assert!(memory[12..].iter().all(|b| *b == 0xAA));
        assert!(memory[..8].iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn test_truncation_may_split_multibyte_char() {
        let mut memory = vec![0u8; 16];

        // 'é' is two bytes; a capacity of 2 keeps "h" plus half of 'é'.
        let written = write_into(&mut memory, 0, 2, "hé").unwrap();
        assert_eq!(written, 2);
        assert_eq!(read_from(&memory, 0, written).unwrap(), "h\u{FFFD}");
    }

    #[test]
    fn test_read_is_permissive_on_malformed_utf8() {
        let memory = [b'o', b'k', 0xFF, 0xFE, b'!'];
        let text = read_from(&memory, 0, memory.len()).unwrap();
        assert_eq!(text, "ok\u{FFFD}\u{FFFD}!");
    }

    #[test]
    fn test_out_of_bounds_write_is_rejected() {
        let mut memory = vec![0u8; 16];
        let result = write_into(&mut memory, 14, 8, "abcdef");

        match result {
            Err(BridgeError::OutOfBounds { ptr, len, memory_size }) => {
                assert_eq!(ptr, 14);
                assert_eq!(len, 6);
                assert_eq!(memory_size, 16);
            }
            other => panic!("Expected OutOfBounds, got {other:?}"),
        }
        assert!(memory.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_out_of_bounds_read_is_rejected() {
        let memory = vec![0u8; 16];
        assert!(read_from(&memory, 10, 7).is_err());
        assert!(read_from(&memory, usize::MAX, 2).is_err());
        assert_eq!(read_from(&memory, 16, 0).unwrap(), "");
    }
}
