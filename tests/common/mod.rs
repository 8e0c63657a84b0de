//! Shared helpers for the integration tests.

#![allow(dead_code)]

#[path = "../../src/test/builder.rs"]
mod builder;

pub use builder::*;

/// A `.text` section with a few bytes of code, placed at RVA 0x1000.
pub fn text() -> Vec<u8> {
    vec![0x55, 0x8B, 0xEC, 0x33, 0xC0, 0x5D, 0xC3]
}
