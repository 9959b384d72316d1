//! Test infrastructure for the storage layer.
//!
//! Each test binary uses a subset of these helpers.
#![allow(dead_code)]

pub mod fixtures;
pub mod memory_engine;

pub use fixtures::*;
pub use memory_engine::MemoryEngine;
