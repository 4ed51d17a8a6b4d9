// src/exec/mod.rs

//! Child processes that consume pipeline results.

pub mod test_runner;

pub use test_runner::TestRunner;
