// src/concurrency/mod.rs

pub mod batch;

pub use batch::{BatchRunner, RunSummary};
