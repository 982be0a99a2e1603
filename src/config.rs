// src/config.rs
//
// Batch sizing and parallelism knobs, with environment overrides.

use std::env;
use tracing::warn;

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_PARALLEL, ENV_BATCH_SIZE, ENV_MAX_PARALLEL};

/// Resolve a caller-supplied batch size. Unset, zero, or negative values
/// fall back to [`DEFAULT_BATCH_SIZE`].
pub fn resolve_batch_size(size: Option<i64>) -> usize {
    match size {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_BATCH_SIZE,
    }
}

/// Runtime parameters for the batch runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Items buffered and flushed together
    pub batch_size: usize,
    /// Handler invocations allowed in flight at once
    pub max_parallel: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl BatchConfig {
    /// Defaults overridden by `S3BULK_BATCH_SIZE` / `S3BULK_MAX_PARALLEL`.
    /// A `.env` file is loaded first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(n) = positive_var(&lookup, ENV_BATCH_SIZE) {
            cfg.batch_size = n;
        }
        if let Some(n) = positive_var(&lookup, ENV_MAX_PARALLEL) {
            cfg.max_parallel = n;
        }
        cfg
    }

    pub fn with_batch_size(mut self, batch_size: Option<i64>) -> Self {
        if batch_size.is_some() {
            self.batch_size = resolve_batch_size(batch_size);
        }
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }
}

fn positive_var<F>(lookup: &F, name: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!("ignoring {}={:?}: expected a positive integer", name, raw);
            None
        }
    }
}
