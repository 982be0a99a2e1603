// src/constants.rs
//
// Centralized constants for s3bulk to avoid hardcoded values throughout the codebase

/// Default number of items buffered and flushed together by the batch runner
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of transfers physically in flight at once
pub const DEFAULT_MAX_PARALLEL: usize = 10;

/// Separator used by object keys, independent of the host OS
pub const KEY_SEPARATOR: char = '/';

/// Default region when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

// ============================================================================
// Environment variables
// ============================================================================

/// Overrides [`DEFAULT_BATCH_SIZE`]
pub const ENV_BATCH_SIZE: &str = "S3BULK_BATCH_SIZE";

/// Overrides [`DEFAULT_MAX_PARALLEL`]
pub const ENV_MAX_PARALLEL: &str = "S3BULK_MAX_PARALLEL";

/// Forces path-style addressing for S3-compatible endpoints
pub const ENV_FORCE_PATH_STYLE: &str = "S3BULK_FORCE_PATH_STYLE";
