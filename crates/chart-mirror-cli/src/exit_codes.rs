//! Standard exit codes for CLI operations
//!
//! Scripts driving a scheduled mirror run can tell a partial run from a
//! broken source without parsing output.

#![allow(dead_code)]

/// Success - every version of every source was handled
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Partial success - some version or dependency was skipped
pub const PARTIAL: i32 = 2;

/// At least one source produced nothing
pub const SOURCE_FAILED: i32 = 3;

/// Configuration error - missing or invalid config file, missing token
pub const CONFIG_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Interrupted (128 + SIGINT)
pub const CANCELLED: i32 = 130;
