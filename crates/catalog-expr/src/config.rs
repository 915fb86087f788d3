//! Sandbox limits.

use std::time::Duration;

/// Default wall-clock deadline for one evaluation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

/// Default maximum number of operations in the Rhai engine.
const DEFAULT_MAX_OPERATIONS: u64 = 1_000_000;

/// Default maximum call stack depth.
const DEFAULT_MAX_CALL_LEVELS: usize = 64;

/// Default maximum string size in bytes.
const DEFAULT_MAX_STRING_SIZE: usize = 65536;

/// Default maximum array size.
const DEFAULT_MAX_ARRAY_SIZE: usize = 10_000;

/// Default maximum map size.
const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Configuration for the expression sandbox.
///
/// A zero `timeout` or `max_operations` disables that limit.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wall-clock deadline per evaluation.
    pub timeout: Duration,
    /// Maximum number of operations before termination.
    pub max_operations: u64,
    /// Maximum call stack depth.
    pub max_call_levels: usize,
    /// Maximum string size in bytes.
    pub max_string_size: usize,
    /// Maximum array size.
    pub max_array_size: usize,
    /// Maximum map size.
    pub max_map_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
        }
    }
}

impl SandboxConfig {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_operations(mut self, max_operations: u64) -> Self {
        self.max_operations = max_operations;
        self
    }
}
