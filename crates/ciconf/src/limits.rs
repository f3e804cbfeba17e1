//! Validation limits
//!
//! Durations are in seconds.

/// Maximum number of tags per job
pub const TAGS_LIMIT: usize = 50;

/// Maximum number of caches per job
pub const CACHES_LIMIT: usize = 4;

/// Highest accepted retry count
pub const RETRY_MAX: i64 = 2;

/// Maximum depth of nested arrays (scripts, stages, rules)
pub const MAX_NESTING_DEPTH: usize = 10;

/// Maximum length of a job name
pub const JOB_NAME_LIMIT: usize = 255;

pub const PARALLEL_MIN: i64 = 1;
pub const PARALLEL_MAX: i64 = 200;

/// `start_in` of a delayed job (1 week)
pub const START_IN_LIMIT: u64 = 7 * 24 * 60 * 60;

/// Job `timeout` (1 month)
pub const TIMEOUT_LIMIT: u64 = 30 * 24 * 60 * 60;

/// Files that can make up a cache key
pub const CACHE_KEY_FILES_LIMIT: usize = 2;

/// Maximum number of `exists` patterns of a rule
pub const RULE_EXISTS_LIMIT: usize = 50;

/// Maximum depth of a chain of `extends:`
pub const EXTENDS_MAX_NESTING: usize = 10;
