use crate::retry::RetryPolicy;
use relink_common::refs::SnapshotOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelinkConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_console_error_limit")]
    pub console_error_limit: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            console_error_limit: default_console_error_limit(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay: Duration::from_millis(self.retry_delay_ms),
            console_error_limit: self.console_error_limit,
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_console_error_limit() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub interactive_only: bool,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_compact")]
    pub compact: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interactive_only: false,
            max_depth: None,
            compact: default_compact(),
        }
    }
}

impl SnapshotConfig {
    pub fn options(&self) -> SnapshotOptions {
        SnapshotOptions {
            interactive_only: self.interactive_only,
            max_depth: self.max_depth,
            compact: self.compact,
        }
    }
}

fn default_compact() -> bool {
    true
}
