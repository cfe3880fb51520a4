//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Settings for the dispatcher task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// How many host events may queue before senders wait.
    ///
    /// Default: 64. Must be non-zero.
    pub channel_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}
