//! Consumer worker configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a consumer worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Simulated processing time per payload
    pub processing_duration: Duration,

    /// Optional bound on the pending queue.
    ///
    /// Unset by default: the backlog grows without limit under sustained
    /// overload, which is the failure mode the naive routing policies are
    /// meant to demonstrate. When set, payloads arriving at a full backlog
    /// are rejected at admission and counted, never silently dropped later.
    pub max_backlog: Option<usize>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self { processing_duration: Duration::from_secs(1), max_backlog: None }
    }
}
