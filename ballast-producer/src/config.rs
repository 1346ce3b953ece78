//! Producer configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the payload producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Fixed period between send ticks
    pub send_interval: Duration,

    /// Delay before the first tick fires
    pub initial_delay: Duration,

    /// Size in bytes of each synthetic payload
    pub payload_size: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_millis(100),
            initial_delay: Duration::from_secs(1),
            payload_size: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProducerConfig::default();
        assert_eq!(config.send_interval, Duration::from_millis(100));
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.payload_size, 1024);
    }
}
