//! Payload routing across the consumer fleet.
//!
//! The router owns the set of currently registered consumer endpoints and
//! selects one per payload under a pluggable policy: fixed rotation, uniform
//! random, or adaptive selection weighted by externally reported capacity.
//! The capacity signal itself is an opaque feed; see [`capacity`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod capacity;
pub mod router;

pub use capacity::{CapacityFeed, CapacityRefresher, RefresherHandle, WeightTable};
pub use router::{Router, RouterStats};

/// Selection policies for distributing payloads across endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingPolicy {
    /// Cycle through endpoints in registration order, wrapping at the end
    RoundRobin,
    /// Select uniformly at random per payload
    Random,
    /// Select weighted by the latest published capacity per endpoint
    Adaptive,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        RoutingPolicy::RoundRobin
    }
}

impl fmt::Display for RoutingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoutingPolicy::RoundRobin => "round-robin",
            RoutingPolicy::Random => "random",
            RoutingPolicy::Adaptive => "adaptive",
        };
        write!(f, "{name}")
    }
}

impl FromStr for RoutingPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "round-robin" => Ok(RoutingPolicy::RoundRobin),
            "random" => Ok(RoutingPolicy::Random),
            "adaptive" => Ok(RoutingPolicy::Adaptive),
            other => Err(crate::Error::Configuration {
                message: format!("unknown routing policy: {other}"),
            }),
        }
    }
}

/// Router configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Endpoint selection policy
    pub policy: RoutingPolicy,

    /// How often the adaptive weight table is refreshed from the capacity feed
    pub refresh_interval: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { policy: RoutingPolicy::default(), refresh_interval: Duration::from_secs(2) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_round_trips_through_str() {
        for policy in
            [RoutingPolicy::RoundRobin, RoutingPolicy::Random, RoutingPolicy::Adaptive]
        {
            let parsed: RoutingPolicy = policy.to_string().parse().unwrap();
            assert_eq!(parsed, policy);
        }
    }

    #[test]
    fn test_unknown_policy_is_configuration_error() {
        let result = "least-connections".parse::<RoutingPolicy>();
        assert!(matches!(result, Err(crate::Error::Configuration { .. })));
    }
}
