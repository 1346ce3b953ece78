//! # Ballast Producer
//!
//! Timer-driven payload source for the ballast work distribution pipeline.
//!
//! The producer emits one fixed-size payload per configured interval into the
//! router and never waits on the consumers: send failures surface only as a
//! drop counter. This crate provides:
//! - [`Producer`]: the tick loop building and dispatching synthetic payloads
//! - [`ProducerConfig`]: interval, initial delay, and payload size
//! - [`ProducerStats`]: sent/dropped counters readable while running
//!
//! ## Examples
//!
//! ```rust,no_run
//! use ballast_core::{Router, RoutingPolicy};
//! use ballast_producer::{Producer, ProducerConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> ballast_core::Result<()> {
//! let router = Arc::new(Router::new(RoutingPolicy::RoundRobin));
//! let producer = Producer::new(ProducerConfig::default(), Arc::clone(&router))?;
//!
//! let handle = producer.spawn();
//! // ... consumers register with the router and receive payloads ...
//! handle.stop().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod producer;

pub use config::ProducerConfig;
pub use producer::{Producer, ProducerHandle, ProducerStats, ProducerStatsSnapshot};
pub use ballast_core::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{Producer, ProducerConfig, ProducerHandle, ProducerStats};
    pub use ballast_core::prelude::*;
}
