//! # Ballast Pipeline
//!
//! Wires the ballast components into a running load-balanced pipeline: one
//! timer-driven producer, a policy-pluggable router, and a fleet of
//! independent consumer workers. Under the naive policies (round-robin,
//! random) a consumer that falls behind grows its backlog without bound;
//! the adaptive policy steers payloads toward workers with remaining
//! capacity using the fleet's own backlog depths as the capacity signal.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use ballast_pipeline::{Pipeline, PipelineConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> ballast_core::Result<()> {
//! let pipeline = Pipeline::start(PipelineConfig::default())?;
//!
//! tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//! println!("{:?}", pipeline.stats());
//!
//! pipeline.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod pipeline;

pub use config::{ConfigLoader, PipelineConfig, DEFAULT_CONFIG_FILE};
pub use pipeline::{Pipeline, PipelineHandle, PipelineStats, QueueDepthFeed};
pub use ballast_core::{Error, Result};
