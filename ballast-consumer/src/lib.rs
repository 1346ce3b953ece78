//! # Ballast Consumer
//!
//! Consumer worker for the ballast work distribution pipeline.
//!
//! Each worker is an independent unit of sequential execution: it processes
//! exactly one payload at a time for a simulated duration, queues anything
//! that arrives while busy, and drains its backlog strictly in arrival order
//! once free. "Processing" is represented by a single scheduled completion
//! timer, never by occupying a thread.
//!
//! This crate provides:
//! - [`WorkerCore`]: the pure idle/busy state machine over a FIFO backlog
//! - [`Worker`]: the async loop driving a core from an inbound channel
//! - [`WorkerStats`]: externally readable counters and backlog depth
//!
//! ## Examples
//!
//! ```rust
//! use ballast_consumer::{Worker, ConsumerConfig, WorkerStats};
//! use ballast_core::{EndpointId, Payload};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ballast_core::Result<()> {
//! let config = ConsumerConfig {
//!     processing_duration: std::time::Duration::from_millis(10),
//!     ..ConsumerConfig::default()
//! };
//!
//! let stats = Arc::new(WorkerStats::default());
//! let (tx, handle) = Worker::spawn(EndpointId::new(0), config, Arc::clone(&stats));
//!
//! tx.send(Payload::synthetic(0, 64)?).expect("worker is running");
//! drop(tx);
//! handle.await.expect("worker exits cleanly");
//! assert_eq!(stats.snapshot().processed, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod worker;

pub use config::ConsumerConfig;
pub use worker::{
    Admission, Completion, Worker, WorkerCore, WorkerState, WorkerStats, WorkerStatsSnapshot,
};
pub use ballast_core::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{ConsumerConfig, Worker, WorkerCore, WorkerState, WorkerStats};
    pub use ballast_core::prelude::*;
}
