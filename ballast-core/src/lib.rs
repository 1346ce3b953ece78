//! # Ballast Core
//!
//! Core library for the ballast load-balanced work distribution pipeline.
//!
//! Ballast models a classic producer/consumer fleet: a timer-driven producer
//! emits fixed-size payloads into a router, which hands each payload to one of
//! several independent consumer workers under a pluggable selection policy.
//! This crate provides the shared building blocks:
//!
//! - [`payload`]: the opaque unit of work exchanged across the pipeline
//! - [`routing`]: the router, its selection policies, and the capacity
//!   (weight) table driving the adaptive policy
//! - [`error`]: error types and result handling
//! - [`types`]: core type definitions
//!
//! ## Quick Start
//!
//! ```rust
//! use ballast_core::{Payload, Router, RoutingPolicy, EndpointId};
//! use tokio::sync::mpsc;
//!
//! # fn main() -> ballast_core::Result<()> {
//! let router = Router::new(RoutingPolicy::RoundRobin);
//!
//! let (tx, _rx) = mpsc::unbounded_channel();
//! router.register(EndpointId::new(0), tx);
//!
//! let payload = Payload::synthetic(0, 64)?;
//! let target = router.dispatch(payload)?;
//! assert_eq!(target, EndpointId::new(0));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod payload;
pub mod prelude;
pub mod routing;
pub mod types;

pub use crate::{
    error::{Error, Result},
    payload::{Payload, PayloadId, MAX_PAYLOAD_SIZE},
    routing::{
        CapacityFeed, CapacityRefresher, RefresherHandle, Router, RouterConfig, RouterStats,
        RoutingPolicy, WeightTable,
    },
    types::{EndpointId, Timestamp},
};
