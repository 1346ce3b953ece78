//! # Prelude
//!
//! Convenient access to the types used across the ballast pipeline.

pub use crate::{
    error::{Error, Result},
    payload::{Payload, PayloadId, MAX_PAYLOAD_SIZE},
    routing::{Router, RouterConfig, RouterStats, RoutingPolicy, WeightTable},
    types::{EndpointId, Timestamp},
};

pub use bytes::Bytes;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use uuid::Uuid;
