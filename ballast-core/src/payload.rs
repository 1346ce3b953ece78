//! Payload types for the work distribution pipeline.

use crate::types::Timestamp;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Upper bound on payload size accepted by the pipeline.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Unique identifier for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayloadId(Uuid);

impl PayloadId {
    /// Generate a new unique payload ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a payload ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PayloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque, immutable unit of work.
///
/// Created by the producer on each send tick; ownership transfers to whichever
/// consumer the router selects, and the payload is discarded once processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Unique payload identifier
    pub id: PayloadId,

    /// Producer-assigned monotone sequence number
    pub seq: u64,

    /// Opaque payload data (zero-copy)
    pub data: Bytes,

    /// Payload creation timestamp
    pub created_at: Timestamp,
}

impl Payload {
    /// Create a new payload from existing data.
    ///
    /// # Errors
    /// Returns an error if the data exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn new(seq: u64, data: Bytes) -> crate::Result<Self> {
        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(crate::Error::InvalidPayload {
                reason: format!("payload of {} bytes exceeds {MAX_PAYLOAD_SIZE} byte limit", data.len()),
            });
        }

        Ok(Self { id: PayloadId::new(), seq, data, created_at: Utc::now() })
    }

    /// Create a synthetic payload of `size` bytes derived from the sequence
    /// number, matching the demo's fixed-size block of integers.
    ///
    /// # Errors
    /// Returns an error if `size` exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn synthetic(seq: u64, size: usize) -> crate::Result<Self> {
        let data: Vec<u8> = (0..size).map(|i| (seq as usize).wrapping_add(i) as u8).collect();
        Self::new(seq, Bytes::from(data))
    }

    /// Get the payload size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check whether the payload carries any data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
