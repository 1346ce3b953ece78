//! Capacity signals feeding the adaptive routing policy.
//!
//! The source of per-endpoint capacity (memory pressure, queue depth, an
//! external metrics gossip) is not this crate's concern: it is modelled as an
//! opaque [`CapacityFeed`] that is sampled periodically. Sampled weights are
//! published into a [`WeightTable`] that route selection reads without ever
//! blocking on a refresh.

use crate::types::EndpointId;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared endpoint-to-weight table.
///
/// Single writer (the refresher), many readers (route selection). A publish
/// replaces the whole table, so readers always observe one coherent sample.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    inner: Arc<RwLock<HashMap<EndpointId, f64>>>,
}

impl WeightTable {
    /// Create an empty weight table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table with a freshly sampled set of weights.
    pub fn publish(&self, weights: Vec<(EndpointId, f64)>) {
        let mut table = self.inner.write();
        table.clear();
        table.extend(weights);
    }

    /// The most recently published weight for an endpoint, if any.
    #[must_use]
    pub fn weight_for(&self, endpoint: EndpointId) -> Option<f64> {
        self.inner.read().get(&endpoint).copied()
    }

    /// Clone of the current table contents.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<EndpointId, f64> {
        self.inner.read().clone()
    }

    /// Number of endpoints with a published weight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether any weights have been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Source of per-endpoint capacity weights.
///
/// Higher weight means more remaining capacity, so the endpoint receives a
/// proportionally larger share of payloads under the adaptive policy. The
/// weighting function is owned by the feed, not by the router.
#[async_trait]
pub trait CapacityFeed: Send + Sync {
    /// Sample the current capacity weight of every known endpoint.
    async fn sample(&self) -> Vec<(EndpointId, f64)>;
}

/// Periodic background task publishing feed samples into a [`WeightTable`].
pub struct CapacityRefresher {
    feed: Arc<dyn CapacityFeed>,
    table: WeightTable,
    interval: Duration,
}

impl CapacityRefresher {
    /// Create a refresher sampling `feed` every `interval` into `table`.
    pub fn new(feed: Arc<dyn CapacityFeed>, table: WeightTable, interval: Duration) -> Self {
        Self { feed, table, interval }
    }

    /// Spawn the refresh loop onto the runtime.
    #[must_use]
    pub fn spawn(self) -> RefresherHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        RefresherHandle { stop: stop_tx, task }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let weights = self.feed.sample().await;
                    tracing::trace!(endpoints = weights.len(), "published capacity weights");
                    self.table.publish(weights);
                },
                _ = stop.changed() => break,
            }
        }
        tracing::debug!("capacity refresher stopped");
    }
}

/// Handle for stopping a running [`CapacityRefresher`].
pub struct RefresherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Stop the refresh loop and wait for it to exit.
    ///
    /// # Errors
    /// Returns [`Error::Lifecycle`] if the refresher task panicked.
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop.send(true);
        self.task.await.map_err(|e| Error::lifecycle(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFeed(Vec<(EndpointId, f64)>);

    #[async_trait]
    impl CapacityFeed for FixedFeed {
        async fn sample(&self) -> Vec<(EndpointId, f64)> {
            self.0.clone()
        }
    }

    #[test]
    fn test_publish_replaces_table() {
        let table = WeightTable::new();
        table.publish(vec![(EndpointId::new(0), 2.0), (EndpointId::new(1), 1.0)]);
        assert_eq!(table.weight_for(EndpointId::new(0)), Some(2.0));
        assert_eq!(table.len(), 2);

        table.publish(vec![(EndpointId::new(1), 3.0)]);
        assert_eq!(table.weight_for(EndpointId::new(0)), None);
        assert_eq!(table.weight_for(EndpointId::new(1)), Some(3.0));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresher_publishes_samples() {
        let table = WeightTable::new();
        let feed = Arc::new(FixedFeed(vec![(EndpointId::new(7), 0.5)]));
        let handle = CapacityRefresher::new(feed, table.clone(), Duration::from_secs(2)).spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(table.weight_for(EndpointId::new(7)), Some(0.5));

        handle.stop().await.unwrap();
    }
}
