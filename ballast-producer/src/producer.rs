//! Timer-driven payload source.

use crate::config::ProducerConfig;
use ballast_core::{Error, Payload, Result, Router, MAX_PAYLOAD_SIZE};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Counters published by a running producer.
#[derive(Debug, Default)]
pub struct ProducerStats {
    /// Payloads handed to the router
    pub sent: AtomicU64,
    /// Payloads dropped because no route was available
    pub dropped: AtomicU64,
}

impl ProducerStats {
    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> ProducerStatsSnapshot {
        ProducerStatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of [`ProducerStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerStatsSnapshot {
    /// Payloads handed to the router
    pub sent: u64,
    /// Payloads dropped because no route was available
    pub dropped: u64,
}

/// Fixed-schedule payload source.
///
/// After a configured initial delay, emits one fixed-size payload per tick to
/// the router, fire-and-forget: a tick with no route drops the payload,
/// counts it, and waits for the next tick. There is no feedback channel from
/// the consumers and the producer never blocks on them.
#[derive(Debug)]
pub struct Producer {
    config: ProducerConfig,
    router: Arc<Router>,
    stats: Arc<ProducerStats>,
}

impl Producer {
    /// Create a new producer emitting into `router`.
    ///
    /// # Errors
    /// Returns a configuration error if the payload size exceeds
    /// [`MAX_PAYLOAD_SIZE`] or the send interval is zero.
    pub fn new(config: ProducerConfig, router: Arc<Router>) -> Result<Self> {
        if config.payload_size > MAX_PAYLOAD_SIZE {
            return Err(Error::configuration(format!(
                "payload size {} exceeds {MAX_PAYLOAD_SIZE} byte limit",
                config.payload_size
            )));
        }
        if config.send_interval.is_zero() {
            return Err(Error::configuration("send interval must be non-zero"));
        }

        Ok(Self { config, router, stats: Arc::new(ProducerStats::default()) })
    }

    /// The counters this producer updates.
    #[must_use]
    pub fn stats(&self) -> Arc<ProducerStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the send loop onto the runtime.
    #[must_use]
    pub fn spawn(self) -> ProducerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let stats = Arc::clone(&self.stats);
        let task = tokio::spawn(self.run(stop_rx));
        ProducerHandle { stop: stop_tx, task, stats }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        tracing::info!(
            interval_ms = self.config.send_interval.as_millis() as u64,
            payload_bytes = self.config.payload_size,
            "producer started",
        );

        tokio::select! {
            () = time::sleep(self.config.initial_delay) => {},
            _ = stop.changed() => return,
        }

        let mut ticker = time::interval(self.config.send_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(seq);
                    seq += 1;
                },
                _ = stop.changed() => break,
            }
        }

        tracing::info!(sent = self.stats.sent.load(Ordering::Relaxed), "producer stopped");
    }

    /// One send tick: build a payload and hand it to the router.
    fn tick(&self, seq: u64) {
        let payload = match Payload::synthetic(seq, self.config.payload_size) {
            Ok(payload) => payload,
            Err(error) => {
                // Size is validated at construction, so this cannot trigger
                // for a producer built through `new`.
                tracing::error!(%error, "failed to build payload");
                return;
            },
        };

        match self.router.dispatch(payload) {
            Ok(endpoint) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(seq, endpoint = %endpoint, "payload sent");
            },
            Err(Error::NoRouteAvailable) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(seq, "no route available, payload dropped");
            },
            Err(error) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(seq, %error, "dispatch failed, payload dropped");
            },
        }
    }
}

/// Handle for stopping a running [`Producer`].
#[derive(Debug)]
pub struct ProducerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: Arc<ProducerStats>,
}

impl ProducerHandle {
    /// The counters the running producer updates.
    #[must_use]
    pub fn stats(&self) -> Arc<ProducerStats> {
        Arc::clone(&self.stats)
    }

    /// Stop the send loop and wait for it to exit.
    ///
    /// # Errors
    /// Returns [`Error::Lifecycle`] if the producer task panicked.
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop.send(true);
        self.task.await.map_err(|e| Error::lifecycle(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_core::{EndpointId, RoutingPolicy};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn test_config() -> ProducerConfig {
        ProducerConfig {
            send_interval: Duration::from_millis(100),
            initial_delay: Duration::from_millis(500),
            payload_size: 32,
        }
    }

    #[test]
    fn test_oversized_payload_config_rejected() {
        let router = Arc::new(Router::new(RoutingPolicy::RoundRobin));
        let config = ProducerConfig { payload_size: MAX_PAYLOAD_SIZE + 1, ..test_config() };
        assert!(matches!(
            Producer::new(config, router),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let router = Arc::new(Router::new(RoutingPolicy::RoundRobin));
        let config = ProducerConfig { send_interval: Duration::ZERO, ..test_config() };
        assert!(matches!(
            Producer::new(config, router),
            Err(Error::Configuration { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_emits_on_schedule() {
        let router = Arc::new(Router::new(RoutingPolicy::RoundRobin));
        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register(EndpointId::new(0), tx);

        let producer = Producer::new(test_config(), Arc::clone(&router)).unwrap();
        let handle = producer.spawn();

        // Initial delay 500ms, then one tick per 100ms: the first tick fires
        // at 500ms, so 2.05s in means 16 ticks.
        tokio::time::sleep(Duration::from_millis(2050)).await;
        handle.stop().await.unwrap();

        let mut seqs = Vec::new();
        while let Ok(payload) = rx.try_recv() {
            assert_eq!(payload.size(), 32);
            seqs.push(payload.seq);
        }
        assert_eq!(seqs, (0..16).collect::<Vec<u64>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_route_counts_drops() {
        let router = Arc::new(Router::new(RoutingPolicy::RoundRobin));
        let producer = Producer::new(test_config(), router).unwrap();
        let stats = producer.stats();
        let handle = producer.spawn();

        tokio::time::sleep(Duration::from_millis(1050)).await;
        handle.stop().await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sent, 0);
        assert!(snapshot.dropped >= 5, "dropped {} payloads", snapshot.dropped);
    }
}
