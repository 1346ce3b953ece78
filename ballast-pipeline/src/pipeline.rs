//! Pipeline assembly and lifecycle.

use crate::config::PipelineConfig;
use ballast_core::{
    CapacityFeed, CapacityRefresher, EndpointId, Error, RefresherHandle, Result, Router,
    RouterStats, RoutingPolicy,
};
use ballast_consumer::{Worker, WorkerStats, WorkerStatsSnapshot};
use ballast_producer::{Producer, ProducerHandle, ProducerStatsSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Capacity feed derived from the fleet's own backlog depths.
///
/// Weight is `1 / (1 + backlog)`, so a worker with an empty queue weighs 1.0
/// and a deeply backlogged worker tends toward zero. This stands in for the
/// external memory-pressure signal of a real deployment; any other
/// [`CapacityFeed`] can be swapped in.
#[derive(Debug, Clone)]
pub struct QueueDepthFeed {
    workers: Vec<(EndpointId, Arc<WorkerStats>)>,
}

impl QueueDepthFeed {
    /// Create a feed reading the given workers' stats.
    #[must_use]
    pub fn new(workers: Vec<(EndpointId, Arc<WorkerStats>)>) -> Self {
        Self { workers }
    }
}

#[async_trait]
impl CapacityFeed for QueueDepthFeed {
    async fn sample(&self) -> Vec<(EndpointId, f64)> {
        self.workers
            .iter()
            .map(|(id, stats)| {
                let backlog = stats.snapshot().backlog;
                (*id, 1.0 / (1.0 + backlog as f64))
            })
            .collect()
    }
}

/// A running pipeline: one producer, the router, and N consumer workers.
pub struct Pipeline;

impl Pipeline {
    /// Validate the configuration and start every component.
    ///
    /// Workers are spawned and registered first so the producer's first tick
    /// already has routes; the capacity refresher only runs under the
    /// adaptive policy.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for unusable settings.
    pub fn start(config: PipelineConfig) -> Result<PipelineHandle> {
        config.validate()?;

        tracing::info!(
            consumers = config.consumers,
            policy = %config.routing.policy,
            "starting pipeline",
        );

        let router = Arc::new(Router::new(config.routing.policy));

        let mut workers = Vec::with_capacity(config.consumers);
        let mut worker_stats = Vec::with_capacity(config.consumers);
        for i in 0..config.consumers {
            let id = EndpointId::new(i as u32);
            let stats = Arc::new(WorkerStats::default());
            let (tx, handle) = Worker::spawn(id, config.consumer.clone(), Arc::clone(&stats));
            router.register(id, tx);
            workers.push(handle);
            worker_stats.push((id, stats));
        }

        let refresher = match config.routing.policy {
            RoutingPolicy::Adaptive => {
                let feed = Arc::new(QueueDepthFeed::new(worker_stats.clone()));
                let refresher = CapacityRefresher::new(
                    feed,
                    router.weights().clone(),
                    config.routing.refresh_interval,
                );
                Some(refresher.spawn())
            },
            _ => None,
        };

        let producer = Producer::new(config.producer, Arc::clone(&router))?.spawn();

        Ok(PipelineHandle { router, producer, refresher, workers, worker_stats })
    }
}

/// Handle over a running pipeline.
///
/// Consumed by [`shutdown`](PipelineHandle::shutdown); dropping it instead
/// leaves the tasks running detached.
pub struct PipelineHandle {
    router: Arc<Router>,
    producer: ProducerHandle,
    refresher: Option<RefresherHandle>,
    workers: Vec<JoinHandle<()>>,
    worker_stats: Vec<(EndpointId, Arc<WorkerStats>)>,
}

impl PipelineHandle {
    /// The router the pipeline dispatches through.
    #[must_use]
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    /// Point-in-time statistics across every component.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            producer: self.producer.stats().snapshot(),
            router: self.router.stats(),
            workers: self
                .worker_stats
                .iter()
                .map(|(id, stats)| (*id, stats.snapshot()))
                .collect(),
        }
    }

    /// Stop the producer, let every worker drain its backlog, and wait for
    /// all tasks to exit.
    ///
    /// # Errors
    /// Returns [`Error::Lifecycle`] if any component task panicked.
    pub async fn shutdown(self) -> Result<()> {
        tracing::info!("shutting down pipeline");

        self.producer.stop().await?;
        if let Some(refresher) = self.refresher {
            refresher.stop().await?;
        }

        // Dropping the router's senders closes every worker's inbound
        // channel; each worker exits once its backlog drains.
        self.router.clear();
        for handle in self.workers {
            handle.await.map_err(|e| Error::lifecycle(e.to_string()))?;
        }

        tracing::info!("pipeline stopped");
        Ok(())
    }
}

/// Aggregate statistics snapshot for a running pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Producer counters
    pub producer: ProducerStatsSnapshot,
    /// Router counters
    pub router: RouterStats,
    /// Per-worker counters, in endpoint order
    pub workers: Vec<(EndpointId, WorkerStatsSnapshot)>,
}

impl PipelineStats {
    /// Total backlog across the fleet.
    #[must_use]
    pub fn total_backlog(&self) -> usize {
        self.workers.iter().map(|(_, w)| w.backlog).sum()
    }

    /// Total payloads processed across the fleet.
    #[must_use]
    pub fn total_processed(&self) -> u64 {
        self.workers.iter().map(|(_, w)| w.processed).sum()
    }

    /// Total payloads accepted across the fleet.
    #[must_use]
    pub fn total_accepted(&self) -> u64 {
        self.workers.iter().map(|(_, w)| w.accepted).sum()
    }
}
