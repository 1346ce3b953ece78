//! Endpoint selection and payload dispatch.

use crate::payload::Payload;
use crate::routing::{RoutingPolicy, WeightTable};
use crate::types::EndpointId;
use crate::{Error, Result};
use parking_lot::RwLock;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// A registered route target: one consumer endpoint and its inbound channel.
#[derive(Debug, Clone)]
struct Endpoint {
    id: EndpointId,
    sender: mpsc::UnboundedSender<Payload>,
}

/// Policy-driven payload router over the registered endpoint set.
///
/// Selection never blocks on the capacity refresh: the adaptive policy reads
/// whatever weights were most recently published to the [`WeightTable`].
#[derive(Debug)]
pub struct Router {
    policy: RoutingPolicy,
    endpoints: RwLock<Vec<Endpoint>>,
    weights: WeightTable,
    round_robin_counter: AtomicU64,
    routed: AtomicU64,
    undeliverable: AtomicU64,
}

impl Router {
    /// Create a new router with the given selection policy.
    #[must_use]
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            policy,
            endpoints: RwLock::new(Vec::new()),
            weights: WeightTable::new(),
            round_robin_counter: AtomicU64::new(0),
            routed: AtomicU64::new(0),
            undeliverable: AtomicU64::new(0),
        }
    }

    /// The policy this router selects with.
    #[must_use]
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// The weight table consulted by the adaptive policy.
    ///
    /// Weights are published externally, typically by a
    /// [`CapacityRefresher`](crate::routing::CapacityRefresher).
    #[must_use]
    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Register a consumer endpoint as a route target.
    ///
    /// Re-registering an existing ID replaces its channel.
    pub fn register(&self, id: EndpointId, sender: mpsc::UnboundedSender<Payload>) {
        let mut endpoints = self.endpoints.write();
        endpoints.retain(|e| e.id != id);
        endpoints.push(Endpoint { id, sender });
        tracing::info!(endpoint = %id, "registered endpoint");
    }

    /// Remove a consumer endpoint from the route targets.
    pub fn deregister(&self, id: EndpointId) {
        let mut endpoints = self.endpoints.write();
        endpoints.retain(|e| e.id != id);
        tracing::info!(endpoint = %id, "deregistered endpoint");
    }

    /// Remove every registered endpoint, dropping their channels.
    pub fn clear(&self) {
        self.endpoints.write().clear();
    }

    /// Snapshot of the currently registered endpoint IDs, in rotation order.
    #[must_use]
    pub fn endpoint_ids(&self) -> Vec<EndpointId> {
        self.endpoints.read().iter().map(|e| e.id).collect()
    }

    /// Number of currently registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    /// Whether the endpoint set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }

    /// Select an endpoint for the next payload without delivering anything.
    ///
    /// # Errors
    /// Returns [`Error::NoRouteAvailable`] if no endpoints are registered.
    pub fn route(&self) -> Result<EndpointId> {
        let endpoints = self.endpoints.read();
        let index = self.pick(&endpoints)?;
        Ok(endpoints[index].id)
    }

    /// Route a payload and deliver it to the selected endpoint.
    ///
    /// An endpoint whose channel has closed is deregistered on the spot and
    /// the pick is retried against the survivors, so a racing consumer
    /// shutdown is not surfaced to the caller while other routes remain.
    ///
    /// # Errors
    /// Returns [`Error::NoRouteAvailable`] once no registered endpoint can
    /// accept the payload.
    pub fn dispatch(&self, mut payload: Payload) -> Result<EndpointId> {
        loop {
            let target = {
                let endpoints = self.endpoints.read();
                let index = self.pick(&endpoints)?;
                endpoints[index].clone()
            };

            match target.sender.send(payload) {
                Ok(()) => {
                    self.routed.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(endpoint = %target.id, "dispatched payload");
                    return Ok(target.id);
                },
                Err(mpsc::error::SendError(returned)) => {
                    self.undeliverable.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(endpoint = %target.id, "endpoint channel closed, deregistering");
                    self.deregister(target.id);
                    payload = returned;
                },
            }
        }
    }

    /// Pick an index into the endpoint slice per the configured policy.
    fn pick(&self, endpoints: &[Endpoint]) -> Result<usize> {
        if endpoints.is_empty() {
            return Err(Error::NoRouteAvailable);
        }

        let index = match self.policy {
            RoutingPolicy::RoundRobin => {
                self.round_robin_counter.fetch_add(1, Ordering::Relaxed) as usize
                    % endpoints.len()
            },
            RoutingPolicy::Random => rand::thread_rng().gen_range(0..endpoints.len()),
            RoutingPolicy::Adaptive => self.pick_weighted(endpoints),
        };

        Ok(index)
    }

    /// Weighted pick proportional to published capacity.
    ///
    /// Endpoints absent from the table weigh 1.0; non-positive weights are
    /// excluded. If every weight is excluded the pick degrades to uniform.
    fn pick_weighted(&self, endpoints: &[Endpoint]) -> usize {
        let snapshot = self.weights.snapshot();
        let weights: Vec<f64> = endpoints
            .iter()
            .map(|e| snapshot.get(&e.id).copied().unwrap_or(1.0).max(0.0))
            .collect();

        let mut rng = rand::thread_rng();
        match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(&mut rng),
            Err(_) => rng.gen_range(0..endpoints.len()),
        }
    }

    /// Snapshot of routing statistics.
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            policy: self.policy,
            endpoints: self.len(),
            routed: self.routed.load(Ordering::Relaxed),
            undeliverable: self.undeliverable.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time routing statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterStats {
    /// Selection policy in effect
    pub policy: RoutingPolicy,
    /// Registered endpoint count at snapshot time
    pub endpoints: usize,
    /// Payloads delivered to an endpoint
    pub routed: u64,
    /// Send attempts that found a closed endpoint channel
    pub undeliverable: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fleet(router: &Router, n: u32) -> Vec<mpsc::UnboundedReceiver<Payload>> {
        (0..n)
            .map(|i| {
                let (tx, rx) = mpsc::unbounded_channel();
                router.register(EndpointId::new(i), tx);
                rx
            })
            .collect()
    }

    #[test]
    fn test_empty_router_has_no_route() {
        let router = Router::new(RoutingPolicy::RoundRobin);
        assert!(matches!(router.route(), Err(Error::NoRouteAvailable)));

        let payload = Payload::synthetic(0, 8).unwrap();
        assert!(matches!(router.dispatch(payload), Err(Error::NoRouteAvailable)));
    }

    #[test]
    fn test_round_robin_cycles_in_registration_order() {
        let router = Router::new(RoutingPolicy::RoundRobin);
        let _rxs = fleet(&router, 3);

        let picks: Vec<u32> = (0..6).map(|_| router.route().unwrap().value()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_random_only_picks_registered_endpoints() {
        let router = Router::new(RoutingPolicy::Random);
        let _rxs = fleet(&router, 3);

        for _ in 0..100 {
            let id = router.route().unwrap();
            assert!(id.value() < 3);
        }
    }

    #[test]
    fn test_adaptive_respects_published_weights() {
        let router = Router::new(RoutingPolicy::Adaptive);
        let _rxs = fleet(&router, 3);

        router.weights().publish(vec![
            (EndpointId::new(0), 4.0),
            (EndpointId::new(1), 2.0),
            (EndpointId::new(2), 1.0),
        ]);

        let total = 7_000_usize;
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for _ in 0..total {
            *counts.entry(router.route().unwrap().value()).or_default() += 1;
        }

        // Expected shares 4:2:1 out of 7; allow a wide statistical band.
        let a = counts[&0] as f64 / total as f64;
        let b = counts[&1] as f64 / total as f64;
        let c = counts[&2] as f64 / total as f64;
        assert!((a - 4.0 / 7.0).abs() < 0.05, "endpoint 0 share {a}");
        assert!((b - 2.0 / 7.0).abs() < 0.05, "endpoint 1 share {b}");
        assert!((c - 1.0 / 7.0).abs() < 0.05, "endpoint 2 share {c}");
    }

    #[test]
    fn test_adaptive_excludes_zero_weight_endpoints() {
        let router = Router::new(RoutingPolicy::Adaptive);
        let _rxs = fleet(&router, 2);

        router
            .weights()
            .publish(vec![(EndpointId::new(0), 0.0), (EndpointId::new(1), 1.0)]);

        for _ in 0..200 {
            assert_eq!(router.route().unwrap(), EndpointId::new(1));
        }
    }

    #[test]
    fn test_adaptive_defaults_missing_endpoints_to_unit_weight() {
        let router = Router::new(RoutingPolicy::Adaptive);
        let _rxs = fleet(&router, 2);

        // Nothing published: both endpoints should still be reachable.
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(router.route().unwrap());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_dispatch_delivers_to_selected_endpoint() {
        let router = Router::new(RoutingPolicy::RoundRobin);
        let mut rxs = fleet(&router, 2);

        let first = router.dispatch(Payload::synthetic(1, 8).unwrap()).unwrap();
        let second = router.dispatch(Payload::synthetic(2, 8).unwrap()).unwrap();
        assert_eq!(first, EndpointId::new(0));
        assert_eq!(second, EndpointId::new(1));

        assert_eq!(rxs[0].try_recv().unwrap().seq, 1);
        assert_eq!(rxs[1].try_recv().unwrap().seq, 2);
    }

    #[test]
    fn test_dispatch_deregisters_closed_endpoint_and_retries() {
        let router = Router::new(RoutingPolicy::RoundRobin);
        let mut rxs = fleet(&router, 2);

        // Close endpoint 0; the next dispatch lands on endpoint 1.
        rxs.remove(0);
        let target = router.dispatch(Payload::synthetic(1, 8).unwrap()).unwrap();
        assert_eq!(target, EndpointId::new(1));
        assert_eq!(router.len(), 1);
        assert_eq!(router.stats().undeliverable, 1);

        // Close the survivor as well: no route remains.
        rxs.clear();
        let result = router.dispatch(Payload::synthetic(2, 8).unwrap());
        assert!(matches!(result, Err(Error::NoRouteAvailable)));
        assert!(router.is_empty());
    }

    #[test]
    fn test_stats_count_routed_payloads() {
        let router = Router::new(RoutingPolicy::RoundRobin);
        let _rxs = fleet(&router, 1);

        for seq in 0..5 {
            router.dispatch(Payload::synthetic(seq, 8).unwrap()).unwrap();
        }

        let stats = router.stats();
        assert_eq!(stats.routed, 5);
        assert_eq!(stats.undeliverable, 0);
        assert_eq!(stats.endpoints, 1);
    }
}
