//! The consumer work loop: a two-state machine over a FIFO backlog.

use crate::config::ConsumerConfig;
use ballast_core::{EndpointId, Payload};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Processing state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No payload in flight, backlog empty
    Idle,
    /// Exactly one payload in flight, completion timer armed
    Busy,
}

/// Outcome of offering a payload to the state machine.
#[derive(Debug)]
pub enum Admission {
    /// The worker was idle: processing starts now, arm the completion timer
    Started,
    /// The worker was busy: the payload joined the backlog tail
    Queued,
    /// The backlog bound was hit: the payload is handed back to the caller
    Rejected(Payload),
}

/// Outcome of a completion-timer expiry.
#[derive(Debug)]
pub enum Completion {
    /// The finished payload, with the backlog head already started; re-arm
    Next(Payload),
    /// The finished payload, with nothing left to do; the worker is idle
    Drained(Payload),
}

/// Pure idle/busy state machine over a FIFO pending queue.
///
/// Holds no timers and does no I/O, so every transition is directly
/// testable; [`Worker`] drives it from an inbound channel and a single
/// scheduled completion event.
#[derive(Debug)]
pub struct WorkerCore {
    state: WorkerState,
    current: Option<Payload>,
    pending: VecDeque<Payload>,
    max_backlog: Option<usize>,
}

impl WorkerCore {
    /// Create an idle core with an empty backlog.
    #[must_use]
    pub fn new(max_backlog: Option<usize>) -> Self {
        Self { state: WorkerState::Idle, current: None, pending: VecDeque::new(), max_backlog }
    }

    /// Current processing state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Whether a payload is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state == WorkerState::Busy
    }

    /// Number of payloads waiting behind the one in flight.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.pending.len()
    }

    /// The payload currently being processed, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Payload> {
        self.current.as_ref()
    }

    /// Offer a newly arrived payload.
    ///
    /// Idle: the payload starts processing immediately and the caller must
    /// arm the completion timer. Busy: the payload joins the backlog tail
    /// unless the configured bound is hit, in which case it is handed back.
    pub fn accept(&mut self, payload: Payload) -> Admission {
        match self.state {
            WorkerState::Idle => {
                debug_assert!(self.current.is_none() && self.pending.is_empty());
                self.current = Some(payload);
                self.state = WorkerState::Busy;
                Admission::Started
            },
            WorkerState::Busy => {
                if let Some(bound) = self.max_backlog {
                    if self.pending.len() >= bound {
                        return Admission::Rejected(payload);
                    }
                }
                self.pending.push_back(payload);
                Admission::Queued
            },
        }
    }

    /// Mark the in-flight payload as processed.
    ///
    /// Returns `None` when called while idle. Otherwise the finished payload
    /// comes back along with whether the backlog head took its place: on
    /// [`Completion::Next`] the caller must re-arm the completion timer for
    /// the new in-flight payload.
    pub fn complete(&mut self) -> Option<Completion> {
        let finished = self.current.take()?;
        match self.pending.pop_front() {
            Some(next) => {
                self.current = Some(next);
                Some(Completion::Next(finished))
            },
            None => {
                self.state = WorkerState::Idle;
                Some(Completion::Drained(finished))
            },
        }
    }
}

/// Counters published by a running worker.
///
/// Read concurrently by the pipeline's capacity feed and by tests; the
/// worker is the only writer.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Payloads admitted (started or queued)
    pub accepted: AtomicU64,
    /// Payloads whose processing completed
    pub processed: AtomicU64,
    /// Payloads rejected at a full bounded backlog
    pub rejected: AtomicU64,
    /// Current pending-queue depth
    pub backlog: AtomicUsize,
}

impl WorkerStats {
    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            backlog: self.backlog.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of [`WorkerStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatsSnapshot {
    /// Payloads admitted (started or queued)
    pub accepted: u64,
    /// Payloads whose processing completed
    pub processed: u64,
    /// Payloads rejected at a full bounded backlog
    pub rejected: u64,
    /// Pending-queue depth at snapshot time
    pub backlog: usize,
}

/// Async worker driving a [`WorkerCore`] from an inbound payload channel.
#[derive(Debug)]
pub struct Worker {
    id: EndpointId,
    config: ConsumerConfig,
    core: WorkerCore,
    inbound: mpsc::UnboundedReceiver<Payload>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a worker task, returning its inbound channel and join handle.
    ///
    /// The worker runs until the inbound channel closes and the backlog has
    /// fully drained, so every admitted payload is eventually processed.
    #[must_use]
    pub fn spawn(
        id: EndpointId,
        config: ConsumerConfig,
        stats: Arc<WorkerStats>,
    ) -> (mpsc::UnboundedSender<Payload>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            id,
            core: WorkerCore::new(config.max_backlog),
            config,
            inbound: rx,
            stats,
        };
        let handle = tokio::spawn(worker.run());
        (tx, handle)
    }

    async fn run(mut self) {
        tracing::info!(worker = %self.id, "worker started");

        // The single completion timer. Re-armed on every work start; the
        // select guard keeps it inert while idle.
        let timer = time::sleep(time::Duration::ZERO);
        tokio::pin!(timer);
        let mut inbound_open = true;

        loop {
            tokio::select! {
                arrival = self.inbound.recv(), if inbound_open => match arrival {
                    Some(payload) => match self.core.accept(payload) {
                        Admission::Started => {
                            self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                            timer.as_mut().reset(Instant::now() + self.config.processing_duration);
                            tracing::debug!(worker = %self.id, "processing started");
                        },
                        Admission::Queued => {
                            self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                            self.stats.backlog.store(self.core.backlog_len(), Ordering::Relaxed);
                            tracing::debug!(
                                worker = %self.id,
                                backlog = self.core.backlog_len(),
                                "busy, payload queued",
                            );
                        },
                        Admission::Rejected(payload) => {
                            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                worker = %self.id,
                                seq = payload.seq,
                                "backlog full, payload rejected",
                            );
                        },
                    },
                    None => {
                        inbound_open = false;
                        if !self.core.is_busy() {
                            break;
                        }
                    },
                },
                () = &mut timer, if self.core.is_busy() => {
                    self.stats.processed.fetch_add(1, Ordering::Relaxed);
                    match self.core.complete() {
                        Some(Completion::Next(finished)) => {
                            self.stats.backlog.store(self.core.backlog_len(), Ordering::Relaxed);
                            timer.as_mut().reset(Instant::now() + self.config.processing_duration);
                            tracing::debug!(worker = %self.id, seq = finished.seq, "processed, next started");
                        },
                        Some(Completion::Drained(finished)) => {
                            tracing::debug!(worker = %self.id, seq = finished.seq, "processed, idle");
                            if !inbound_open {
                                break;
                            }
                        },
                        None => unreachable!("timer branch is guarded on busy state"),
                    }
                },
            }
        }

        tracing::info!(worker = %self.id, "worker drained and stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn payload(seq: u64) -> Payload {
        Payload::synthetic(seq, 16).unwrap()
    }

    #[test]
    fn test_first_arrival_starts_without_queuing() {
        let mut core = WorkerCore::new(None);
        assert_eq!(core.state(), WorkerState::Idle);

        assert!(matches!(core.accept(payload(0)), Admission::Started));
        assert_eq!(core.state(), WorkerState::Busy);
        assert_eq!(core.backlog_len(), 0);
        assert_eq!(core.current().unwrap().seq, 0);
    }

    #[test]
    fn test_busy_arrivals_queue_in_order() {
        let mut core = WorkerCore::new(None);
        core.accept(payload(0));

        for seq in 1..=5 {
            assert!(matches!(core.accept(payload(seq)), Admission::Queued));
            assert_eq!(core.backlog_len(), seq as usize);
        }
        assert_eq!(core.state(), WorkerState::Busy);
    }

    #[test]
    fn test_completion_drains_fifo() {
        let mut core = WorkerCore::new(None);
        for seq in 0..4 {
            core.accept(payload(seq));
        }

        let mut finished = Vec::new();
        loop {
            match core.complete() {
                Some(Completion::Next(p)) => finished.push(p.seq),
                Some(Completion::Drained(p)) => {
                    finished.push(p.seq);
                    break;
                },
                None => panic!("completed while idle"),
            }
        }

        assert_eq!(finished, vec![0, 1, 2, 3]);
        assert_eq!(core.state(), WorkerState::Idle);
        assert_eq!(core.backlog_len(), 0);
    }

    #[test]
    fn test_single_payload_cycle_returns_to_initial_state() {
        let mut core = WorkerCore::new(None);
        core.accept(payload(9));

        let completion = core.complete().unwrap();
        assert!(matches!(completion, Completion::Drained(_)));
        assert_eq!(core.state(), WorkerState::Idle);
        assert_eq!(core.backlog_len(), 0);
        assert!(core.current().is_none());
    }

    #[test]
    fn test_complete_while_idle_is_none() {
        let mut core = WorkerCore::new(None);
        assert!(core.complete().is_none());
    }

    #[test]
    fn test_bounded_backlog_rejects_at_admission() {
        let mut core = WorkerCore::new(Some(2));
        core.accept(payload(0));
        core.accept(payload(1));
        core.accept(payload(2));

        match core.accept(payload(3)) {
            Admission::Rejected(p) => assert_eq!(p.seq, 3),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(core.backlog_len(), 2);

        // A completion frees one slot.
        assert!(matches!(core.complete(), Some(Completion::Next(_))));
        assert!(matches!(core.accept(payload(4)), Admission::Queued));
    }

    proptest! {
        #[test]
        fn prop_backlog_never_reorders(seqs in proptest::collection::vec(0_u64..10_000, 1..64)) {
            let mut core = WorkerCore::new(None);
            for &seq in &seqs {
                core.accept(payload(seq));
            }

            let mut finished = Vec::new();
            while let Some(completion) = core.complete() {
                match completion {
                    Completion::Next(p) | Completion::Drained(p) => finished.push(p.seq),
                }
            }

            prop_assert_eq!(finished, seqs);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_processes_one_payload_then_idles() {
        let stats = Arc::new(WorkerStats::default());
        let config =
            ConsumerConfig { processing_duration: Duration::from_secs(1), max_backlog: None };
        let (tx, handle) = Worker::spawn(EndpointId::new(0), config, Arc::clone(&stats));

        tx.send(payload(0)).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.backlog, 0);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_drains_backlog_after_channel_closes() {
        let stats = Arc::new(WorkerStats::default());
        let config =
            ConsumerConfig { processing_duration: Duration::from_secs(1), max_backlog: None };
        let (tx, handle) = Worker::spawn(EndpointId::new(1), config, Arc::clone(&stats));

        for seq in 0..5 {
            tx.send(payload(seq)).unwrap();
        }
        drop(tx);

        handle.await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.accepted, 5);
        assert_eq!(snapshot.processed, 5, "every admitted payload is processed");
        assert_eq!(snapshot.backlog, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_services_one_per_duration() {
        let stats = Arc::new(WorkerStats::default());
        let config =
            ConsumerConfig { processing_duration: Duration::from_secs(1), max_backlog: None };
        let (tx, handle) = Worker::spawn(EndpointId::new(2), config, Arc::clone(&stats));

        for seq in 0..10 {
            tx.send(payload(seq)).unwrap();
        }

        // After 3.5 virtual seconds exactly three completions have fired.
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(stats.snapshot().processed, 3);

        drop(tx);
        handle.await.unwrap();
        assert_eq!(stats.snapshot().processed, 10);
    }
}
