//! Worker: sends one worker's share of requests (spec.md §4.4).

pub mod group;

use crate::errors::OutcomeError;
use crate::payload::PayloadGenerator;
use crate::request_id::RequestId;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::debug;

pub use group::{GroupOptions, WorkerGroup};

/// The write half of a dialed connection, shared by every worker mapped
/// onto it. Writes are serialized through the mutex so whole-payload
/// writes from different workers never interleave on the wire (spec.md
/// §5, §9).
pub type SharedConnection = Arc<Mutex<OwnedWriteHalf>>;

/// One attempted send (spec.md §3 `LoadOutcome`).
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub error: Option<OutcomeError>,
    pub payload_length_bytes: usize,
    pub sent_at: chrono::DateTime<chrono::Utc>,
    /// Dense id in `[0, K)`, or `-1` if no connection was established.
    pub connection_id: i64,
}

/// Configuration for a single worker task.
pub struct WorkerConfig {
    pub total_requests: u64,
    pub requests_per_second: f64,
    pub generator: Arc<dyn PayloadGenerator>,
    pub request_id: Arc<RequestId>,
    pub connection: Option<SharedConnection>,
    pub connection_id: i64,
    pub stop: oneshot::Receiver<()>,
    pub load_tx: mpsc::Sender<LoadOutcome>,
}

pub struct Worker {
    config: WorkerConfig,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// Spawns the worker task and returns its handle.
    ///
    /// A panic inside `run_worker` is isolated by tokio at the task
    /// boundary; it surfaces here as `Err` on the returned `JoinHandle`,
    /// which `WorkerGroup` logs and otherwise ignores (spec.md §4.4,
    /// §7: "the task exits. The group still completes when the
    /// remaining tasks finish").
    pub fn run(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(run_worker(self.config))
    }
}

async fn run_worker(mut config: WorkerConfig) {
    let tick_period = if config.requests_per_second > 0.0 {
        Some(Duration::from_micros(
            (1_000_000.0 / config.requests_per_second) as u64,
        ))
    } else {
        None
    };
    // `interval()`'s first tick resolves immediately; use `interval_at` so
    // the full period is waited before the first send too (spec.md §4.4
    // step 2b).
    let mut interval = tick_period
        .map(|period| tokio::time::interval_at(tokio::time::Instant::now() + period, period));

    for _ in 0..config.total_requests {
        if config.stop.try_recv().is_ok() {
            return;
        }

        if let Some(interval) = interval.as_mut() {
            interval.tick().await;
        }

        let outcome = match &config.connection {
            None => LoadOutcome {
                error: Some(OutcomeError::NilConnection),
                payload_length_bytes: 0,
                sent_at: chrono::Utc::now(),
                connection_id: -1,
            },
            Some(connection) => {
                let request_id = config.request_id.next();
                let payload = config.generator.generate(request_id);
                let len = payload.len();
                let write_result = {
                    let mut guard = connection.lock().await;
                    guard.write_all(&payload).await
                };
                LoadOutcome {
                    error: write_result.err().map(OutcomeError::from),
                    payload_length_bytes: len,
                    sent_at: chrono::Utc::now(),
                    connection_id: config.connection_id,
                }
            }
        };

        if config.load_tx.send(outcome).await.is_err() {
            debug!("load channel closed, worker exiting early");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ConstantPayloadGenerator;

    #[tokio::test]
    async fn nil_connection_emits_nil_connection_error_for_every_request() {
        let (load_tx, mut load_rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = oneshot::channel();

        let worker = Worker::new(WorkerConfig {
            total_requests: 3,
            requests_per_second: 0.0,
            generator: Arc::new(ConstantPayloadGenerator::new(b"x".to_vec())),
            request_id: RequestId::new(),
            connection: None,
            connection_id: -1,
            stop: stop_rx,
            load_tx,
        });

        worker.run().await.unwrap();

        let mut count = 0;
        while let Some(outcome) = load_rx.recv().await {
            assert!(matches!(outcome.error, Some(OutcomeError::NilConnection)));
            assert_eq!(outcome.payload_length_bytes, 0);
            assert_eq!(outcome.connection_id, -1);
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn stop_signal_ends_iteration_early() {
        let (load_tx, mut load_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel();
        stop_tx.send(()).unwrap();

        let worker = Worker::new(WorkerConfig {
            total_requests: 5,
            requests_per_second: 0.0,
            generator: Arc::new(ConstantPayloadGenerator::new(b"x".to_vec())),
            request_id: RequestId::new(),
            connection: None,
            connection_id: -1,
            stop: stop_rx,
            load_tx,
        });

        worker.run().await.unwrap();
        load_rx.close();
        assert!(load_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_worker_waits_full_period_before_every_send() {
        let (load_tx, mut load_rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = oneshot::channel();

        let worker = Worker::new(WorkerConfig {
            total_requests: 3,
            requests_per_second: 10.0, // 100ms period
            generator: Arc::new(ConstantPayloadGenerator::new(b"x".to_vec())),
            request_id: RequestId::new(),
            connection: None,
            connection_id: -1,
            stop: stop_rx,
            load_tx,
        });
        let handle = worker.run();

        // Nothing sent yet: the first request also waits a full period.
        tokio::time::advance(Duration::from_millis(99)).await;
        assert!(load_rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        load_rx.recv().await.unwrap();

        tokio::time::advance(Duration::from_millis(99)).await;
        assert!(load_rx.try_recv().is_err());
        tokio::time::advance(Duration::from_millis(1)).await;
        load_rx.recv().await.unwrap();

        tokio::time::advance(Duration::from_millis(100)).await;
        load_rx.recv().await.unwrap();

        handle.await.unwrap();
    }
}
