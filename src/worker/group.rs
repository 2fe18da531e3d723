//! WorkerGroup: dials connections, maps workers onto them, runs the
//! load (spec.md §4.5).

use super::{LoadOutcome, SharedConnection, Worker, WorkerConfig};
use crate::payload::PayloadGenerator;
use crate::reader::ResponseReader;
use crate::request_id::RequestId;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, warn};

/// Immutable configuration for a run (spec.md §3).
#[derive(Clone)]
pub struct GroupOptions {
    pub concurrency: u64,
    pub connections: u64,
    pub total_requests: u64,
    pub target_address: String,
    pub requests_per_second: f64,
    pub dial_timeout: Duration,
    pub generator: Arc<dyn PayloadGenerator>,
}

impl GroupOptions {
    /// `N' = ceil(N/C) * C`, the request count actually sent (spec.md §3).
    pub fn rounded_total_requests(&self) -> u64 {
        self.concurrency * self.total_requests.div_ceil(self.concurrency)
    }

    /// Per-worker quota, `N'/C`.
    pub fn per_worker_requests(&self) -> u64 {
        self.rounded_total_requests() / self.concurrency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum State {
    Built = 0,
    Running = 1,
    Draining = 2,
    Done = 3,
}

/// Dials `connections` TCP connections, fans `concurrency` workers across
/// them under the `C mod K == 0` invariant, and runs the load.
pub struct WorkerGroup {
    options: GroupOptions,
    response_reader: Option<Arc<ResponseReader>>,
    state: AtomicU8,
    stop_senders: Mutex<Vec<oneshot::Sender<()>>>,
    done_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl WorkerGroup {
    pub fn new(options: GroupOptions) -> Self {
        Self {
            options,
            response_reader: None,
            state: AtomicU8::new(State::Built as u8),
            stop_senders: Mutex::new(Vec::new()),
            done_rx: Mutex::new(None),
        }
    }

    pub fn with_response_reader(mut self, reader: Arc<ResponseReader>) -> Self {
        self.response_reader = Some(reader);
        self
    }

    /// Starts the run: dials connections, spawns workers and readers,
    /// returns the load-outcome channel. `Built -> Running`.
    pub async fn run(self: &Arc<Self>) -> mpsc::Receiver<LoadOutcome> {
        self.state.store(State::Running as u8, Ordering::SeqCst);

        let capacity = self.options.rounded_total_requests().max(1) as usize;
        let (load_tx, load_rx) = mpsc::channel(capacity);
        let (done_tx, done_rx) = oneshot::channel();
        *self.done_rx.lock().await = Some(done_rx);

        let c = self.options.concurrency;
        let k = self.options.connections;
        let s = c / k;

        let mut stop_senders = Vec::with_capacity(c as usize);
        let mut stop_receivers = Vec::with_capacity(c as usize);
        for _ in 0..c {
            let (tx, rx) = oneshot::channel();
            stop_senders.push(tx);
            stop_receivers.push(rx);
        }
        *self.stop_senders.lock().await = stop_senders;

        let group = Arc::clone(self);
        tokio::spawn(async move {
            group.orchestrate(s, load_tx, stop_receivers).await;
            group
                .state
                .store(State::Draining as u8, Ordering::SeqCst);
            let _ = done_tx.send(());
            group.state.store(State::Done as u8, Ordering::SeqCst);
        });

        load_rx
    }

    async fn orchestrate(
        &self,
        connections_shared_per_worker: u64,
        load_tx: mpsc::Sender<LoadOutcome>,
        stop_receivers: Vec<oneshot::Receiver<()>>,
    ) {
        let request_id = RequestId::new();
        let per_worker_requests = self.options.per_worker_requests();

        let mut current_connection: Option<SharedConnection> = None;
        let mut current_id: Option<u64> = None;
        let mut cursor: i64 = -1;
        let mut handles = Vec::with_capacity(self.options.concurrency as usize);

        for (count, stop_rx) in stop_receivers.into_iter().enumerate() {
            let count = count as u64;
            if count % connections_shared_per_worker == 0 || current_connection.is_none() {
                match tokio::time::timeout(
                    self.options.dial_timeout,
                    TcpStream::connect(&self.options.target_address),
                )
                .await
                {
                    Ok(Ok(stream)) => {
                        cursor += 1;
                        let id = cursor as u64;
                        let (read_half, write_half) = stream.into_split();
                        let shared = Arc::new(tokio::sync::Mutex::new(write_half));
                        current_connection = Some(Arc::clone(&shared));
                        current_id = Some(id);

                        if let Some(reader) = &self.response_reader {
                            reader.start_reading(read_half, id);
                        }
                    }
                    Ok(Err(err)) => {
                        warn!(
                            "dial to {} failed: {err}",
                            self.options.target_address
                        );
                    }
                    Err(_) => {
                        warn!(
                            "dial to {} timed out after {:?}",
                            self.options.target_address, self.options.dial_timeout
                        );
                    }
                }
            }

            let worker = Worker::new(WorkerConfig {
                total_requests: per_worker_requests,
                requests_per_second: self.options.requests_per_second,
                generator: Arc::clone(&self.options.generator),
                request_id: Arc::clone(&request_id),
                connection: current_connection.clone(),
                connection_id: current_id.map(|id| id as i64).unwrap_or(-1),
                stop: stop_rx,
                load_tx: load_tx.clone(),
            });
            handles.push(worker.run());
        }

        for handle in handles {
            if let Err(err) = handle.await {
                warn!("worker task panicked: {err}");
            }
        }

        info!("load completed");
    }

    /// `Running|Draining -> (stop requested)`: deposits one stop token
    /// per worker without blocking. A worker that has already exited
    /// leaves its token unread, which is harmless (spec.md §4.5 step 8,
    /// §9).
    pub async fn close(&self) {
        let senders = std::mem::take(&mut *self.stop_senders.lock().await);
        for sender in senders {
            let _ = sender.send(());
        }
    }

    /// Resolves once every worker task has exited.
    pub async fn done(&self) {
        let rx = self.done_rx.lock().await.take();
        if let Some(rx) = rx {
            let _ = rx.await;
        }
    }

    pub fn state_is_done(&self) -> bool {
        self.state.load(Ordering::SeqCst) == State::Done as u8
    }
}
