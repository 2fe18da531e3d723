//! Reporter: aggregates the load and (optionally) response event
//! streams into a [`Report`] (spec.md §4.6).

pub mod format;
pub mod metrics;

pub use metrics::{LoadMetrics, Report, ResponseMetrics};

use crate::collab::ReportSink;
use crate::reader::ResponseOutcome;
use crate::worker::LoadOutcome;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

/// Owns the live `totalLoadReportedTillNow` counter and the two
/// aggregator tasks' done signals. Each aggregator task owns its own
/// `LoadMetrics`/`ResponseMetrics` value for its whole lifetime and
/// hands the finished value back over its done channel; nothing else
/// mutates it (spec.md §5).
pub struct Reporter {
    total_load_reported: Arc<AtomicU64>,
    response_enabled: AtomicBool,
    load_done: Mutex<Option<oneshot::Receiver<LoadMetrics>>>,
    response_done: Mutex<Option<oneshot::Receiver<ResponseMetrics>>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            total_load_reported: Arc::new(AtomicU64::new(0)),
            response_enabled: AtomicBool::new(false),
            load_done: Mutex::new(None),
            response_done: Mutex::new(None),
        }
    }

    pub fn total_load_reported_till_now(&self) -> u64 {
        self.total_load_reported.load(Ordering::Relaxed)
    }

    /// Spawns the load aggregator task. Response reading is disabled
    /// for this run; `print_report` omits the `ResponseMetrics` block.
    pub async fn run_load_metrics_only(&self, load_rx: mpsc::Receiver<LoadOutcome>) {
        let (done_tx, done_rx) = oneshot::channel();
        *self.load_done.lock().await = Some(done_rx);
        self.spawn_load_aggregator(load_rx, done_tx);
    }

    /// Spawns both aggregator tasks.
    pub async fn run_load_and_response_metrics(
        &self,
        load_rx: mpsc::Receiver<LoadOutcome>,
        response_rx: mpsc::Receiver<ResponseOutcome>,
    ) {
        self.response_enabled.store(true, Ordering::SeqCst);

        let (load_done_tx, load_done_rx) = oneshot::channel();
        *self.load_done.lock().await = Some(load_done_rx);
        self.spawn_load_aggregator(load_rx, load_done_tx);

        let (response_done_tx, response_done_rx) = oneshot::channel();
        *self.response_done.lock().await = Some(response_done_rx);
        tokio::spawn(Self::response_aggregator(response_rx, response_done_tx));
    }

    fn spawn_load_aggregator(
        &self,
        mut load_rx: mpsc::Receiver<LoadOutcome>,
        done_tx: oneshot::Sender<LoadMetrics>,
    ) {
        let counter = Arc::clone(&self.total_load_reported);
        tokio::spawn(async move {
            let mut metrics = LoadMetrics::default();
            while let Some(outcome) = load_rx.recv().await {
                counter.fetch_add(1, Ordering::Relaxed);
                metrics.record(
                    outcome.error.map(|e| e.to_string()),
                    outcome.payload_length_bytes,
                    outcome.sent_at,
                    outcome.connection_id,
                );
            }
            metrics.finish();
            let _ = done_tx.send(metrics);
        });
    }

    async fn response_aggregator(
        mut response_rx: mpsc::Receiver<ResponseOutcome>,
        done_tx: oneshot::Sender<ResponseMetrics>,
    ) {
        let mut metrics = ResponseMetrics {
            available_for_reporting: true,
            ..Default::default()
        };
        while let Some(outcome) = response_rx.recv().await {
            metrics.record(
                outcome.error.map(|e| e.to_string()),
                outcome.payload_length_bytes,
                outcome.received_at,
            );
        }
        let _ = done_tx.send(metrics);
    }

    /// Blocks until both aggregator tasks have drained their channels,
    /// then writes the finished report to `sink`.
    pub async fn print_report(&self, sink: &dyn ReportSink) {
        let load_rx = self.load_done.lock().await.take();
        let load = match load_rx {
            Some(rx) => rx.await.unwrap_or_default(),
            None => LoadMetrics::default(),
        };

        let response = if self.response_enabled.load(Ordering::SeqCst) {
            let response_rx = self.response_done.lock().await.take();
            match response_rx {
                Some(rx) => rx.await.unwrap_or_default(),
                None => ResponseMetrics::default(),
            }
        } else {
            ResponseMetrics::default()
        };

        sink.write(&Report { load, response });
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OutcomeError;
    use std::sync::atomic::AtomicBool as StdAtomicBool;

    struct CapturingSink {
        called: StdAtomicBool,
    }

    impl ReportSink for CapturingSink {
        fn write(&self, report: &Report) {
            self.called.store(true, Ordering::SeqCst);
            assert_eq!(report.load.total_requests, 3);
            assert_eq!(report.load.success_count, 2);
            assert_eq!(report.load.error_count, 1);
            assert_eq!(report.load.total_connections, 1);
        }
    }

    #[tokio::test]
    async fn load_only_aggregates_and_reports() {
        let reporter = Reporter::new();
        let (load_tx, load_rx) = mpsc::channel(8);
        reporter.run_load_metrics_only(load_rx).await;

        let now = chrono::Utc::now();
        load_tx
            .send(LoadOutcome {
                error: None,
                payload_length_bytes: 10,
                sent_at: now,
                connection_id: 0,
            })
            .await
            .unwrap();
        load_tx
            .send(LoadOutcome {
                error: None,
                payload_length_bytes: 20,
                sent_at: now,
                connection_id: 0,
            })
            .await
            .unwrap();
        load_tx
            .send(LoadOutcome {
                error: Some(OutcomeError::NilConnection),
                payload_length_bytes: 0,
                sent_at: now,
                connection_id: -1,
            })
            .await
            .unwrap();
        drop(load_tx);

        let sink = CapturingSink {
            called: StdAtomicBool::new(false),
        };
        reporter.print_report(&sink).await;
        assert!(sink.called.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_report_renders_error_distribution_as_none() {
        let rendered = format::render(&Report::default());
        assert!(rendered.contains("none"));
        assert!(!rendered.contains("ResponseMetrics"));
    }
}
