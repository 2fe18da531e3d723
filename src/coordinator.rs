//! Coordinator: starts the load, watches termination conditions, and
//! runs the ordered shutdown (spec.md §4.7).

use crate::collab::{ExitSignal, ReportSink};
use crate::reader::ResponseReader;
use crate::reporter::Reporter;
use crate::worker::WorkerGroup;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Response-reading quota target, checked on every inspection tick.
#[derive(Debug, Clone, Copy)]
pub enum Quota {
    TotalResponses(u64),
    SuccessfulResponses(u64),
}

/// What to watch for on top of load completion (spec.md §3
/// `responseOptions`).
pub struct ResponseWatch {
    pub reader: Arc<ResponseReader>,
    pub quota: Quota,
}

const INSPECTION_PERIOD: Duration = Duration::from_millis(5);

pub struct Coordinator {
    group: Arc<WorkerGroup>,
    reporter: Arc<Reporter>,
    response: Option<ResponseWatch>,
    rounded_total_requests: u64,
    max_run_duration: Duration,
}

impl Coordinator {
    pub fn new(
        group: Arc<WorkerGroup>,
        reporter: Arc<Reporter>,
        response: Option<ResponseWatch>,
        rounded_total_requests: u64,
        max_run_duration: Duration,
    ) -> Self {
        Self {
            group,
            reporter,
            response,
            rounded_total_requests,
            max_run_duration,
        }
    }

    fn quota_met(&self) -> bool {
        match &self.response {
            None => self.reporter.total_load_reported_till_now() >= self.rounded_total_requests,
            Some(watch) => match watch.quota {
                Quota::TotalResponses(quota) => watch.reader.total_responses_read() >= quota,
                Quota::SuccessfulResponses(quota) => {
                    watch.reader.total_successful_responses_read() >= quota
                }
            },
        }
    }

    /// Runs the load to completion, then prints the report to `sink`.
    pub async fn wait_for_completion(&self, mut exit_signal: impl ExitSignal, sink: &dyn ReportSink) {
        let mut inspection = tokio::time::interval(INSPECTION_PERIOD);
        inspection.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let max_duration = tokio::time::sleep(self.max_run_duration);
        tokio::pin!(max_duration);

        let mut load_done = false;
        let mut shutdown_triggered = false;

        loop {
            if shutdown_triggered {
                break;
            }

            tokio::select! {
                _ = inspection.tick() => {
                    if !load_done && self.group.state_is_done() {
                        info!("load completed");
                        load_done = true;
                    }
                    if self.quota_met() {
                        info!("quota met, shutting down");
                        shutdown_triggered = true;
                    }
                }
                _ = &mut max_duration => {
                    info!("max run duration elapsed, shutting down");
                    shutdown_triggered = true;
                }
                _ = exit_signal.wait() => {
                    info!("external stop signal received, shutting down");
                    shutdown_triggered = true;
                }
            }
        }

        self.shutdown().await;
        self.reporter.print_report(sink).await;
    }

    /// Externally callable shutdown trigger. In this implementation the
    /// select loop in `wait_for_completion` owns the triggering; this
    /// method is for callers that hold a `Coordinator` handle outside
    /// that loop (e.g. a signal handler wired independently of
    /// `ExitSignal`).
    pub async fn stop(&self) {
        self.group.close().await;
        if let Some(watch) = &self.response {
            watch.reader.close();
        }
    }

    /// Ordered shutdown (spec.md §4.7): stop workers, then readers,
    /// then wait for the group to finish draining.
    async fn shutdown(&self) {
        self.group.close().await;
        if let Some(watch) = &self.response {
            watch.reader.close();
        }
        self.group.done().await;
        if let Some(watch) = &self.response {
            watch.reader.join().await;
        }
    }
}
