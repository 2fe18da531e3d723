//! Aggregated metrics built from a stream of load or response events
//! (spec.md §3 `LoadMetrics` / `ResponseMetrics`).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::HashSet;

/// Aggregation over the `LoadOutcome` stream.
#[derive(Debug, Clone, Default)]
pub struct LoadMetrics {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub error_count_by_kind: HashMap<String, u64>,
    pub total_connections: u64,
    pub total_payload_bytes: u64,
    pub earliest_success_send_time: Option<DateTime<Utc>>,
    pub latest_success_send_time: Option<DateTime<Utc>>,
    seen_connection_ids: HashSet<i64>,
}

impl LoadMetrics {
    pub(super) fn record(
        &mut self,
        error: Option<String>,
        payload_length_bytes: usize,
        sent_at: DateTime<Utc>,
        connection_id: i64,
    ) {
        self.total_requests += 1;

        if connection_id != -1 {
            self.seen_connection_ids.insert(connection_id);
        }

        match error {
            Some(kind) => {
                self.error_count += 1;
                *self.error_count_by_kind.entry(kind).or_insert(0) += 1;
            }
            None => {
                self.success_count += 1;
                self.total_payload_bytes += payload_length_bytes as u64;
                self.earliest_success_send_time = Some(
                    self.earliest_success_send_time
                        .map_or(sent_at, |t| t.min(sent_at)),
                );
                self.latest_success_send_time = Some(
                    self.latest_success_send_time
                        .map_or(sent_at, |t| t.max(sent_at)),
                );
            }
        }
    }

    pub(super) fn finish(&mut self) {
        self.total_connections = self.seen_connection_ids.len() as u64;
    }

    pub fn average_payload_bytes(&self) -> u64 {
        if self.success_count == 0 {
            0
        } else {
            self.total_payload_bytes / self.success_count
        }
    }

    pub fn total_time(&self) -> chrono::Duration {
        match (self.earliest_success_send_time, self.latest_success_send_time) {
            (Some(earliest), Some(latest)) => latest - earliest,
            _ => chrono::Duration::zero(),
        }
    }
}

/// Aggregation over the `ResponseOutcome` stream. Mirrors
/// [`LoadMetrics`] minus the connection-id bookkeeping, plus the
/// `available_for_reporting` flag (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct ResponseMetrics {
    pub total_responses: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub error_count_by_kind: HashMap<String, u64>,
    pub total_response_payload_bytes: u64,
    pub earliest_success_receive_time: Option<DateTime<Utc>>,
    pub latest_success_receive_time: Option<DateTime<Utc>>,
    pub available_for_reporting: bool,
}

impl ResponseMetrics {
    pub(super) fn record(
        &mut self,
        error: Option<String>,
        payload_length_bytes: usize,
        received_at: DateTime<Utc>,
    ) {
        self.total_responses += 1;

        match error {
            Some(kind) => {
                self.error_count += 1;
                *self.error_count_by_kind.entry(kind).or_insert(0) += 1;
            }
            None => {
                self.success_count += 1;
                self.total_response_payload_bytes += payload_length_bytes as u64;
                self.earliest_success_receive_time = Some(
                    self.earliest_success_receive_time
                        .map_or(received_at, |t| t.min(received_at)),
                );
                self.latest_success_receive_time = Some(
                    self.latest_success_receive_time
                        .map_or(received_at, |t| t.max(received_at)),
                );
            }
        }
    }

    pub fn average_response_payload_bytes(&self) -> u64 {
        if self.success_count == 0 {
            0
        } else {
            self.total_response_payload_bytes / self.success_count
        }
    }

    pub fn total_time(&self) -> chrono::Duration {
        match (
            self.earliest_success_receive_time,
            self.latest_success_receive_time,
        ) {
            (Some(earliest), Some(latest)) => latest - earliest,
            _ => chrono::Duration::zero(),
        }
    }
}

/// The full aggregated report (spec.md §3 `Report`).
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub load: LoadMetrics,
    pub response: ResponseMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_payload_bytes_is_zero_with_no_successes() {
        let metrics = LoadMetrics::default();
        assert_eq!(metrics.average_payload_bytes(), 0);
    }

    #[test]
    fn connection_ids_are_deduped_and_sentinel_excluded() {
        let mut metrics = LoadMetrics::default();
        let now = Utc::now();
        metrics.record(None, 10, now, 0);
        metrics.record(None, 10, now, 0);
        metrics.record(Some("nil connection".to_string()), 0, now, -1);
        metrics.record(None, 10, now, 1);
        metrics.finish();

        assert_eq!(metrics.total_connections, 2);
        assert_eq!(metrics.success_count, 3);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.average_payload_bytes(), 10);
    }
}
