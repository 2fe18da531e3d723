//! Human-readable rendering of a [`super::Report`] (spec.md §6 "Report
//! format").

use super::metrics::{LoadMetrics, Report, ResponseMetrics};
use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

const TIME_FORMAT: &str = "%B %d, %Y %H:%M:%S %Z";

pub fn render(report: &Report) -> String {
    let mut out = String::new();
    render_load(&mut out, &report.load);
    if report.response.available_for_reporting {
        out.push('\n');
        render_response(&mut out, &report.response);
    }
    out
}

fn render_load(out: &mut String, metrics: &LoadMetrics) {
    let _ = writeln!(out, "LoadMetrics:");
    let _ = writeln!(out, "  Total Requests:     {}", metrics.total_requests);
    let _ = writeln!(out, "  Successful:         {}", metrics.success_count);
    let _ = writeln!(out, "  Errors:             {}", metrics.error_count);
    let _ = writeln!(out, "  Error Distribution: {}", distribution(&metrics.error_count_by_kind));
    let _ = writeln!(out, "  Total Connections:  {}", metrics.total_connections);
    let _ = writeln!(
        out,
        "  Total Payload Size: {}",
        ByteSize(metrics.total_payload_bytes)
    );
    let _ = writeln!(
        out,
        "  Average Payload:    {}",
        ByteSize(metrics.average_payload_bytes())
    );
    let _ = writeln!(out, "  Earliest Send:      {}", format_time(metrics.earliest_success_send_time));
    let _ = writeln!(out, "  Latest Send:        {}", format_time(metrics.latest_success_send_time));
    let _ = writeln!(out, "  Total Time:         {}", format_duration(metrics.total_time()));
}

fn render_response(out: &mut String, metrics: &ResponseMetrics) {
    let _ = writeln!(out, "ResponseMetrics:");
    let _ = writeln!(out, "  Total Responses:    {}", metrics.total_responses);
    let _ = writeln!(out, "  Successful:         {}", metrics.success_count);
    let _ = writeln!(out, "  Errors:             {}", metrics.error_count);
    let _ = writeln!(out, "  Error Distribution: {}", distribution(&metrics.error_count_by_kind));
    let _ = writeln!(
        out,
        "  Total Payload Size: {}",
        ByteSize(metrics.total_response_payload_bytes)
    );
    let _ = writeln!(
        out,
        "  Average Payload:    {}",
        ByteSize(metrics.average_response_payload_bytes())
    );
    let _ = writeln!(out, "  Earliest Receive:   {}", format_time(metrics.earliest_success_receive_time));
    let _ = writeln!(out, "  Latest Receive:     {}", format_time(metrics.latest_success_receive_time));
    let _ = writeln!(out, "  Total Time:         {}", format_duration(metrics.total_time()));
}

fn distribution(counts: &std::collections::HashMap<String, u64>) -> String {
    if counts.is_empty() {
        return "none".to_string();
    }
    let mut entries: Vec<_> = counts.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(kind, count)| format!("{kind}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time.format(TIME_FORMAT).to_string(),
        None => "n/a".to_string(),
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    format!("{:.3}s", duration.num_milliseconds() as f64 / 1000.0)
}
