//! Configuration for Blast
//!
//! CLI arguments and environment variable handling using clap, the same
//! flat-struct-plus-`validate` shape used throughout this codebase.

use clap::Parser;

/// Blast - TCP load generator for servers that maintain persistent connections
#[derive(Parser, Debug, Clone)]
#[command(name = "blast")]
#[command(about = "TCP load generator for servers that maintain persistent connections")]
pub struct Args {
    /// Target address (host:port)
    pub target: String,

    /// Total number of requests to send (rounded up to a multiple of concurrency)
    #[arg(short = 'n', long, env = "BLAST_REQUESTS", default_value_t = 1)]
    pub requests: u64,

    /// Number of concurrent worker tasks
    #[arg(short = 'c', long, env = "BLAST_CONCURRENCY", default_value_t = 1)]
    pub concurrency: u64,

    /// Number of TCP connections shared across the workers
    #[arg(long = "conn", env = "BLAST_CONNECTIONS", default_value_t = 1)]
    pub connections: u64,

    /// Path to a file whose contents are sent as the request payload
    #[arg(short = 'f', long = "file", env = "BLAST_PAYLOAD_FILE")]
    pub payload_file: Option<String>,

    /// External command whose stdout is captured as the request payload
    #[arg(short = 'p', long = "process", env = "BLAST_PAYLOAD_PROCESS")]
    pub payload_process: Option<String>,

    /// Requests per second, per worker (0 disables throttling)
    #[arg(long, env = "BLAST_RPS", default_value_t = 0.0)]
    pub rps: f64,

    /// Maximum run duration, in seconds
    #[arg(short = 'z', long = "duration", env = "BLAST_MAX_DURATION_SECS", default_value_t = 60)]
    pub max_duration_secs: u64,

    /// Dial timeout, in milliseconds
    #[arg(short = 't', long = "dial-timeout", env = "BLAST_DIAL_TIMEOUT_MS", default_value_t = 5_000)]
    pub dial_timeout_ms: u64,

    /// Enable response reading
    #[arg(long = "Rr", env = "BLAST_READ_RESPONSES", default_value_t = false)]
    pub read_responses: bool,

    /// Response size in bytes (required when --Rr is set)
    #[arg(long = "Rrs", env = "BLAST_RESPONSE_SIZE_BYTES", default_value_t = 0)]
    pub response_size_bytes: usize,

    /// Per-read deadline, in milliseconds (0 disables the deadline)
    #[arg(long = "Rrd", env = "BLAST_READ_DEADLINE_MS", default_value_t = 0)]
    pub read_deadline_ms: u64,

    /// Stop once this many responses (successful or not) have been read
    #[arg(long = "Rtr", env = "BLAST_TOTAL_RESPONSES_QUOTA")]
    pub total_responses_quota: Option<u64>,

    /// Stop once this many successful responses have been read
    #[arg(long = "Rsr", env = "BLAST_SUCCESSFUL_RESPONSES_QUOTA")]
    pub successful_responses_quota: Option<u64>,

    /// Number of tokio worker threads (defaults to the host's CPU count)
    #[arg(long, env = "BLAST_CPUS")]
    pub cpus: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Effective tokio worker-thread count (spec.md §4 "cpus flag
    /// honored for real").
    pub fn effective_cpus(&self) -> usize {
        self.cpus.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Validates every CLI constraint in spec.md §6's table.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency < 1 {
            return Err("concurrency (-c) must be >= 1".to_string());
        }
        if self.requests < 1 || self.requests < self.concurrency {
            return Err("requests (-n) must be >= 1 and >= concurrency".to_string());
        }
        if self.connections < 1 || self.connections > self.concurrency {
            return Err("connections (--conn) must satisfy 1 <= conn <= concurrency".to_string());
        }
        if self.concurrency % self.connections != 0 {
            return Err("concurrency must be an exact multiple of connections".to_string());
        }
        if self.payload_file.is_some() && self.payload_process.is_some() {
            return Err("-f and -p are mutually exclusive".to_string());
        }
        if let Some(path) = &self.payload_file {
            if path.is_empty() {
                return Err("-f requires a non-empty path".to_string());
            }
        }
        if self.rps < 0.0 {
            return Err("rps must be >= 0".to_string());
        }
        if self.max_duration_secs == 0 {
            return Err("max run duration (-z) must be > 0".to_string());
        }
        if self.dial_timeout_ms == 0 {
            return Err("dial timeout (-t) must be > 0".to_string());
        }
        if self.read_responses && self.response_size_bytes == 0 {
            return Err("--Rrs must be >= 1 when --Rr is set".to_string());
        }
        if self.total_responses_quota.is_some() && self.successful_responses_quota.is_some() {
            return Err("--Rtr and --Rsr are mutually exclusive".to_string());
        }
        if let Some(cpus) = self.cpus {
            if cpus < 1 {
                return Err("cpus must be >= 1".to_string());
            }
        }
        Ok(())
    }
}
