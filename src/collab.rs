//! Collaborator interfaces consumed by the core (spec.md §2, §6).
//!
//! The core never reads argv, opens payload files, forks processes, or
//! formats a report template itself — it depends only on these traits.
//! Concrete implementations (CLI parsing, file/process payload
//! acquisition, the text report) live alongside `main.rs` and are thin
//! adapters over them.

use crate::reporter::Report;

/// Supplies the bytes for a single request.
///
/// `get` is called once at startup by the binary to obtain a
/// [`crate::payload::PayloadGenerator`] — the hot loop never calls back
/// into a `PayloadProvider` (see spec.md §9, "Payload provision as a
/// collaborator").
pub trait PayloadProvider: Send + Sync {
    fn get(&self) -> Vec<u8>;
}

/// Receives the finished [`Report`] for presentation.
///
/// The core calls this exactly once, after both aggregator tasks have
/// drained (spec.md §4.6 `printReport`). Implementations decide how to
/// render it; the core only guarantees ordering and single delivery.
pub trait ReportSink {
    fn write(&self, report: &Report);
}

/// An external stop signal the coordinator selects over alongside its
/// own termination conditions (spec.md §4.7).
///
/// `wait` resolves exactly once, when the signal fires; it is safe to
/// call from a single task only (the coordinator owns its one
/// `ExitSignal`).
#[async_trait::async_trait]
pub trait ExitSignal: Send {
    async fn wait(&mut self);
}

/// An `ExitSignal` that never fires — used when the binary has no
/// external stop source (tests, or a run driven purely by `-n`/`-z`).
pub struct NeverSignal;

#[async_trait::async_trait]
impl ExitSignal for NeverSignal {
    async fn wait(&mut self) {
        std::future::pending::<()>().await;
    }
}
