//! Tracing subscriber setup, following the teacher's registry/env-filter/
//! fmt-layer pattern verbatim.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("blast={log_level},info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
