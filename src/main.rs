//! Blast - TCP load generator for servers that maintain persistent connections

use blast::collab::{ExitSignal, PayloadProvider, ReportSink};
use blast::config::Args;
use blast::coordinator::{Coordinator, Quota, ResponseWatch};
use blast::payload::file::FilePayloadProvider;
use blast::payload::process::ProcessPayloadProvider;
use blast::payload::ConstantPayloadGenerator;
use blast::reader::ResponseReader;
use blast::reporter::{format, Report, Reporter};
use blast::worker::group::GroupOptions;
use blast::worker::WorkerGroup;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    blast::logging::init_tracing(&args.log_level);

    if let Err(message) = args.validate() {
        eprintln!("configuration error: {message}");
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.effective_cpus())
        .enable_all()
        .build()?;

    runtime.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let payload = load_payload(&args)?;
    let group_options = GroupOptions {
        concurrency: args.concurrency,
        connections: args.connections,
        total_requests: args.requests,
        target_address: args.target.clone(),
        requests_per_second: args.rps,
        dial_timeout: Duration::from_millis(args.dial_timeout_ms),
        generator: Arc::new(ConstantPayloadGenerator::new(payload)),
    };
    let rounded_total_requests = group_options.rounded_total_requests();

    info!("======================================");
    info!("  Blast - TCP load generator");
    info!("======================================");
    info!("Target:       {}", args.target);
    info!("Concurrency:  {}", args.concurrency);
    info!("Connections:  {}", args.connections);
    info!(
        "Requests:     {} (rounded up to {})",
        args.requests, rounded_total_requests
    );
    info!("Rate limit:   {} req/s per worker", args.rps);
    info!("Dial timeout: {}ms", args.dial_timeout_ms);
    info!("Max duration: {}s", args.max_duration_secs);
    info!(
        "Responses:    {}",
        if args.read_responses { "enabled" } else { "disabled" }
    );
    info!("======================================");

    let reporter = Arc::new(Reporter::new());

    let (group, response_watch) = if args.read_responses {
        let (response_tx, response_rx) = tokio::sync::mpsc::channel(1_000_000);
        let reader = Arc::new(ResponseReader::new(
            args.response_size_bytes,
            Duration::from_millis(args.read_deadline_ms),
            response_tx,
        ));
        let group = Arc::new(WorkerGroup::new(group_options).with_response_reader(Arc::clone(&reader)));
        let load_rx = group.run().await;
        reporter.run_load_and_response_metrics(load_rx, response_rx).await;

        let quota = match (args.total_responses_quota, args.successful_responses_quota) {
            (Some(quota), _) => Quota::TotalResponses(quota),
            (_, Some(quota)) => Quota::SuccessfulResponses(quota),
            (None, None) => Quota::TotalResponses(rounded_total_requests),
        };
        (group, Some(ResponseWatch { reader, quota }))
    } else {
        let group = Arc::new(WorkerGroup::new(group_options));
        let load_rx = group.run().await;
        reporter.run_load_metrics_only(load_rx).await;
        (group, None)
    };

    let coordinator = Coordinator::new(
        group,
        reporter,
        response_watch,
        rounded_total_requests,
        Duration::from_secs(args.max_duration_secs),
    );

    let sink = StdoutReportSink;
    coordinator.wait_for_completion(CtrlCSignal, &sink).await;

    Ok(())
}

fn load_payload(args: &Args) -> anyhow::Result<Vec<u8>> {
    if let Some(path) = &args.payload_file {
        let provider = FilePayloadProvider::new(path)?;
        return Ok(provider.get());
    }
    if let Some(command) = &args.payload_process {
        let provider = ProcessPayloadProvider::new(command)?;
        return Ok(provider.get());
    }
    Ok(Vec::new())
}

struct StdoutReportSink;

impl ReportSink for StdoutReportSink {
    fn write(&self, report: &Report) {
        println!("{}", format::render(report));
    }
}

struct CtrlCSignal;

#[async_trait::async_trait]
impl ExitSignal for CtrlCSignal {
    async fn wait(&mut self) {
        let _ = tokio::signal::ctrl_c().await;
    }
}
