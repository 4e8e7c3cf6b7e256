//! Local analysis runner.
//!
//! Usage: `vlens <source> [--mode fine|standard|broad] [--user ID] [--job-id ID]`

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vlens_gateway::{GatewayConfig, InferenceGateway};
use vlens_media::FfmpegExtractor;
use vlens_models::{AnalysisMode, AnalysisRequest, JobId, Phase};
use vlens_pipeline::{InMemoryLedger, PipelineConfig, PipelineOrchestrator, ProgressTracker};

const DEFAULT_LOCAL_CREDITS: u64 = 1000;
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Run one video analysis job locally and print the report as JSON.
#[derive(Debug, Parser)]
#[command(name = "vlens", version, about)]
struct Cli {
    /// Local path or http(s) URL of the video
    source: String,

    /// Sampling density: fine, standard or broad
    #[arg(long, default_value_t = AnalysisMode::Standard, value_parser = AnalysisMode::from_str)]
    mode: AnalysisMode,

    /// User charged for the analysis
    #[arg(long = "user", env = "VLENS_USER", default_value = "local")]
    user_id: String,

    /// Request id; generated when omitted
    #[arg(long)]
    job_id: Option<String>,
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vlens=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn init_metrics() -> anyhow::Result<()> {
    let Ok(addr) = std::env::var("VLENS_METRICS_ADDR") else {
        return Ok(());
    };
    let addr: SocketAddr = addr.parse().context("invalid VLENS_METRICS_ADDR")?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!("Serving metrics on {}", addr);
    Ok(())
}

/// Log progress changes for `job_id` until aborted.
fn spawn_progress_logger(progress: ProgressTracker, job_id: JobId) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<(Phase, u8)> = None;
        let mut ticker = tokio::time::interval(PROGRESS_POLL_INTERVAL);
        loop {
            ticker.tick().await;
            let Some(entry) = progress.read(&job_id) else {
                continue;
            };
            if last != Some((entry.phase, entry.percent)) {
                info!(
                    job_id = %job_id,
                    phase = %entry.phase,
                    percent = entry.percent,
                    eta_seconds = ?entry.eta_seconds,
                    "{}", entry.message
                );
                last = Some((entry.phase, entry.percent));
            }
        }
    })
}

async fn run(args: Cli) -> anyhow::Result<()> {
    init_metrics()?;

    let pipeline_config = PipelineConfig::from_env();
    let gateway_config = GatewayConfig::from_env()?;
    info!("Pipeline config: {:?}", pipeline_config);

    let credits = std::env::var("VLENS_LOCAL_CREDITS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_LOCAL_CREDITS);
    let ledger = Arc::new(InMemoryLedger::with_balance(args.user_id.clone(), credits));

    let gateway = InferenceGateway::gemini(gateway_config)?;
    let extractor = Arc::new(FfmpegExtractor::new(pipeline_config.media_timeout_secs));
    let orchestrator = PipelineOrchestrator::new(pipeline_config, gateway, extractor, ledger);
    let sweeper = orchestrator.spawn_sweeper();

    let job_id = args.job_id.map(JobId::from_string).unwrap_or_default();
    let request = AnalysisRequest::new(args.source, args.user_id, args.mode).with_job_id(job_id.clone());
    let poller = spawn_progress_logger(orchestrator.progress().clone(), job_id);

    let result = orchestrator.run(request).await;
    poller.abort();
    sweeper.abort();

    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_tracing();

    info!("Starting vlens");

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
