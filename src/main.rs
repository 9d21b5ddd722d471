use anyhow::Result;
use claimsjoin::{config::PipelineConfig, pipeline};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = PipelineConfig::load()?;
    info!(
        input = %cfg.input_dir.display(),
        registry = %cfg.registry_path.display(),
        output = %cfg.output_dir.display(),
        "configured"
    );

    // ─── 3) run ──────────────────────────────────────────────────────
    let report = pipeline::run(&cfg)?;

    if let Some(degraded) = &report.degraded {
        error!(%degraded, "run finished degraded; outputs are not enriched");
    } else {
        info!("done");
    }
    Ok(ExitCode::from(report.exit_status()))
}
