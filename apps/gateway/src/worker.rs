use clap::Parser;

use aigw_core::bootstrap::CliArgs;
use aigw_core::{job_engine, webhook_engine};

const POLL_TIMEOUT_SECS: f64 = 5.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let boot = aigw_core::bootstrap::bootstrap(&args).await?;
    let state = boot.state;

    let jobs_state = state.clone();
    let jobs_loop = tokio::spawn(async move {
        loop {
            if let Err(err) = job_engine::run_one_tick(&jobs_state, POLL_TIMEOUT_SECS).await {
                tracing::error!(%err, "job worker tick failed");
            }
        }
    });

    let webhooks_state = state.clone();
    let webhooks_loop = tokio::spawn(async move {
        loop {
            if let Err(err) = webhook_engine::run_one_tick(&webhooks_state, POLL_TIMEOUT_SECS).await {
                tracing::error!(%err, "webhook worker tick failed");
            }
        }
    });

    tracing::info!("gateway worker started");
    tokio::select! {
        _ = jobs_loop => {}
        _ = webhooks_loop => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("gateway worker shutting down");
        }
    }
    Ok(())
}
