use clap::Parser;

use aigw_core::bootstrap::CliArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let boot = aigw_core::bootstrap::bootstrap(&args).await?;

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let app = aigw_router::build_router(boot.state.clone());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "gateway server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
