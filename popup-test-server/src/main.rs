use anyhow::Context;
use popup_test_server::{run, ServerConfig};
use tracing_subscriber::EnvFilter;

// Every connection is driven on this one thread; no worker pool.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout carries the banner and access log.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(ServerConfig::default())
        .await
        .context("popup test server failed")?;

    Ok(())
}
