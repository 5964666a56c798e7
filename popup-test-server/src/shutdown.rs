use std::time::Duration;

use tracing::{error, info};

/// How long in-flight connections get to finish once shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Resolves on Ctrl-C. If the handler cannot be installed the server just
/// keeps running.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            println!("\n🛑 Server stopped");
            info!("interrupt received, shutting down");
        }
        Err(e) => {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
