use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub trait BrowserLauncher: Send + Sync + 'static {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Wait `delay`, then open `url` once. Nothing is reported back: the caller
/// may drop the handle and the attempt carries on (or is abandoned at exit).
/// There is no ordering relative to the first incoming request.
pub fn spawn_open_after(
    launcher: Arc<dyn BrowserLauncher>,
    url: String,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let target = url.clone();
        match tokio::task::spawn_blocking(move || launcher.open(&target)).await {
            Ok(Ok(())) => debug!(url = %url, "opened test page in browser"),
            Ok(Err(e)) => warn!(url = %url, error = %e, "could not open browser"),
            Err(e) => warn!(url = %url, error = %e, "browser launcher panicked"),
        }
    })
}
