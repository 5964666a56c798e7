use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::access_log::{access_log_middleware, AccessLog};
use crate::browser::{spawn_open_after, BrowserLauncher, SystemBrowser};
use crate::config::ServerConfig;
use crate::cors::add_cors_headers;
use crate::error::ServerError;
use crate::shutdown::{shutdown_signal, SHUTDOWN_GRACE};
use crate::static_files;

/// Static files, then one access-log line, then CORS headers on the way out.
pub fn router(root: PathBuf, access_log: AccessLog) -> Router {
    static_files::router(root)
        .layer(middleware::from_fn_with_state(access_log, access_log_middleware))
        .layer(middleware::map_response(add_cors_headers))
}

/// A bound listener plus everything needed to start serving from it.
pub struct TestServer {
    config: ServerConfig,
    root: PathBuf,
    listener: TcpListener,
    local_addr: SocketAddr,
    launcher: Arc<dyn BrowserLauncher>,
    access_log: AccessLog,
}

impl TestServer {
    /// Resolve the served root and bind the listener. Fails fast, before any
    /// serving, if the port is taken.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let root = config.resolve_root()?;
        Self::bind_resolved(config, root).await
    }

    /// Bind with a root that `ServerConfig::resolve_root` already produced.
    async fn bind_resolved(mut config: ServerConfig, root: PathBuf) -> Result<Self, ServerError> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::from_bind(addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::from_bind(addr, e))?;

        // Port 0 means "pick one"; URLs should point at what we actually got.
        config.port = local_addr.port();

        Ok(Self {
            config,
            root,
            listener,
            local_addr,
            launcher: Arc::new(SystemBrowser),
            access_log: AccessLog::stdout(),
        })
    }

    pub fn with_launcher(mut self, launcher: impl BrowserLauncher) -> Self {
        self.launcher = Arc::new(launcher);
        self
    }

    pub fn with_access_log(mut self, access_log: AccessLog) -> Self {
        self.access_log = access_log;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until `shutdown` resolves. Connections still open
    /// `SHUTDOWN_GRACE` after that are dropped.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.config.open_browser {
            // Never awaited; dropping the handle does not cancel the task.
            let _open_task = spawn_open_after(
                self.launcher.clone(),
                self.config.test_page_url(),
                self.config.open_delay,
            );
        }

        let app = router(self.root, self.access_log);

        let (stopping_tx, stopping_rx) = tokio::sync::oneshot::channel::<()>();
        let signal = async move {
            shutdown.await;
            let _ = stopping_tx.send(());
        };

        let serve = axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(serve);

        let grace_expired = async move {
            match stopping_rx.await {
                Ok(()) => tokio::time::sleep(SHUTDOWN_GRACE).await,
                Err(_) => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = &mut serve => result?,
            _ = grace_expired => {
                warn!("connections still open after {:?}, closing anyway", SHUTDOWN_GRACE);
            }
        }

        Ok(())
    }
}

fn print_banner(config: &ServerConfig, root: &Path) {
    println!("🚀 Starting test server...");
    println!("📂 Working directory: {}", root.display());
    println!("🌐 Server address: {}", config.base_url());
    println!("🧪 Test page: {}", config.test_page_url());
    println!("{}", "=".repeat(50));
}

/// Banner, bind, confirmation, auto-open, then serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let root = config.resolve_root()?;
    print_banner(&config, &root);

    let server = TestServer::bind_resolved(config, root).await?;
    println!("✅ Server started on port {}", server.local_addr().port());
    info!(addr = %server.local_addr(), root = %server.root().display(), "listening");

    server.serve_until(shutdown_signal()).await
}
