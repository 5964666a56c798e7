use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ServerError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TEST_PAGE: &str = "test-popup.html";
pub const DEFAULT_OPEN_DELAY: Duration = Duration::from_secs(2);

/// Directory served when no root is configured.
///
/// Inside a source checkout this is the `static/` folder shipped with the
/// crate. A binary copied elsewhere serves from its own location instead:
/// `static/` next to the executable if present, else the executable's
/// directory.
pub fn default_root() -> PathBuf {
    let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join("static");
    let exe = std::env::current_exe().ok();
    pick_root(&bundled, exe.as_deref())
}

fn pick_root(bundled: &Path, exe: Option<&Path>) -> PathBuf {
    if bundled.is_dir() {
        return bundled.to_path_buf();
    }

    match exe.and_then(Path::parent) {
        Some(exe_dir) => {
            let beside = exe_dir.join("static");
            if beside.is_dir() {
                beside
            } else {
                exe_dir.to_path_buf()
            }
        }
        None => bundled.to_path_buf(),
    }
}

/// Everything the server needs to know up front. The served root is passed
/// explicitly instead of changing the process working directory.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub bind: IpAddr,
    pub port: u16,
    pub test_page: String,
    pub open_browser: bool,
    pub open_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            test_page: DEFAULT_TEST_PAGE.to_string(),
            open_browser: true,
            open_delay: DEFAULT_OPEN_DELAY,
        }
    }
}

impl ServerConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn test_page(mut self, page: impl Into<String>) -> Self {
        self.test_page = page.into();
        self
    }

    pub fn open_browser(mut self, enabled: bool) -> Self {
        self.open_browser = enabled;
        self
    }

    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn test_page_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url(),
            self.test_page.trim_start_matches('/')
        )
    }

    /// Canonical absolute path of the served root.
    pub fn resolve_root(&self) -> Result<PathBuf, ServerError> {
        let root = self.root.canonicalize().map_err(|source| ServerError::Root {
            path: self.root.clone(),
            source,
        })?;

        if !root.is_dir() {
            return Err(ServerError::Root {
                path: self.root.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        Ok(root)
    }
}
