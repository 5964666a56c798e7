//! Static file server used to manually test the extension popup.
//!
//! Serves a directory over plain HTTP on port 8080, stamps permissive CORS
//! headers on every response, prints one access-log line per request and
//! opens the test page in the default browser shortly after startup.

pub mod access_log;
pub mod browser;
pub mod config;
pub mod cors;
pub mod error;
pub mod server;
pub mod shutdown;
pub mod static_files;

pub use access_log::{AccessLog, LogSink, StdoutSink};
pub use browser::{spawn_open_after, BrowserLauncher, SystemBrowser};
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{router, run, TestServer};
