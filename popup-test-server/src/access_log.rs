use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode, Version},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Destination for human-readable access-log lines.
pub trait LogSink: Send + Sync + 'static {
    fn write_line(&self, line: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

#[derive(Debug, Clone)]
pub struct AccessEntry {
    pub timestamp: DateTime<Utc>,
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub status: StatusCode,
}

impl AccessEntry {
    /// `[date] "METHOD target VERSION" status -`
    pub fn format_line(&self) -> String {
        format!(
            "[{}] \"{} {} {:?}\" {} -",
            http_date(self.timestamp),
            self.method,
            self.target,
            self.version,
            self.status.as_u16()
        )
    }
}

/// RFC 7231 IMF-fixdate, e.g. `Sat, 17 Oct 2026 12:00:00 GMT`.
pub fn http_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[derive(Clone)]
pub struct AccessLog {
    sink: Arc<dyn LogSink>,
}

impl AccessLog {
    pub fn new(sink: impl LogSink) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn stdout() -> Self {
        Self::new(StdoutSink)
    }

    pub fn record(&self, entry: &AccessEntry) {
        self.sink.write_line(&entry.format_line());
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::stdout()
    }
}

// One line per request, whatever the outcome.
pub async fn access_log_middleware(
    State(log): State<AccessLog>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    let method = request.method().clone();
    let version = request.version();
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    let entry = AccessEntry {
        timestamp: Utc::now(),
        method,
        target,
        version,
        status: response.status(),
    };
    log.record(&entry);

    debug!(
        method = %entry.method,
        path = %entry.target,
        status = entry.status.as_u16(),
        duration_ms = start_time.elapsed().as_millis() as u64,
        "request served"
    );

    response
}
