//! File serving rooted at the configured directory.
//!
//! `ServeDir` does the heavy lifting (MIME types, `index.html`, trailing-slash
//! redirects, ranges, traversal checks). When it comes up empty for a
//! directory without an index page, the fallback renders a listing instead.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::State,
    handler::Handler,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use tower_http::services::ServeDir;
use tracing::warn;

#[derive(Debug, Clone)]
struct ServedRoot(Arc<PathBuf>);

pub fn router(root: PathBuf) -> Router {
    let listing = directory_listing.with_state(ServedRoot(Arc::new(root.clone())));
    Router::new().fallback_service(ServeDir::new(root).fallback(listing))
}

async fn directory_listing(State(root): State<ServedRoot>, uri: Uri) -> Response {
    let request_path = uri.path();
    if !request_path.ends_with('/') {
        return not_found();
    }

    let Some(dir) = resolve_dir(&root.0, request_path) else {
        return not_found();
    };

    match tokio::fs::metadata(&dir).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return not_found(),
    }

    let display_path = urlencoding::decode(request_path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| request_path.to_string());

    match render_listing(&dir, &display_path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to list directory");
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

/// Map a request path onto the served root, refusing anything that would
/// climb out of it.
pub fn resolve_dir(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;
    let mut resolved = root.to_path_buf();

    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

#[derive(Debug, PartialEq, Eq)]
struct ListingEntry {
    name: String,
    is_dir: bool,
}

async fn read_entries(dir: &Path) -> std::io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

async fn render_listing(dir: &Path, display_path: &str) -> std::io::Result<String> {
    let entries = read_entries(dir).await?;
    Ok(listing_html(display_path, &entries))
}

fn listing_html(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));

    let mut html = String::new();
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", title);
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{}</h1>", title);
    html.push_str("<hr>\n<ul>\n");

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<li><a href=\"{}{}\">{}{}</a></li>",
            urlencoding::encode(&entry.name),
            suffix,
            escape_html(&entry.name),
            suffix
        );
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use tower::ServiceExt;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("test-popup.html"), "<h1>popup</h1>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets").join("b.js"), "1;").unwrap();
        std::fs::write(dir.path().join("assets").join("A.css"), "a{}").unwrap();
        std::fs::create_dir(dir.path().join("assets").join("img")).unwrap();
        dir
    }

    async fn get(root: &Path, uri: &str) -> Response {
        router(root.to_path_buf())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_resolve_dir_rejects_traversal() {
        let root = Path::new("/srv/popup");
        assert_eq!(
            resolve_dir(root, "/assets/img/"),
            Some(PathBuf::from("/srv/popup/assets/img"))
        );
        assert_eq!(resolve_dir(root, "/"), Some(PathBuf::from("/srv/popup")));
        assert_eq!(resolve_dir(root, "/../etc/"), None);
        assert_eq!(resolve_dir(root, "/assets/%2e%2e/%2e%2e/"), None);
    }

    #[test]
    fn test_listing_escapes_and_encodes_names() {
        let entries = vec![
            ListingEntry { name: "a b&c.html".to_string(), is_dir: false },
            ListingEntry { name: "sub".to_string(), is_dir: true },
        ];
        let html = listing_html("/x<y>/", &entries);

        assert!(html.contains("<title>Directory listing for /x&lt;y&gt;/</title>"));
        assert!(html.contains("<a href=\"a%20b%26c.html\">a b&amp;c.html</a>"));
        assert!(html.contains("<a href=\"sub/\">sub/</a>"));
    }

    #[tokio::test]
    async fn test_serves_html_file() {
        let dir = fixture();
        let response = get(dir.path(), "/test-popup.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        assert_eq!(body_string(response).await, "<h1>popup</h1>");
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = fixture();
        let response = get(dir.path(), "/does-not-exist.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_directory_without_index_is_listed() {
        let dir = fixture();
        let response = get(dir.path(), "/assets/").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("<h1>Directory listing for /assets/</h1>"));

        let a = body.find("A.css").unwrap();
        let b = body.find("b.js").unwrap();
        let img = body.find("img/").unwrap();
        assert!(a < b && b < img, "entries not sorted: {}", body);
    }

    #[tokio::test]
    async fn test_directory_with_index_serves_index() {
        let dir = fixture();
        std::fs::write(dir.path().join("assets").join("index.html"), "index").unwrap();

        let response = get(dir.path(), "/assets/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "index");
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let dir = fixture();
        let response = get(dir.path(), "/assets").await;

        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[header::LOCATION], "/assets/");
    }
}
