// File: src/static_files.rs
// Purpose: Directory mounts served ahead of routing

use axum::body::Body;
use axum::http::{Request, StatusCode};
use jsweb_router::Method;
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

use crate::app::Outcome;
use crate::blueprint::normalize_prefix;
use crate::Response;

/// A directory served under a URL prefix
///
/// `StaticFiles::new("/static", "public")` answers `/static/css/site.css`
/// from `public/css/site.css`. Paths that climb out of the directory with
/// `..` are refused with 403; missing files and directories are not found.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    url_path: String,
    dir: PathBuf,
}

impl StaticFiles {
    pub fn new(url_path: impl AsRef<str>, dir: impl Into<PathBuf>) -> Self {
        Self {
            url_path: normalize_prefix(url_path.as_ref()),
            dir: dir.into(),
        }
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Part of `path` below the mount, or `None` when `path` is outside it
    pub fn relative<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.url_path.as_str())?;
        if rest.is_empty() {
            return Some(rest);
        }
        rest.strip_prefix('/')
    }

    /// Serves `relative` (still percent-encoded) from the mounted directory
    pub async fn serve(&self, method: &Method, relative: &str) -> Outcome {
        if escapes_mount(relative) {
            warn!(mount = %self.url_path, path = relative, "static path leaves the mounted directory");
            return Outcome::Response(Response::text("Forbidden").with_status(StatusCode::FORBIDDEN));
        }

        let request = match Request::builder()
            .method(method.as_str())
            .uri(format!("/{}", relative))
            .body(Body::empty())
        {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, path = relative, "static path is not a valid URI");
                return Outcome::NotFound;
            }
        };

        let service = ServeDir::new(&self.dir).append_index_html_on_directories(false);
        let response = match service.oneshot(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "static file service failed");
                return Outcome::Response(
                    Response::text("Internal Server Error")
                        .with_status(StatusCode::INTERNAL_SERVER_ERROR),
                );
            }
        };

        let (parts, body) = response.into_parts();
        match parts.status {
            StatusCode::NOT_FOUND => return Outcome::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => {
                return Outcome::MethodNotAllowed {
                    allowed: vec![Method::Get, Method::Head],
                }
            }
            _ => {}
        }

        let body = match axum::body::to_bytes(Body::new(body), usize::MAX).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, dir = ?self.dir, "could not read static file");
                return Outcome::Response(
                    Response::text("Internal Server Error")
                        .with_status(StatusCode::INTERNAL_SERVER_ERROR),
                );
            }
        };

        let mut response = Response::new(parts.status).with_body(body);
        *response.headers_mut() = parts.headers;
        Outcome::Response(response)
    }
}

/// Whether any decoded segment of `relative` is `..`
fn escapes_mount(relative: &str) -> bool {
    let decoded = urlencoding::decode(relative)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| relative.to_string());
    decoded.split(['/', '\\']).any(|segment| segment == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let mount = StaticFiles::new("static/", "public");
        assert_eq!(mount.url_path(), "/static");
        assert_eq!(mount.relative("/static/css/site.css"), Some("css/site.css"));
        assert_eq!(mount.relative("/static"), Some(""));
        assert_eq!(mount.relative("/staticky/a.css"), None);
        assert_eq!(mount.relative("/other/a.css"), None);
    }

    #[test]
    fn test_root_mount() {
        let mount = StaticFiles::new("/", "public");
        assert_eq!(mount.relative("/robots.txt"), Some("robots.txt"));
    }

    #[test]
    fn test_traversal_detection() {
        assert!(escapes_mount("../secret.txt"));
        assert!(escapes_mount("css/../../secret.txt"));
        assert!(escapes_mount("%2e%2e/secret.txt"));
        assert!(escapes_mount("..%5csecret.txt"));
        assert!(!escapes_mount("css/site.css"));
        assert!(!escapes_mount("notes..txt"));
    }
}
