//! Filesystem resolver.
//!
//! # Data Flow
//! ```text
//! canonical request path
//!     → join under root (lexical: `..` refused)
//!     → stat
//!         not found → SPA index | 404
//!         directory → index file | listing.rs + render.rs | 403
//!         file      → containment check → fingerprint.rs → 304 | range.rs → 206 | 416 | stream
//!     → error pages (custom file or status text)
//! ```
//!
//! # Design Decisions
//! - Stateless: every call re-reads the filesystem
//! - Containment is checked twice: lexically before any stat, then on the
//!   canonicalized target so symlinks cannot leave the root
//! - Only "not found" is a client error; other I/O failures are logged and
//!   answered with a bare 500

pub mod fingerprint;
pub mod listing;
pub mod range;
pub mod render;

use std::collections::HashMap;
use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::Response,
};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::config::ServeConfig;
use crate::observability::LogSink;
use crate::security::path::canonical_path;

pub use listing::{format_size, sort_entries, DirectoryEntry};
pub use range::{ByteRange, RangeRequest};

/// Why a path could not be served.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A file or directory found under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub absolute_path: PathBuf,
    pub is_directory: bool,
    pub modified: SystemTime,
    pub size: u64,
    pub fingerprint: String,
}

impl ResolvedResource {
    fn new(absolute_path: PathBuf, metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        Self {
            fingerprint: fingerprint::fingerprint(modified, metadata.len()),
            is_directory: metadata.is_dir(),
            size: metadata.len(),
            modified,
            absolute_path,
        }
    }
}

/// Terminal state of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    File(ResolvedResource),
    Listing {
        directory: ResolvedResource,
        entries: Vec<DirectoryEntry>,
    },
}

/// Resolver settings taken from the server configuration.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub root: PathBuf,
    pub index_files: Vec<String>,
    pub directory_listing: bool,
    pub spa_mode: bool,
    pub spa_index: String,
    pub enable_etags: bool,
    pub hide_hidden: bool,
    pub error_pages: HashMap<u16, String>,
}

impl ResolverOptions {
    pub fn from_config(config: &ServeConfig) -> Self {
        let features = &config.features;
        let error_pages = features
            .custom_error_pages
            .iter()
            .filter_map(|(status, page)| match status.trim().parse::<u16>() {
                Ok(code) => Some((code, page.clone())),
                Err(_) => {
                    tracing::warn!(status = %status, "Ignoring custom error page with invalid status");
                    None
                }
            })
            .collect();

        Self {
            root: PathBuf::from(&config.server.root_dir),
            index_files: features.index_files.clone(),
            directory_listing: features.directory_listing,
            spa_mode: features.spa_mode,
            spa_index: features.spa_index.clone(),
            enable_etags: config.performance.enable_etags,
            hide_hidden: config.security.block_hidden_files,
            error_pages,
        }
    }
}

/// Maps canonical request paths to responses.
pub struct Resolver {
    options: ResolverOptions,
    canonical_root: PathBuf,
    sink: Arc<dyn LogSink>,
}

impl Resolver {
    /// Fails when the root cannot be canonicalized (missing, unreadable).
    pub fn new(options: ResolverOptions, sink: Arc<dyn LogSink>) -> io::Result<Self> {
        let canonical_root = std::fs::canonicalize(&options.root)?;
        Ok(Self {
            options,
            canonical_root,
            sink,
        })
    }

    pub fn root(&self) -> &Path {
        &self.canonical_root
    }

    /// Join `path` under the root, refusing anything but plain segments.
    fn join_under_root(&self, path: &str) -> Result<PathBuf, ResolveError> {
        let mut joined = self.canonical_root.clone();
        for segment in path.split(['/', '\\']) {
            if segment.is_empty() || segment == "." {
                continue;
            }
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => joined.push(part),
                _ => return Err(ResolveError::Forbidden),
            }
        }
        Ok(joined)
    }

    /// Require the canonical form of `target` to stay under the root.
    async fn ensure_contained(&self, target: &Path) -> Result<(), ResolveError> {
        let real = tokio::fs::canonicalize(target)
            .await
            .map_err(|e| ResolveError::io(target, e))?;
        if real.starts_with(&self.canonical_root) {
            Ok(())
        } else {
            tracing::warn!(path = %target.display(), "Resolved path escapes the document root");
            Err(ResolveError::Forbidden)
        }
    }

    async fn stat(&self, target: &Path) -> Result<Option<Metadata>, ResolveError> {
        match tokio::fs::metadata(target).await {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                Ok(None)
            }
            Err(e) => Err(ResolveError::io(target, e)),
        }
    }

    /// Resolve a canonical request path to a file or a listing.
    pub async fn resolve(&self, path: &str) -> Result<Resolution, ResolveError> {
        let target = self.join_under_root(path)?;

        let Some(metadata) = self.stat(&target).await? else {
            if self.options.spa_mode {
                return self.resolve_spa_index().await;
            }
            return Err(ResolveError::NotFound);
        };
        self.ensure_contained(&target).await?;

        if metadata.is_dir() {
            self.resolve_directory(target, &metadata, path).await
        } else {
            Ok(Resolution::File(ResolvedResource::new(target, &metadata)))
        }
    }

    async fn resolve_spa_index(&self) -> Result<Resolution, ResolveError> {
        let index = self.join_under_root(&self.options.spa_index)?;
        match self.stat(&index).await? {
            Some(metadata) if metadata.is_file() => {
                self.ensure_contained(&index).await?;
                Ok(Resolution::File(ResolvedResource::new(index, &metadata)))
            }
            _ => Err(ResolveError::NotFound),
        }
    }

    async fn resolve_directory(
        &self,
        directory: PathBuf,
        metadata: &Metadata,
        request_path: &str,
    ) -> Result<Resolution, ResolveError> {
        for name in &self.options.index_files {
            let candidate = directory.join(name);
            if let Some(index) = self.stat(&candidate).await? {
                if index.is_file() {
                    self.ensure_contained(&candidate).await?;
                    return Ok(Resolution::File(ResolvedResource::new(candidate, &index)));
                }
            }
        }

        if !self.options.directory_listing {
            return Err(ResolveError::Forbidden);
        }

        let entries = listing::read_entries(&directory, request_path, self.options.hide_hidden)
            .await
            .map_err(|e| ResolveError::io(&directory, e))?;
        Ok(Resolution::Listing {
            directory: ResolvedResource::new(directory, metadata),
            entries,
        })
    }

    /// Produce the response for `request`, errors included.
    ///
    /// Only the request head is consulted; callers split the body off first.
    pub async fn serve(&self, request: &Request<()>) -> Response {
        let Some(path) = canonical_path(request) else {
            return self.error_response(StatusCode::BAD_REQUEST).await;
        };

        let outcome = match self.resolve(&path).await {
            Ok(Resolution::File(resource)) => self.file_response(&resource, request).await,
            Ok(Resolution::Listing { entries, .. }) => Ok(listing_response(&path, &entries)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => response,
            Err(e) => {
                if matches!(e, ResolveError::Io { .. }) {
                    self.sink.error(&e.to_string());
                }
                self.error_response(e.status_code()).await
            }
        }
    }

    async fn file_response(
        &self,
        resource: &ResolvedResource,
        request: &Request<()>,
    ) -> Result<Response, ResolveError> {
        let mut headers = HeaderMap::new();
        if let Ok(last_modified) = HeaderValue::from_str(&fingerprint::http_date(resource.modified)) {
            headers.insert(header::LAST_MODIFIED, last_modified);
        }

        let if_none_match = request
            .headers()
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());

        let mut not_modified = false;
        if self.options.enable_etags {
            if let Ok(etag) = HeaderValue::from_str(&resource.fingerprint) {
                headers.insert(header::ETAG, etag);
            }
            not_modified = if_none_match
                .is_some_and(|value| fingerprint::if_none_match(value, &resource.fingerprint));
        }
        if if_none_match.is_none() {
            not_modified = request
                .headers()
                .get(header::IF_MODIFIED_SINCE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|value| fingerprint::not_modified_since(value, resource.modified));
        }

        if not_modified {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NOT_MODIFIED;
            *response.headers_mut() = headers;
            return Ok(response);
        }

        let requested = requested_range(request, resource, headers.get(header::ETAG));
        let (status, length, range) = match requested {
            RangeRequest::Unsatisfiable => {
                let mut response = self.error_response(StatusCode::RANGE_NOT_SATISFIABLE).await;
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", resource.size)) {
                    response.headers_mut().insert(header::CONTENT_RANGE, value);
                }
                return Ok(response);
            }
            RangeRequest::Partial(range) => {
                if let Ok(value) = HeaderValue::from_str(&range.content_range(resource.size)) {
                    headers.insert(header::CONTENT_RANGE, value);
                }
                (StatusCode::PARTIAL_CONTENT, range.length(), Some(range))
            }
            RangeRequest::Full => (StatusCode::OK, resource.size, None),
        };

        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(header::CONTENT_TYPE, content_type(&resource.absolute_path));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

        let body = if request.method() == Method::HEAD {
            Body::empty()
        } else {
            let io_error = |e: io::Error| ResolveError::io(&resource.absolute_path, e);
            let mut file = tokio::fs::File::open(&resource.absolute_path)
                .await
                .map_err(io_error)?;
            match range {
                Some(range) => {
                    file.seek(SeekFrom::Start(range.start)).await.map_err(io_error)?;
                    Body::from_stream(ReaderStream::new(file.take(range.length())))
                }
                None => Body::from_stream(ReaderStream::new(file)),
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Error body for `status`: the configured page when it exists under the
    /// root, the status text otherwise. The status code is kept either way.
    pub async fn error_response(&self, status: StatusCode) -> Response {
        if let Some(page) = self.options.error_pages.get(&status.as_u16()) {
            match self.read_error_page(page).await {
                Ok(Some((path, contents))) => {
                    let mut response = Response::new(Body::from(contents));
                    *response.status_mut() = status;
                    response
                        .headers_mut()
                        .insert(header::CONTENT_TYPE, content_type(&path));
                    return response;
                }
                Ok(None) => {}
                Err(e) => self.sink.error(&e.to_string()),
            }
        }

        let mut response = Response::new(Body::from(
            status.canonical_reason().unwrap_or("Error").to_string(),
        ));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    async fn read_error_page(&self, page: &str) -> Result<Option<(PathBuf, Vec<u8>)>, ResolveError> {
        let Ok(path) = self.join_under_root(page) else {
            return Ok(None);
        };
        match self.stat(&path).await? {
            Some(metadata) if metadata.is_file() => {
                if self.ensure_contained(&path).await.is_err() {
                    return Ok(None);
                }
                let contents = tokio::fs::read(&path)
                    .await
                    .map_err(|e| ResolveError::io(&path, e))?;
                Ok(Some((path, contents)))
            }
            _ => Ok(None),
        }
    }
}

/// The range to serve, honouring `If-Range`.
fn requested_range(
    request: &Request<()>,
    resource: &ResolvedResource,
    etag: Option<&HeaderValue>,
) -> RangeRequest {
    let Some(value) = request.headers().get(header::RANGE).and_then(|v| v.to_str().ok()) else {
        return RangeRequest::Full;
    };
    let still_valid = match request.headers().get(header::IF_RANGE) {
        None => true,
        Some(if_range) => if_range.to_str().is_ok_and(|if_range| {
            let etag = etag.and_then(|v| v.to_str().ok());
            range::if_range_matches(if_range, etag, resource.modified)
        }),
    };
    if still_valid {
        range::parse_range(value, resource.size)
    } else {
        RangeRequest::Full
    }
}

fn listing_response(path: &str, entries: &[DirectoryEntry]) -> Response {
    let mut response = Response::new(Body::from(render::render_listing(path, entries)));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// MIME type from the file extension; `text/*` types are marked UTF-8.
pub fn content_type(path: &Path) -> HeaderValue {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let value = if mime.type_() == mime_guess::mime::TEXT && mime.get_param("charset").is_none() {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    };
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::tests::RecordingSink;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/b.txt"), "b").unwrap();
        fs::write(dir.path().join("docs/a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("docs/A")).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("404.html"), "custom missing").unwrap();
        dir
    }

    fn options(root: &Path) -> ResolverOptions {
        ResolverOptions {
            root: root.to_path_buf(),
            index_files: vec!["index.html".into(), "index.htm".into()],
            directory_listing: false,
            spa_mode: false,
            spa_index: "index.html".into(),
            enable_etags: true,
            hide_hidden: true,
            error_pages: HashMap::new(),
        }
    }

    fn resolver(options: ResolverOptions) -> (Resolver, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (Resolver::new(options, sink.clone()).unwrap(), sink)
    }

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_serve_future_is_send() {
        fn assert_send<T: Send>(_: T) {}
        let dir = site();
        let (resolver, _) = resolver(options(dir.path()));
        let request = get("/style.css");
        assert_send(resolver.serve(&request));
    }

    #[tokio::test]
    async fn test_serves_file_with_validators() {
        let dir = site();
        let (resolver, _) = resolver(options(dir.path()));

        let response = resolver.serve(&get("/style.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "6");
        assert!(response.headers().contains_key(header::ETAG));
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
        assert_eq!(body(response).await, "body{}");
    }

    #[tokio::test]
    async fn test_matching_etag_yields_304() {
        let dir = site();
        let (resolver, _) = resolver(options(dir.path()));

        let first = resolver.serve(&get("/style.css")).await;
        let etag = first.headers()[header::ETAG].clone();

        let request = Request::builder()
            .uri("/style.css")
            .header(header::IF_NONE_MATCH, etag.clone())
            .body(())
            .unwrap();
        let second = resolver.serve(&request).await;
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(second.headers()[header::ETAG], etag);
        assert!(body(second).await.is_empty());
    }

    #[tokio::test]
    async fn test_etags_disabled() {
        let dir = site();
        let mut opts = options(dir.path());
        opts.enable_etags = false;
        let (resolver, _) = resolver(opts);

        let response = resolver.serve(&get("/style.css")).await;
        assert!(!response.headers().contains_key(header::ETAG));
    }

    #[tokio::test]
    async fn test_directory_index_and_forbidden() {
        let dir = site();
        let (resolver, _) = resolver(options(dir.path()));

        let root = resolver.serve(&get("/")).await;
        assert_eq!(root.status(), StatusCode::OK);
        assert_eq!(body(root).await, "<h1>home</h1>");

        let docs = resolver.serve(&get("/docs")).await;
        assert_eq!(docs.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_directory_listing_order() {
        let dir = site();
        let mut opts = options(dir.path());
        opts.directory_listing = true;
        let (resolver, _) = resolver(opts);

        match resolver.resolve("/docs").await.unwrap() {
            Resolution::Listing { directory, entries } => {
                assert!(directory.is_directory);
                let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
                assert_eq!(names, vec!["A", "a.txt", "b.txt"]);
            }
            other => panic!("expected listing, got {other:?}"),
        }

        let response = resolver.serve(&get("/docs")).await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(body(response).await.contains("href=\"/docs/a.txt\""));
    }

    #[tokio::test]
    async fn test_not_found_and_spa_fallback() {
        let dir = site();
        let (plain, _) = resolver(options(dir.path()));
        let missing = plain.serve(&get("/app/route")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(missing).await, "Not Found");

        let mut opts = options(dir.path());
        opts.spa_mode = true;
        let (spa, _) = resolver(opts);
        let fallback = spa.serve(&get("/app/route")).await;
        assert_eq!(fallback.status(), StatusCode::OK);
        assert_eq!(body(fallback).await, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_spa_without_index_is_404() {
        let dir = site();
        let mut opts = options(dir.path());
        opts.spa_mode = true;
        opts.spa_index = "missing.html".into();
        let (resolver, _) = resolver(opts);
        assert_eq!(
            resolver.serve(&get("/nowhere")).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_custom_error_page_keeps_status() {
        let dir = site();
        let mut opts = options(dir.path());
        opts.error_pages.insert(404, "/404.html".into());
        opts.error_pages.insert(403, "missing-403.html".into());
        let (resolver, _) = resolver(opts);

        let missing = resolver.serve(&get("/nope")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(body(missing).await, "custom missing");

        let forbidden = resolver.serve(&get("/docs")).await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(body(forbidden).await, "Forbidden");
    }

    #[tokio::test]
    async fn test_lexical_traversal_refused() {
        let dir = site();
        let (resolver, _) = resolver(options(dir.path()));
        assert!(matches!(
            resolver.resolve("../etc/passwd").await,
            Err(ResolveError::Forbidden)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_refused() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        let dir = site();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("link.txt"))
            .unwrap();

        let (resolver, _) = resolver(options(dir.path()));
        let response = resolver.serve(&get("/link.txt")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_file_as_directory_is_not_found() {
        let dir = site();
        let (resolver, sink) = resolver(options(dir.path()));
        let response = resolver.serve(&get("/style.css/child")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(sink.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a.unknownext")), "application/octet-stream");
    }
}
