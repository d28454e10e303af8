//! File serving, caching validators, listings and fallbacks through the router.

use std::fs;

use async_compression::tokio::bufread::GzipDecoder;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use tokio::io::AsyncReadExt;

mod common;
use common::{body_bytes, body_string, config_for, get, router, send, site, BIG_TEXT_LINE};

fn with_header(uri: &str, name: header::HeaderName, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_serves_index_for_root() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let response = send(&router, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(body_string(response).await, "<h1>home</h1>");
}

#[tokio::test]
async fn test_etag_round_trip() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let first = send(&router, get("/app.js")).await;
    assert_eq!(first.status(), StatusCode::OK);
    let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));

    let second = send(&router, with_header("/app.js", header::IF_NONE_MATCH, &etag)).await;
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(second).await.is_empty());

    let stale = send(&router, with_header("/app.js", header::IF_NONE_MATCH, "\"0-0\"")).await;
    assert_eq!(stale.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_etag_changes_with_content() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let first = send(&router, get("/app.js")).await;
    let etag = first.headers()[header::ETAG].clone();

    fs::write(dir.path().join("app.js"), "console.log('a much longer body');").unwrap();
    let after = send(
        &router,
        with_header("/app.js", header::IF_NONE_MATCH, etag.to_str().unwrap()),
    )
    .await;
    assert_eq!(after.status(), StatusCode::OK);
    assert_ne!(after.headers()[header::ETAG], etag);
}

#[tokio::test]
async fn test_if_modified_since() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let first = send(&router, get("/style.css")).await;
    let last_modified = first.headers()[header::LAST_MODIFIED].to_str().unwrap().to_string();

    let response = send(
        &router,
        with_header("/style.css", header::IF_MODIFIED_SINCE, &last_modified),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    let old = send(
        &router,
        with_header("/style.css", header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT"),
    )
    .await;
    assert_eq!(old.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_head_has_length_but_no_body() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/style.css")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "20");
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_directory_without_index_is_forbidden() {
    let dir = site();
    let router = router(config_for(dir.path()));
    assert_eq!(send(&router, get("/docs")).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_directory_listing() {
    let dir = site();
    let mut config = config_for(dir.path());
    config.features.directory_listing = true;
    let router = router(config);

    let response = send(&router, get("/docs/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");

    let html = body_string(response).await;
    let dir_pos = html.find("href=\"/docs/A\"").unwrap();
    let a_pos = html.find("href=\"/docs/a.txt\"").unwrap();
    let b_pos = html.find("href=\"/docs/b.txt\"").unwrap();
    assert!(dir_pos < a_pos && a_pos < b_pos);
    assert!(!html.contains(".hidden"));
}

#[tokio::test]
async fn test_listing_shows_hidden_when_not_blocked() {
    let dir = site();
    let mut config = config_for(dir.path());
    config.features.directory_listing = true;
    config.security.block_hidden_files = false;
    let router = router(config);

    let html = body_string(send(&router, get("/docs")).await).await;
    assert!(html.contains(".hidden"));
}

#[tokio::test]
async fn test_not_found_default_and_custom() {
    let dir = site();
    let plain = router(config_for(dir.path()));
    let missing = send(&plain, get("/nope.txt")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(missing).await, "Not Found");

    let mut config = config_for(dir.path());
    config
        .features
        .custom_error_pages
        .insert("404".into(), "404.html".into());
    let custom = router(config);
    let missing = send(&custom, get("/nope.txt")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(missing).await, "<p>custom not found</p>");
}

#[tokio::test]
async fn test_spa_fallback() {
    let dir = site();
    let mut config = config_for(dir.path());
    config.features.spa_mode = true;
    let router = router(config);

    let response = send(&router, get("/dashboard/settings")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<h1>home</h1>");

    // real files still win
    let css = send(&router, get("/style.css")).await;
    assert_eq!(body_string(css).await, "body { color: red; }");
}

#[tokio::test]
async fn test_gzip_when_accepted() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let response = send(&router, with_header("/big.txt", header::ACCEPT_ENCODING, "gzip")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    assert!(!response.headers().contains_key(header::CONTENT_LENGTH));
    assert!(response.headers().contains_key(header::ETAG));

    let compressed = body_bytes(response).await;
    let expected = BIG_TEXT_LINE.repeat(200);
    assert!(compressed.len() < expected.len());

    let mut decoded = String::new();
    GzipDecoder::new(&compressed[..])
        .read_to_string(&mut decoded)
        .await
        .unwrap();
    assert_eq!(decoded, expected);
}

#[tokio::test]
async fn test_no_gzip_when_disabled() {
    let dir = site();
    let mut config = config_for(dir.path());
    config.performance.enable_compression = false;
    let router = router(config);

    let response = send(&router, with_header("/big.txt", header::ACCEPT_ENCODING, "gzip")).await;
    assert!(!response.headers().contains_key(header::CONTENT_ENCODING));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_is_forbidden() {
    let outside = tempfile::tempdir().unwrap();
    fs::write(outside.path().join("passwd"), "root:x:0:0").unwrap();

    let dir = site();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();
    let router = router(config_for(dir.path()));

    let response = send(&router, get("/escape/passwd")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_single_byte_range() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let request = Request::builder()
        .uri("/style.css")
        .header(header::RANGE, "bytes=0-3")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-3/20");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
    assert!(!response.headers().contains_key(header::CONTENT_ENCODING));
    assert_eq!(body_string(response).await, "body");

    let tail = send(&router, with_header("/style.css", header::RANGE, "bytes=-4")).await;
    assert_eq!(body_string(tail).await, "d; }");
}

#[tokio::test]
async fn test_unsatisfiable_range() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let response = send(&router, with_header("/style.css", header::RANGE, "bytes=50-")).await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */20");
}

#[tokio::test]
async fn test_stale_if_range_sends_whole_file() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let first = send(&router, get("/style.css")).await;
    assert_eq!(first.headers()[header::ACCEPT_RANGES], "bytes");
    let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();

    let ranged = |if_range: &str| {
        Request::builder()
            .uri("/style.css")
            .header(header::RANGE, "bytes=5-")
            .header(header::IF_RANGE, if_range)
            .body(Body::empty())
            .unwrap()
    };

    let fresh = send(&router, ranged(&etag)).await;
    assert_eq!(fresh.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_string(fresh).await, "{ color: red; }");

    let stale = send(&router, ranged("\"0-0\"")).await;
    assert_eq!(stale.status(), StatusCode::OK);
    assert_eq!(body_string(stale).await, "body { color: red; }");
}

#[tokio::test]
async fn test_head_with_gzip_mirrors_get() {
    let dir = site();
    let router = router(config_for(dir.path()));

    let get = send(&router, with_header("/big.txt", header::ACCEPT_ENCODING, "gzip")).await;
    let head = Request::builder()
        .method(Method::HEAD)
        .uri("/big.txt")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let head = send(&router, head).await;

    assert_eq!(head.status(), StatusCode::OK);
    for name in [header::CONTENT_ENCODING, header::VARY, header::ETAG] {
        assert_eq!(head.headers().get(&name), get.headers().get(&name));
    }
    assert!(!head.headers().contains_key(header::CONTENT_LENGTH));
    assert!(body_bytes(head).await.is_empty());
}
