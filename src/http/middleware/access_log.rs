//! Access logging interceptor.
//!
//! Outermost link of the chain: sees the original method and path and the
//! final status, whichever interceptor produced it. For streamed bodies the
//! record is emitted once the body has been fully written or dropped, so the
//! duration covers the transfer.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, HttpBody},
    http::Request,
    response::Response,
};
use futures_util::{future::BoxFuture, StreamExt};

use crate::http::pipeline::{Interceptor, Next};
use crate::http::request::{remote_addr, request_id};
use crate::observability::{metrics, AccessRecord, LogSink};

pub struct AccessLog {
    sink: Arc<dyn LogSink>,
}

impl AccessLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

/// Emits its record when dropped.
struct PendingRecord {
    sink: Arc<dyn LogSink>,
    start: Instant,
    record: AccessRecord,
}

impl Drop for PendingRecord {
    fn drop(&mut self) {
        self.record.duration = self.start.elapsed();
        metrics::record_request(&self.record.method, self.record.status, self.start);
        self.sink.access(&self.record);
    }
}

impl Interceptor for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().to_string();
            let path = request.uri().path().to_string();
            let remote = remote_addr(&request).unwrap_or_else(|| "-".to_string());
            let request_id = request_id(&request);

            let response = next.run(request).await;

            let pending = PendingRecord {
                sink: self.sink.clone(),
                start,
                record: AccessRecord {
                    method,
                    path,
                    status: response.status().as_u16(),
                    duration: start.elapsed(),
                    remote_addr: remote,
                    request_id,
                },
            };
            if response.body().size_hint().exact().is_some() {
                return response;
            }

            let (parts, body) = response.into_parts();
            let body = body.into_data_stream().map(move |chunk| {
                let _pending = &pending;
                chunk
            });
            Response::from_parts(parts, Body::from_stream(body))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::pipeline::{tests::Ok200, Pipeline};
    use crate::http::request::X_REQUEST_ID;
    use crate::observability::logging::tests::RecordingSink;
    use crate::security::HiddenFileBlocker;
    use crate::http::pipeline::Handler;
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    struct Streaming;

    impl Handler for Streaming {
        fn handle(&self, _request: Request<Body>) -> BoxFuture<'_, Response> {
            Box::pin(async {
                let chunks = futures_util::stream::iter(vec![
                    Ok::<_, std::io::Error>("first,"),
                    Ok("second"),
                ]);
                Response::new(Body::from_stream(chunks))
            })
        }
    }

    #[tokio::test]
    async fn test_streamed_body_is_logged_after_transfer() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = Pipeline::builder()
            .layer(AccessLog::new(sink.clone()))
            .build(Streaming);

        let response = pipeline.handle(Request::new(Body::empty())).await;
        assert!(sink.access.lock().unwrap().is_empty());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"first,second");

        let records = sink.access.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, 200);
    }

    #[tokio::test]
    async fn test_records_final_status_of_rejections() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = Pipeline::builder()
            .layer(AccessLog::new(sink.clone()))
            .layer(HiddenFileBlocker)
            .build(Ok200);

        let mut request = Request::builder()
            .method("GET")
            .uri("/.env")
            .header(X_REQUEST_ID, "abc-123")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "10.0.0.7:5000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        pipeline.handle(request).await;
        pipeline.handle(Request::new(Body::empty())).await;

        let records = sink.access.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].method, "GET");
        assert_eq!(records[0].path, "/.env");
        assert_eq!(records[0].status, 403);
        assert_eq!(records[0].remote_addr, "10.0.0.7:5000");
        assert_eq!(records[0].request_id.as_deref(), Some("abc-123"));
        assert_eq!(records[1].status, 200);
        assert_eq!(records[1].remote_addr, "-");
    }
}
