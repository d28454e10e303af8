//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the interceptor pipeline from configuration, once
//! - Wrap it in an Axum router with transport middleware (timeout,
//!   request ID, tracing)
//! - Serve over plain TCP or TLS with graceful shutdown
//! - Dispatch requests that survive the chain to the runtime config
//!   endpoint or the resolver

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, http::StatusCode, response::Response, Router};
use axum_server::tls_rustls::RustlsConfig;
use futures_util::future::BoxFuture;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServeConfig;
use crate::http::middleware::{AccessLog, CacheControl, Compression};
use crate::http::pipeline::{Handler, Pipeline};
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::http::runtime_config::RuntimeConfig;
use crate::observability::LogSink;
use crate::resolver::{Resolver, ResolverOptions};
use crate::security::path::canonical_path;
use crate::security::{
    BasicAuthInterceptor, CorsInterceptor, HeaderInjector, HiddenFileBlocker, IpFilter,
    IpFilterInterceptor, PathNormalizer, RateLimitInterceptor, RateLimiter,
};

/// Terminal handler: runtime config endpoint first, then the filesystem.
struct SiteHandler {
    resolver: Resolver,
    runtime_config: Option<RuntimeConfig>,
    sink: Arc<dyn LogSink>,
}

impl Handler for SiteHandler {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'_, Response> {
        // Body is not Sync; keep only the head so the future stays Send.
        let (parts, _) = request.into_parts();
        let request = Request::from_parts(parts, ());
        Box::pin(async move {
            if let Some(endpoint) = &self.runtime_config {
                if canonical_path(&request).is_some_and(|path| endpoint.matches(&path)) {
                    return match endpoint.respond() {
                        Ok(response) => response,
                        Err(e) => {
                            self.sink.error(&format!("Error rendering runtime config: {e}"));
                            self.resolver
                                .error_response(StatusCode::INTERNAL_SERVER_ERROR)
                                .await
                        }
                    };
                }
            }
            self.resolver.serve(&request).await
        })
    }
}

/// Build the interceptor chain in its canonical order around the resolver.
///
/// Must be called inside a Tokio runtime when rate limiting is enabled, so
/// the limiter can start its sweeper.
pub fn build_pipeline(config: &ServeConfig, sink: Arc<dyn LogSink>) -> io::Result<Pipeline> {
    let security = &config.security;
    let performance = &config.performance;

    let resolver = Resolver::new(ResolverOptions::from_config(config), sink.clone())?;
    let runtime_config = RuntimeConfig::from_config(config.runtime_config.as_ref());
    if let Some(endpoint) = &runtime_config {
        sink.info(&format!("Runtime config enabled at: {}", endpoint.route()));
    }

    let ip_filter = IpFilter::new(&security.ip_whitelist, &security.ip_blacklist);
    let rate_limit = security.rate_limit.as_ref().filter(|rl| rl.enabled);
    let basic_auth = security.basic_auth.as_ref().filter(|auth| auth.enabled);
    let cors = security.cors.as_ref().filter(|cors| cors.enabled);
    let cache_control = performance
        .enable_cache
        .then(|| CacheControl::new(performance.cache_max_age))
        .flatten();

    let mut builder = Pipeline::builder()
        .layer(AccessLog::new(sink.clone()))
        .layer(HeaderInjector::security())
        .layer_if(!performance.custom_headers.is_empty(), || {
            HeaderInjector::custom(&performance.custom_headers)
        })
        .layer_if(ip_filter.is_active(), || IpFilterInterceptor::new(ip_filter));

    if let Some(rl) = rate_limit {
        builder = builder.layer(RateLimitInterceptor::new(RateLimiter::new(rl)));
    }
    if let Some(auth) = basic_auth {
        builder = builder.layer(BasicAuthInterceptor::new(auth));
    }
    if let Some(cors) = cors {
        builder = builder.layer(CorsInterceptor::new(cors));
    }

    builder = builder
        .layer(PathNormalizer)
        .layer_if(security.block_hidden_files, || HiddenFileBlocker)
        .layer_if(performance.enable_compression, || {
            Compression::new(performance.compression_level)
        });
    if let Some(cache_control) = cache_control {
        builder = builder.layer(cache_control);
    }

    let pipeline = builder.build(SiteHandler {
        resolver,
        runtime_config,
        sink,
    });
    tracing::debug!(interceptors = ?pipeline.names(), "Pipeline assembled");
    Ok(pipeline)
}

/// HTTP server for static content.
pub struct HttpServer {
    router: Router,
    pipeline: Pipeline,
    config: ServeConfig,
}

impl HttpServer {
    /// Create a server; fails when the document root cannot be resolved.
    pub fn new(config: ServeConfig, sink: Arc<dyn LogSink>) -> io::Result<Self> {
        let pipeline = build_pipeline(&config, sink)?;
        let router = Self::build_router(&config, pipeline.clone());
        Ok(Self {
            router,
            pipeline,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServeConfig, pipeline: Pipeline) -> Router {
        let mut router = Router::new().fallback(move |request: Request<Body>| {
            let pipeline = pipeline.clone();
            async move { pipeline.handle(request).await }
        });

        if let Some(timeout) = config.server.request_timeout() {
            router = router.layer(TimeoutLayer::new(timeout));
        }

        router
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The Axum router, for serving or for driving requests in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &ServeConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            root = %self.config.server.root_dir,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` resolves, then drain for at most `grace`.
    pub async fn run_tls<F>(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: F,
        grace: Duration,
    ) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            address = %addr,
            root = %self.config.server.root_dir,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let trigger = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            trigger.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
