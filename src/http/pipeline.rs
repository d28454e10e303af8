//! Interceptor chain.
//!
//! A [`Pipeline`] is an immutable, ordered list of [`Interceptor`]s wrapped
//! around a terminal [`Handler`]. It is assembled once with
//! [`PipelineBuilder`] and shared by every request; nothing is added or
//! removed afterwards.
//!
//! Each interceptor receives the request and a [`Next`] continuation. It may
//! forward (possibly after mutating the request), inspect or rewrite the
//! response returned by `next`, or answer on its own without calling `next`.

use std::fmt;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

/// A single step of the request pipeline.
pub trait Interceptor: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Process `request`, delegating to `next` unless the request is answered here.
    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response>;
}

/// The end of the chain: produces the response for requests that got through.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'_, Response>;
}

/// Continuation handed to an interceptor: the rest of the chain.
pub struct Next<'a> {
    rest: &'a [Box<dyn Interceptor>],
    terminal: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Run the remaining interceptors and the terminal handler.
    pub fn run(self, request: Request<Body>) -> BoxFuture<'a, Response> {
        match self.rest.split_first() {
            Some((head, rest)) => head.intercept(
                request,
                Next {
                    rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.handle(request),
        }
    }
}

struct PipelineInner {
    interceptors: Vec<Box<dyn Interceptor>>,
    terminal: Box<dyn Handler>,
}

/// A composed, cheaply clonable request handler.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Handle one request through the whole chain.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let next = Next {
            rest: &self.inner.interceptors,
            terminal: self.inner.terminal.as_ref(),
        };
        next.run(request).await
    }

    /// Interceptor names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.inner.interceptors.iter().map(|i| i.name()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("interceptors", &self.names())
            .finish()
    }
}

/// Collects interceptors in execution order.
#[derive(Default)]
pub struct PipelineBuilder {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl PipelineBuilder {
    /// Append an interceptor; the first one added runs first.
    pub fn layer<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    /// Append an interceptor only when `condition` holds.
    pub fn layer_if<I: Interceptor>(self, condition: bool, make: impl FnOnce() -> I) -> Self {
        if condition {
            self.layer(make())
        } else {
            self
        }
    }

    /// Seal the chain around `terminal`.
    pub fn build<H: Handler>(self, terminal: H) -> Pipeline {
        Pipeline {
            inner: Arc::new(PipelineInner {
                interceptors: self.interceptors,
                terminal: Box::new(terminal),
            }),
        }
    }
}
