//! Middleware pipeline: composable before/after request handler logic.
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`Pipeline`]: an ordered middleware stack in front of a [`Router`].
//! - [`LoggerMiddleware`]: request/response logger.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;
use tracing::info;

use crate::{Request, Response, StatusCode, context::Context, router::Router};

/// A type-erased, reference-counted middleware function.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Wraps a [`Middleware`] implementation as a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so each middleware can forward
/// at most once.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    index: usize,
}

impl Next {
    fn new(middlewares: Arc<[MiddlewareHandler]>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next layer and returns its response.
    ///
    /// An exhausted chain answers `500`; a well-formed [`Pipeline`] always
    /// ends in its router, so this only happens with a hand-built chain.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline"),
        }
    }
}

/// The core middleware trait.
///
/// Implementations may pass the request through (`next.run(ctx).await`),
/// short-circuit with their own [`Response`], or decorate the downstream
/// response.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// An ordered middleware stack terminated by a [`Router`].
///
/// Middleware runs in the order it was added; the router is the innermost
/// layer.
///
/// # Examples
///
/// ```rust,no_run
/// use deckstream::middleware::{LoggerMiddleware, Pipeline};
/// use deckstream::{Response, Router, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/health", |_ctx| async { Response::new(StatusCode::Ok) });
/// let app = Pipeline::new(router).with(LoggerMiddleware);
/// ```
pub struct Pipeline {
    layers: Vec<MiddlewareHandler>,
    router: Arc<Router>,
    chain: Option<Arc<[MiddlewareHandler]>>,
}

impl Pipeline {
    pub fn new(router: Router) -> Self {
        Self {
            layers: Vec::new(),
            router: Arc::new(router),
            chain: None,
        }
    }

    /// Appends a middleware layer.
    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.layers.push(from_middleware(Arc::new(middleware)));
        self.chain = None;
        self
    }

    fn chain(&self) -> Arc<[MiddlewareHandler]> {
        if let Some(chain) = &self.chain {
            return Arc::clone(chain);
        }
        let router = Arc::clone(&self.router);
        let terminal: MiddlewareHandler = Arc::new(
            move |ctx: Context, _next: Next| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                let router = Arc::clone(&router);
                Box::pin(async move { router.route(ctx.into_request()).await })
            },
        );
        self.layers.iter().cloned().chain([terminal]).collect()
    }

    /// Freezes the stack so each request reuses the same chain.
    #[must_use]
    pub fn build(mut self) -> Self {
        self.chain = Some(self.chain());
        self
    }

    /// Runs `request` through every layer and the router.
    pub async fn handle(&self, request: Request) -> Response {
        Next::new(self.chain()).run(Context::new(request)).await
    }
}

/// Logs each request's method, path, status, and latency.
///
/// For streamed responses the latency is time to first byte of the head;
/// the body may still be in flight.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().to_string();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                streaming = response.is_streaming(),
                elapsed = ?start.elapsed(),
                "request handled"
            );

            response
        })
    }
}
