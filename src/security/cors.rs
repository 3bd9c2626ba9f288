use std::pin::Pin;

use crate::{
    Method, Response, StatusCode,
    context::Context,
    middleware::{Middleware, Next},
};

/// CORS middleware: validates the `Origin` header, answers preflight
/// requests, and adds `Access-Control-*` headers to actual responses.
///
/// # Behavior
///
/// - Requests without an `Origin`, or from an origin not on the allow-list,
///   pass through unmodified.
/// - `OPTIONS` requests from an allowed origin are answered with
///   `204 No Content` and the preflight headers; the handler is not called.
/// - Other requests run normally and get `Access-Control-Allow-Origin`
///   (plus `Access-Control-Allow-Credentials` when enabled).
/// - Any request header is allowed: preflights get back whatever they asked
///   for in `Access-Control-Request-Headers`.
/// - With credentials enabled the concrete origin is echoed instead of `*`,
///   since browsers reject a wildcard on credentialed requests. Echoed
///   origins always carry `Vary: Origin`.
///
/// # Examples
///
/// ```rust
/// use deckstream::security::CorsMiddleware;
///
/// let cors = CorsMiddleware::new()
///     .allow_origins(["http://localhost:5173"])
///     .allow_credentials(true);
/// ```
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allow_credentials: bool,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl CorsMiddleware {
    /// Permissive defaults: any origin, `GET, POST, PUT, DELETE, OPTIONS`,
    /// any request header, no credentials.
    pub fn new() -> Self {
        Self {
            allowed_origins: vec!["*".to_owned()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allow_credentials: false,
        }
    }

    /// Replaces the origin allow-list. `"*"` permits every origin.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    // Returns the `Access-Control-Allow-Origin` value for `origin`, or `None` if it is not allowed.
    fn allow_origin_value(&self, origin: &str) -> Option<String> {
        let any = self.allowed_origins.iter().any(|o| o == "*");
        if any && !self.allow_credentials {
            Some("*".to_owned())
        } else if any || self.allowed_origins.iter().any(|o| o == origin) {
            Some(origin.to_owned())
        } else {
            None
        }
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let request = ctx.request();
        let allow_origin = request
            .headers()
            .get("origin")
            .and_then(|origin| self.allow_origin_value(origin));
        let Some(allow_origin) = allow_origin else {
            return Box::pin(next.run(ctx));
        };

        let echoed = allow_origin != "*";
        let credentials = self.allow_credentials;

        if request.method() == &Method::Options {
            let allow_headers = request
                .headers()
                .get("access-control-request-headers")
                .unwrap_or("*")
                .to_owned();

            let mut resp = Response::new(StatusCode::NoContent)
                .header("Access-Control-Allow-Origin", allow_origin)
                .header("Access-Control-Allow-Methods", self.allowed_methods.join(", "))
                .header("Access-Control-Allow-Headers", allow_headers)
                .header("Access-Control-Max-Age", "600");
            if credentials {
                resp.add_header("Access-Control-Allow-Credentials", "true");
            }
            if echoed {
                resp.add_header("Vary", "Origin");
            }
            return Box::pin(async move { resp });
        }

        Box::pin(async move {
            let mut resp = next.run(ctx).await;
            resp.add_header("Access-Control-Allow-Origin", allow_origin);
            if credentials {
                resp.add_header("Access-Control-Allow-Credentials", "true");
            }
            if echoed {
                resp.add_header("Vary", "Origin");
            }
            resp
        })
    }
}
