//! Request routing: map URL patterns and HTTP methods to handler functions.
//!
//! | Pattern              | Example match              | Captured params                 |
//! |----------------------|----------------------------|---------------------------------|
//! | `/health`            | `/health`                  | *(none)*                        |
//! | `/data/:file`        | `/data/theme.json`         | `file → "theme.json"`           |
//!
//! Trailing slashes are normalized on both patterns and incoming paths.
//! Routes are matched in registration order; the first route whose method and
//! pattern both match wins. A path that matches some route under a different
//! method answers `405`, anything else `404`.

use std::pin::Pin;
use std::sync::Arc;

use serde_json::json;

use crate::context::{Context, PathParams};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased async handler stored by the router.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

#[derive(Debug, Clone)]
enum Pattern {
    Exact(String),
    Parameterized { segments: Vec<Segment> },
}

fn strip_trailing_slash(path: &str) -> &str {
    if path != "/" {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

impl Pattern {
    // Any `:` segment → parameterized, otherwise exact.
    fn parse(pattern: &str) -> Self {
        let pattern = strip_trailing_slash(pattern);

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_owned()),
                    None => Segment::Static(s.to_owned()),
                })
                .collect();
            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_owned())
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let path = strip_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = PathParams::new();
                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != path_seg => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => {
                            params.insert(name.clone(), path_seg.to_owned());
                        }
                    }
                }
                Some(params)
            }
        }
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

/// HTTP request router.
///
/// # Examples
///
/// ```rust,no_run
/// use deckstream::{Router, Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/health", |_ctx| async { Response::new(StatusCode::Ok) });
/// router.get("/data/:file", |ctx| async move {
///     let file = ctx.params().get("file").unwrap_or_default().to_owned();
///     Response::new(StatusCode::Ok).body(file)
/// });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `GET` requests matching `path`.
    pub fn get<H, F>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.add_route(Method::Get, path, handler);
    }

    /// Registers a handler for `POST` requests matching `path`.
    pub fn post<H, F>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.add_route(Method::Post, path, handler);
    }

    // Erases the concrete handler type, boxing each returned future.
    fn add_route<H, F>(&mut self, method: Method, path: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let handler: Handler = Arc::new(
            move |ctx: Context| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                Box::pin(handler(ctx))
            },
        );
        self.routes.push(Route {
            method,
            pattern: Pattern::parse(path),
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches `request` to the first matching route.
    pub async fn route(&self, request: Request) -> Response {
        let mut path_known = false;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(request.path()) else {
                continue;
            };
            if &route.method == request.method() {
                let ctx = Context::with_params(request, params);
                return (route.handler)(ctx).await;
            }
            path_known = true;
        }

        if path_known {
            Response::json(StatusCode::MethodNotAllowed, &json!({"detail": "Method Not Allowed"}))
        } else {
            Response::json(StatusCode::NotFound, &json!({"detail": "Not Found"}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    #[test]
    fn pattern_classification() {
        assert!(matches!(Pattern::parse("/"), Pattern::Exact(s) if s == "/"));
        assert!(matches!(Pattern::parse("/health/"), Pattern::Exact(s) if s == "/health"));
        match Pattern::parse("/data/:file") {
            Pattern::Parameterized { segments } => {
                assert!(matches!(&segments[0], Segment::Static(s) if s == "data"));
                assert!(matches!(&segments[1], Segment::Parameter(s) if s == "file"));
            }
            other => panic!("expected Parameterized, got {other:?}"),
        }
    }

    #[test]
    fn exact_match_normalizes_trailing_slash() {
        let pat = Pattern::parse("/health");
        assert!(pat.matches("/health/").is_some());
        assert!(pat.matches("/healthz").is_none());
        assert!(Pattern::parse("/").matches("/").is_some());
    }

    #[test]
    fn parameter_is_captured() {
        let pat = Pattern::parse("/data/:file");
        let params = pat.matches("/data/theme.json").unwrap();
        assert_eq!(params.get("file"), Some("theme.json"));
        assert!(pat.matches("/data").is_none());
        assert!(pat.matches("/data/a/b").is_none());
        assert!(pat.matches("/other/theme.json").is_none());
    }

    #[tokio::test]
    async fn dispatches_by_method_and_path() {
        let mut router = Router::new();
        router.get("/health", |_ctx| async { Response::new(StatusCode::Ok) });
        router.post("/tools/aippt", |_ctx| async { Response::new(StatusCode::NoContent) });
        assert_eq!(router.len(), 2);

        let res = router.route(make_request("GET", "/health")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        let res = router.route(make_request("POST", "/tools/aippt")).await;
        assert_eq!(res.status(), StatusCode::NoContent);
    }

    #[tokio::test]
    async fn wrong_method_is_405_unknown_path_is_404() {
        let mut router = Router::new();
        router.get("/health", |_ctx| async { Response::new(StatusCode::Ok) });

        let res = router.route(make_request("POST", "/health")).await;
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        let res = router.route(make_request("GET", "/nowhere")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
        assert!(Router::new().is_empty());
    }

    #[tokio::test]
    async fn handler_sees_path_params() {
        let mut router = Router::new();
        router.get("/data/:file", |ctx: Context| async move {
            let file = ctx.params().get("file").unwrap_or("").to_owned();
            Response::new(StatusCode::Ok).body(file)
        });
        let res = router.route(make_request("GET", "/data/a.json")).await;
        assert_eq!(res.into_body().collect().await, b"a.json");
    }
}
