//! Request handlers.
//!
//! A handler turns one request into one response. The server never inspects
//! or wraps it: routing, extraction and error mapping belong to the caller.
//!
//! Any async closure taking a [`Request<Incoming>`] and returning an
//! [`HttpResponse`] is a handler:
//!
//! ```rust
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::Full;
//! use httpserver::{Handler, HttpResponse};
//! use hyper::body::Incoming;
//!
//! fn assert_handler<H: Handler>(_: H) {}
//!
//! assert_handler(|_req: Request<Incoming>| async {
//!     HttpResponse::new(Full::new(Bytes::from("hello")))
//! });
//! ```

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// Type alias for a boxed handler future.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// Processes a single request and produces a single response.
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, request: Request<Incoming>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request<Incoming>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    fn call(&self, request: Request<Incoming>) -> HandlerFuture {
        Box::pin(self(request))
    }
}

/// Handler used when none is configured: answers every request with
/// `404 Not Found`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Handler for NotFound {
    fn call(&self, request: Request<Incoming>) -> HandlerFuture {
        tracing::debug!(method = %request.method(), path = request.uri().path(), "no handler configured");
        Box::pin(async { status_response(StatusCode::NOT_FOUND) })
    }
}

/// Builds an empty-bodied response carrying the reason phrase of `status`.
pub(crate) fn status_response(status: StatusCode) -> HttpResponse {
    let body = status.canonical_reason().unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
