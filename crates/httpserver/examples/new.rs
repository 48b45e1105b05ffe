//! Builds a server from options and runs it until Ctrl+C.
//!
//! ```sh
//! cargo run -p httpserver --example new
//! curl localhost:8080/example
//! ```

use bytes::Bytes;
use http::{header, Request, StatusCode};
use http_body_util::Full;
use httpserver::{shutdown::os_signal_token, HttpResponse, Server};
use hyper::body::Incoming;
use tracing_subscriber::EnvFilter;

async fn example(req: Request<Incoming>) -> HttpResponse {
    let (status, body) = match req.uri().path() {
        "/example" => (StatusCode::OK, r#"{"foo":"bar"}"#),
        _ => (StatusCode::NOT_FOUND, r#"{"error":"not found"}"#),
    };

    let mut response = HttpResponse::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = Server::new(
        Server::builder()
            .address("", 8080)
            .handler(example)
            .build(),
    );

    match server.run(os_signal_token()).await {
        Ok(()) => tracing::info!("http server stopped"),
        Err(e) => tracing::error!(error = %e, "http server stopped"),
    }
}
