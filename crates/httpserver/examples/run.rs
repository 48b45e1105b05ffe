//! The one-call shortcut: port, handler, extra options.
//!
//! ```sh
//! cargo run -p httpserver --example run
//! ```

use std::time::Duration;

use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use httpserver::{shutdown::os_signal_token, HttpResponse, Server};
use hyper::body::Incoming;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let handler = |_req: Request<Incoming>| async {
        HttpResponse::new(Full::new(Bytes::from_static(br#"{"foo":"bar"}"#)))
    };

    let options = Server::builder()
        .read_header_timeout(Duration::from_secs(5))
        .shutdown_timeout(Duration::from_secs(5));

    if let Err(e) = httpserver::run(os_signal_token(), 8080, handler, options).await {
        tracing::error!(error = %e, "http server stopped");
    }
}
