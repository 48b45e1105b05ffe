//! Three servers sharing one handler and one shutdown token. The first
//! failure cancels the others.
//!
//! ```sh
//! cargo run -p httpserver --example multirun
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use httpserver::{shutdown::os_signal_token, Handler, HttpResponse, Server};
use hyper::body::Incoming;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let handler: Arc<dyn Handler> = Arc::new(|_req: Request<Incoming>| async {
        HttpResponse::new(Full::new(Bytes::from_static(br#"{"foo":"bar"}"#)))
    });
    let shutdown = os_signal_token();

    let mut servers = JoinSet::new();
    for port in [8080, 8081, 8082] {
        let server = Server::new(
            Server::builder()
                .address("", port)
                .shared_handler(Arc::clone(&handler))
                .build(),
        );
        let shutdown = shutdown.clone();
        servers.spawn(async move { server.run(shutdown).await });
    }

    let mut first_error = None;
    while let Some(joined) = servers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                shutdown.cancel();
                first_error.get_or_insert(e.to_string());
            }
            Err(e) => {
                shutdown.cancel();
                first_error.get_or_insert(e.to_string());
            }
        }
    }

    match first_error {
        None => tracing::info!("http servers stopped"),
        Some(e) => tracing::error!(error = %e, "http servers stopped"),
    }
}
