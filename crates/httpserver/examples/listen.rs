//! Options from a settings file, signal handling built in.
//!
//! ```sh
//! cargo run -p httpserver --example listen -- server.toml
//! ```

use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use httpserver::{HttpResponse, Server, ServerSettings};
use hyper::body::Incoming;
use tracing_subscriber::EnvFilter;

const DEFAULT_SETTINGS: &str = r#"
port = 8080
read_header_timeout_ms = 5000
shutdown_timeout_ms = 10000
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => ServerSettings::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => ServerSettings::from_toml_str(DEFAULT_SETTINGS)?,
    };

    let options = settings.apply(Server::builder())?.handler(|_req: Request<Incoming>| async {
        HttpResponse::new(Full::new(Bytes::from_static(br#"{"foo":"bar"}"#)))
    });

    if let Err(e) = httpserver::listen_and_serve(options).await {
        tracing::error!(error = %e, "http server stopped");
        return Err(e.into());
    }
    tracing::info!("http server stopped");
    Ok(())
}
