//! Helpers shared by the integration suites.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{header, Request, StatusCode};
use http_body_util::{BodyExt, Empty, Full};
use httpserver::{HttpResponse, Server, ServerConfig, ServerError};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

pub fn text(body: &'static str) -> HttpResponse {
    HttpResponse::new(Full::new(Bytes::from_static(body.as_bytes())))
}

pub struct Running {
    pub server: Arc<Server>,
    pub token: CancellationToken,
    pub handle: JoinHandle<Result<(), ServerError>>,
    pub addr: SocketAddr,
}

impl Running {
    /// Waits until every connection has been released.
    pub async fn wait_for_drain(&self) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.server.active_connections() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("server should release its connections");
    }

    /// Cancels the run and returns its result.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.token.cancel();
        tokio::time::timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("run should return after cancellation")
            .expect("run task should not panic")
    }
}

/// Starts a server on an ephemeral loopback port and waits until it listens.
pub async fn start(config: ServerConfig) -> Running {
    let server = Arc::new(Server::new(config));
    let token = CancellationToken::new();

    let handle = {
        let server = Arc::clone(&server);
        let token = token.clone();
        tokio::spawn(async move { server.run(token).await })
    };

    let addr = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(addr) = server.local_addr() {
                return addr;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("server should start listening");

    Running {
        server,
        token,
        handle,
        addr,
    }
}

pub fn request(path: &str) -> http::request::Builder {
    Request::builder().uri(path).header(header::HOST, "localhost")
}

/// Sends one request over `io` and collects the response.
pub async fn send<I>(io: I, request: Request<Empty<Bytes>>) -> Result<(StatusCode, Bytes), ClientError>
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let response = sender.send_request(request).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    Ok((status, body))
}

pub async fn get(addr: SocketAddr, path: &str) -> Result<(StatusCode, Bytes), ClientError> {
    let stream = TcpStream::connect(addr).await?;
    send(stream, request(path).body(Empty::new())?).await
}
