use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::trace;

use crate::errors::{Error, Result};
use crate::http::{read_response, Request, Response};

/// Anything able to deliver a request and hand back the raw response.
///
/// The fetch layer only talks to this trait, so unit tests can swap the network for an
/// in-memory mock.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

/// Simple HTTP/1.1 client
///
/// Every request opens a fresh connection to the host named in its URL, writes the request,
/// reads the full response and closes the connection. Keep-alive is not implemented.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a client. When `timeout` is set, a request that has not completed in time
    /// fails with `Error::Timeout`.
    pub fn new(timeout: Option<Duration>) -> Self {
        HttpClient { timeout }
    }

    async fn exchange(&self, request: Request) -> Result<Response> {
        let url = &request.url;
        let mut stream = TcpStream::connect((url.host(), url.port())).await?;
        trace!(method = %request.method, %url, "sending request");

        stream.write_all(&request.to_bytes()).await?;
        let response = read_response(&mut stream).await?;

        trace!(status = ?response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: Request) -> Result<Response> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(request))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.exchange(request).await,
        }
    }
}
