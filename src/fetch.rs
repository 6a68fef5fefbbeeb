use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::errors::{Error, Result};
use crate::http::{Request, Response, Transport};
use crate::url::Url;

/// Typed fetch client: GET a URL, validate the status, decode the JSON body.
///
/// Each operation exists in two forms. The `async` one suspends the caller until the result is
/// known. The `*_with` one spawns that same future on the runtime and hands its result to a
/// completion callback, which therefore runs on a runtime worker thread. Callers that live on
/// another context (a UI thread) have to hop back themselves.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    runtime: Handle,
}

impl Fetcher {
    /// Create a fetcher bound to the runtime of the calling thread.
    ///
    /// Fails with `Error::NoRuntime` outside of a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Self::with_runtime(transport, runtime))
    }

    /// Create a fetcher spawning its callback-style work on `runtime`
    pub fn with_runtime(transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        Fetcher { transport, runtime }
    }

    /// Send a request as is, without any validation of the answer
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.transport.send(request).await
    }

    /// GET `url` and decode the body into `T`.
    ///
    /// Fails with `BadResponse` when the response has no status, `NotFound` when the status is
    /// not 200, and `Decode` when the body does not match `T`.
    pub async fn fetch<T>(&self, url: &Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Request::get(url.clone())).await?;
        decode(&response)
    }

    /// Callback twin of [`Fetcher::fetch`]
    pub fn fetch_with<T, F>(&self, url: Url, on_complete: F) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let fetcher = self.clone();
        self.complete_with(async move { fetcher.fetch(&url).await }, on_complete)
    }

    /// Run `operation` on the runtime and pass its outcome to `on_complete`.
    ///
    /// This is the only bridge between the suspending and the callback forms.
    pub fn complete_with<T, Fut, F>(&self, operation: Fut, on_complete: F) -> JoinHandle<()>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        self.runtime.spawn(async move { on_complete(operation.await) })
    }
}

/// Succeed only for a 200 status
pub fn check_status(response: &Response) -> Result<()> {
    match response.status {
        None => Err(Error::BadResponse),
        Some(200) => Ok(()),
        Some(code) => Err(Error::NotFound(code)),
    }
}

/// Validate the status then decode the JSON body
pub fn decode<T>(response: &Response) -> Result<T>
where
    T: DeserializeOwned,
{
    check_status(response)?;
    Ok(serde_json::from_slice(&response.body)?)
}
