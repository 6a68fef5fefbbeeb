use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{Error, Result};
use crate::http::{Request, Response, Transport};

/// In-memory transport answering from a table of canned responses keyed by full URL.
///
/// Every request is recorded so tests can inspect exactly what went on the wire. A URL without
/// a canned response fails with `Error::ConnectionReset`.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Response>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with `response`
    pub fn respond(&self, url: &str, response: Response) {
        self.responses.lock().insert(url.to_string(), response);
    }

    /// Answer requests for `url` with the given status and body
    pub fn respond_with(&self, url: &str, status: u16, body: &[u8]) {
        self.respond(url, Response::with_status(status, body.to_vec()));
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let key = request.url.to_string();
        self.requests.lock().push(request);
        self.responses
            .lock()
            .get(&key)
            .cloned()
            .ok_or(Error::ConnectionReset)
    }
}
