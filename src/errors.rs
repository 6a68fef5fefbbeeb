use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the client, the loader and the development backend can report.
#[derive(Debug, Error)]
pub enum Error {
    /// The base address or a composed URL is not a usable `http://` URL
    #[error("invalid URL: {0}")]
    BadUrl(String),

    /// The transport produced a response without a usable HTTP status
    #[error("response carried no usable HTTP status")]
    BadResponse,

    /// The server answered with something other than 200
    #[error("request failed with status {0}")]
    NotFound(u16),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("order submission failed with status {0}")]
    OrderRequestFailed(u16),

    /// Image fetch returned a non-200 status or bytes that are not an image
    #[error("image data missing")]
    ImageDataMissing,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection closed before a complete message was received")]
    ConnectionReset,

    #[error("malformed chunked body")]
    MalformedBody,

    #[error("malformed HTTP message: {0}")]
    Http(#[from] httparse::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("no tokio runtime is running on this thread")]
    NoRuntime,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no route for {0}")]
    RouteNotFound(String),

    /// A route table that matchit refuses, a programming error
    #[error(transparent)]
    Route(#[from] matchit::InsertError),
}

impl Error {
    /// Status code the development backend answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) | Error::Http(_) | Error::Decode(_) => 400,
            Error::RouteNotFound(_) => 404,
            _ => 500,
        }
    }
}
