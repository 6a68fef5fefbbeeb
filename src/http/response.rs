use std::borrow::Cow;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::{Error, Result};
use crate::http::{code_to_string, collect_headers, content_length, find_header};

/// An HTTP response, either received by the client or about to be sent by the development
/// server.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code of the response. Optional because that's what httparse returns; a missing
    /// status is reported as `Error::BadResponse` by the fetch layer.
    pub status: Option<u16>,
    /// Headers for the response. `Content-Length` is added automatically on serialization.
    pub headers: Vec<(String, String)>,
    /// Raw body, JSON text or image bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Creates an empty OK response (204)
    pub fn ok() -> Response {
        Response::with_status(204, vec![])
    }

    /// Creates an OK (200) response with the given body
    pub fn ok_with_body(body: Vec<u8>) -> Response {
        Response::with_status(200, body)
    }

    /// Creates an OK (200) response carrying `value` as JSON
    pub fn json<T: Serialize>(value: &T) -> Result<Response> {
        let body = serde_json::to_vec(value)?;
        Ok(Response::ok_with_body(body).with_header("Content-Type", "application/json"))
    }

    pub fn with_status(code: u16, body: Vec<u8>) -> Response {
        Response {
            status: Some(code),
            headers: vec![],
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Response {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Creates an error response with an empty body.
    ///
    /// The code must be in the 4xx or 5xx range.
    pub fn error(code: u16) -> Response {
        assert!((400..600).contains(&code), "Invalid error code");
        Response::with_status(code, vec![])
    }

    /// Creates an Internal Server Error (500) response.
    pub fn internal_server_error() -> Response {
        Self::error(500)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as text, lossily decoded
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Serialize the response for the wire. Connections are closed after every response.
    pub fn to_bytes(&self) -> Vec<u8> {
        let code = self.status.unwrap_or(500);
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            code,
            code_to_string(code),
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// How the end of the body is signalled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFraming {
    Length(usize),
    Chunked,
    /// No length given, the body runs until the server closes the connection
    UntilClose,
}

/// Parse the status line and headers, if `data` holds all of them
fn parse_head(data: &[u8]) -> Result<Option<(usize, Response, BodyFraming)>> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut resp = httparse::Response::new(&mut headers);

    match resp.parse(data)? {
        httparse::Status::Partial => Ok(None),
        httparse::Status::Complete(parsed_len) => {
            let headers = collect_headers(resp.headers);
            let chunked = find_header(&headers, "Transfer-Encoding")
                .map(|encoding| encoding.to_ascii_lowercase().contains("chunked"))
                .unwrap_or(false);

            let framing = match resp.code {
                Some(code) if code == 204 || code == 304 || (100..200).contains(&code) => {
                    BodyFraming::Length(0)
                }
                _ if chunked => BodyFraming::Chunked,
                _ => content_length(&headers)
                    .map(BodyFraming::Length)
                    .unwrap_or(BodyFraming::UntilClose),
            };

            Ok(Some((
                parsed_len,
                Response {
                    status: resp.code,
                    headers,
                    body: vec![],
                },
                framing,
            )))
        }
    }
}

/// Decode a chunked body, returning `None` while more data is needed. Trailers are ignored.
fn decode_chunked(data: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    let mut pos = 0;
    loop {
        match httparse::parse_chunk_size(&data[pos..]) {
            Ok(httparse::Status::Complete((consumed, size))) => {
                pos += consumed;
                if size == 0 {
                    return Ok(Some(body));
                }
                let size = usize::try_from(size).map_err(|_| Error::MalformedBody)?;
                // chunk data is followed by CRLF
                let end = pos
                    .checked_add(size)
                    .and_then(|end| end.checked_add(2))
                    .ok_or(Error::MalformedBody)?;
                if data.len() < end {
                    return Ok(None);
                }
                body.extend_from_slice(&data[pos..pos + size]);
                pos = end;
            }
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(_) => return Err(Error::MalformedBody),
        }
    }
}

/// Read a complete HTTP response from an async byte stream.
///
/// Handles `Content-Length`, chunked and close-delimited bodies.
pub async fn read_response<R>(reader: &mut R) -> Result<Response>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0; 4096];
    let mut data: Vec<u8> = Vec::new();

    let (parsed_len, mut response, framing) = loop {
        let bytes_read = reader.read(&mut buf).await?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }
        data.extend_from_slice(&buf[..bytes_read]);

        if let Some(head) = parse_head(&data)? {
            break head;
        }
    };

    response.body = match framing {
        BodyFraming::Length(body_len) => {
            while body_len > data.len() - parsed_len {
                let bytes_read = reader.read(&mut buf).await?;
                if bytes_read == 0 {
                    return Err(Error::ConnectionReset);
                }
                data.extend_from_slice(&buf[..bytes_read]);
            }
            data[parsed_len..parsed_len + body_len].to_vec()
        }
        BodyFraming::Chunked => loop {
            if let Some(body) = decode_chunked(&data[parsed_len..])? {
                break body;
            }
            let bytes_read = reader.read(&mut buf).await?;
            if bytes_read == 0 {
                return Err(Error::ConnectionReset);
            }
            data.extend_from_slice(&buf[..bytes_read]);
        },
        BodyFraming::UntilClose => {
            reader.read_to_end(&mut data).await?;
            data[parsed_len..].to_vec()
        }
    };

    Ok(response)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    async fn parse(bytes: &[u8]) -> Result<Response> {
        let mut reader = bytes;
        read_response(&mut reader).await
    }

    #[tokio::test]
    async fn test_parse_simple_response() {
        let parsed = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await.unwrap();

        assert_eq!(parsed.status, Some(200));
        assert_eq!(parsed.headers.len(), 1);
        assert!(parsed.body.is_empty());
    }

    #[tokio::test]
    async fn test_parse_response_with_body() {
        let body = r#"{"categories":["appetizers","entrees"]}"#;
        let resp_str = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let parsed = parse(resp_str.as_bytes()).await.unwrap();

        assert_eq!(parsed.status, Some(200));
        assert_eq!(parsed.text(), body);
    }

    #[tokio::test]
    async fn test_parse_binary_body() {
        let mut rng = rand::thread_rng();
        let body: Vec<u8> = (0..40960).map(|_| rng.gen()).collect();
        let mut resp = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
        resp.extend_from_slice(&body);

        let parsed = parse(&resp).await.unwrap();
        assert_eq!(parsed.body, body);
    }

    #[tokio::test]
    async fn test_parse_chunked_body() {
        let resp = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n";
        let parsed = parse(resp).await.unwrap();
        assert_eq!(parsed.text(), "hello, world");
    }

    #[tokio::test]
    async fn test_parse_oversized_chunk() {
        let resp = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nab\r\n0\r\n\r\n";
        assert!(matches!(parse(resp).await, Err(Error::MalformedBody)));
    }

    #[tokio::test]
    async fn test_parse_close_delimited_body() {
        let resp = b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\nno such thing";
        let parsed = parse(resp).await.unwrap();
        assert_eq!(parsed.status, Some(404));
        assert_eq!(parsed.text(), "no such thing");
    }

    #[tokio::test]
    async fn test_parse_truncated_body() {
        let resp = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
        assert!(matches!(parse(resp).await, Err(Error::ConnectionReset)));
    }

    #[tokio::test]
    async fn test_parse_garbage() {
        assert!(matches!(parse(b"NOT HTTP AT ALL\r\n\r\n").await, Err(Error::Http(_))));
        assert!(matches!(parse(b"").await, Err(Error::ConnectionReset)));
    }

    #[tokio::test]
    async fn test_serialized_response_parses_back() {
        let response = Response::ok_with_body(b"{}".to_vec()).with_header("Content-Type", "application/json");
        let parsed = parse(&response.to_bytes()).await.unwrap();

        assert_eq!(parsed.status, Some(200));
        assert_eq!(parsed.header("content-type"), Some("application/json"));
        assert_eq!(parsed.body, b"{}");
    }

    #[test]
    #[should_panic(expected = "Invalid error code")]
    fn test_error_rejects_success_codes() {
        Response::error(200);
    }
}
