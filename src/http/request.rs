use std::io::{BufReader, Read};

use crate::errors::{Error, Result};
use crate::http::{collect_headers, content_length, find_header};
use crate::url::Url;

/// Host assumed when a request arrives without a `Host` header
const FALLBACK_AUTHORITY: &str = "localhost";

/// Represents an HTTP request, either about to be sent by the client or received by the
/// development server.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method used in the request
    pub method: String,
    /// Where the request goes. The server rebuilds it from the request line and `Host` header.
    pub url: Url,
    /// Headers of the request, `Host`, `Content-Length` and `Connection` excluded on the
    /// client side since they are added on serialization
    pub headers: Vec<(String, String)>,
    /// Body of the request
    pub body: Vec<u8>,
}

impl Request {
    /// Create a new request from scratch
    pub fn new(method: &str, url: Url, headers: Vec<(String, String)>, body: Vec<u8>) -> Request {
        Request {
            method: method.to_string(),
            url,
            headers,
            body,
        }
    }

    /// Create a new GET request for the given URL, with an empty body
    pub fn get(url: Url) -> Request {
        Request::new("GET", url, vec![], vec![])
    }

    /// Create a new POST request for the given URL, with the given body
    pub fn post(url: Url, body: Vec<u8>) -> Request {
        Request::new("POST", url, vec![], body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Request {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Serialize the request for the wire.
    ///
    /// Connections are never reused, hence the `Connection: close`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.method,
            self.url.target(),
            self.url.authority(),
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

/// Parse an HTTP request from a byte stream
///
/// The buffer grows until the head is complete, then until `Content-Length` bytes of body
/// have been read. Anything sent after the body is dropped.
pub fn parse_request<T>(mut buf_reader: BufReader<T>) -> Result<Request>
where
    T: Sized + Read,
{
    let mut buf = [0; 4096];
    let mut data: Vec<u8> = Vec::new();

    let (body_len, parsed_len, mut request) = loop {
        let bytes_read = buf_reader.read(&mut buf)?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }
        data.extend_from_slice(&buf[..bytes_read]);

        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(&data)? {
            httparse::Status::Complete(parsed_len) => {
                let headers = collect_headers(req.headers);
                let authority = find_header(&headers, "Host")
                    .unwrap_or(FALLBACK_AUTHORITY)
                    .to_string();
                let url = Url::from_target(&authority, req.path.unwrap_or("/"))
                    .map_err(|err| Error::BadRequest(err.to_string()))?;

                break (
                    content_length(&headers).unwrap_or(0),
                    parsed_len,
                    Request {
                        method: req.method.unwrap_or("GET").to_string(),
                        url,
                        headers,
                        body: vec![],
                    },
                );
            }
            httparse::Status::Partial => continue,
        }
    };

    while body_len > data.len() - parsed_len {
        let bytes_read = buf_reader.read(&mut buf)?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }
        data.extend_from_slice(&buf[..bytes_read]);
    }
    request.body = data[parsed_len..parsed_len + body_len].to_vec();

    Ok(request)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    fn random_text(len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
    }

    #[test]
    fn test_parse_simple_request() {
        let req_str = b"GET /categories HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*\r\n\r\n";
        let buf_reader = BufReader::new(&req_str[..]);

        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "GET");
        assert_eq!(parsed_req.url.path(), "/categories");
        assert_eq!(parsed_req.url.port(), 8080);
        assert_eq!(parsed_req.headers.len(), 3);
        assert!(parsed_req.body.is_empty());
    }

    #[test]
    fn test_parse_query() {
        let req_str = b"GET /menu?category=main%20course HTTP/1.1\r\n\r\n";
        let parsed_req = parse_request(BufReader::new(&req_str[..])).unwrap();

        assert_eq!(parsed_req.url.host(), "localhost");
        assert_eq!(parsed_req.url.query_value("category"), Some("main course"));
    }

    #[test]
    fn test_parse_incomplete_request() {
        let req_str =
            b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*";
        let buf_reader = BufReader::new(&req_str[..]);

        assert!(matches!(
            parse_request(buf_reader),
            Err(Error::ConnectionReset)
        ));
    }

    #[test]
    fn test_parse_request_with_body() {
        let body = r#"{"menuIds":[1,2,3]}"#;
        let req_str = format!(
            "POST /order HTTP/1.1\r\nHost: localhost:8080\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let parsed_req = parse_request(BufReader::new(req_str.as_bytes())).unwrap();

        assert_eq!(parsed_req.method, "POST");
        assert_eq!(parsed_req.url.path(), "/order");
        assert_eq!(parsed_req.header("content-type"), Some("application/json"));
        assert_eq!(parsed_req.body, body.as_bytes());
    }

    #[test]
    fn test_parse_request_with_very_large_body_and_header() {
        let body = random_text(40960);
        let x_test_header = random_text(40960);

        let req_str = format!(
            "POST / HTTP/1.1\r\nHost: localhost:8080\r\nContent-Length: {}\r\nX-TEST: {}\r\n\r\n{}",
            body.len(),
            x_test_header,
            body
        );

        let parsed_req = parse_request(BufReader::new(req_str.as_bytes())).unwrap();

        assert_eq!(parsed_req.headers.len(), 3);
        assert_eq!(parsed_req.body, body.as_bytes());
        assert_eq!(parsed_req.header("X-TEST"), Some(x_test_header.as_str()));
    }

    #[test]
    fn test_serialize_request() {
        let url = Url::parse("http://localhost:8080/menu?category=entrees").unwrap();
        let request = Request::post(url, b"{}".to_vec()).with_header("Content-Type", "application/json");

        let bytes = request.to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("POST /menu?category=entrees HTTP/1.1\r\n"));
        assert!(text.contains("Host: localhost:8080\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.ends_with("\r\n\r\n{}"));

        let parsed = parse_request(BufReader::new(&bytes[..])).unwrap();
        assert_eq!(parsed.url.query_value("category"), Some("entrees"));
        assert_eq!(parsed.body, b"{}");
    }
}
