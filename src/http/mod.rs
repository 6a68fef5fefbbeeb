pub mod server;
pub use server::*;

pub mod request;
pub use request::*;

pub mod response;
pub use response::*;

pub mod client;
pub use client::*;

pub mod mock;

/// Turn an HTTP status code into its standard reason phrase
pub fn code_to_string(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        304 => "Not Modified",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Copy parsed headers out of the httparse buffer
pub(crate) fn collect_headers(headers: &[httparse::Header]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect()
}

/// Case-insensitive header lookup
pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
}

pub(crate) fn content_length(headers: &[(String, String)]) -> Option<usize> {
    find_header(headers, "Content-Length").and_then(|length| length.parse::<usize>().ok())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::Url;

    #[test]
    fn test_find_header_ignores_case() {
        let headers = vec![("content-length".to_string(), " 42 ".to_string())];
        assert_eq!(find_header(&headers, "Content-Length"), Some("42"));
        assert_eq!(content_length(&headers), Some(42));
        assert_eq!(find_header(&headers, "Host"), None);
    }

    #[test]
    fn test_code_to_string() {
        assert_eq!(code_to_string(200), "OK");
        assert_eq!(code_to_string(404), "Not Found");
        assert_eq!(code_to_string(418), "Unknown");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_simple_http_request() {
        // Port 0 lets the OS pick a free port, so the test can run repeatedly
        let server = HttpServer::new("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            server.serve_once(|request| {
                assert_eq!(request.method, "POST");
                Response::ok_with_body(request.body)
            })
        });

        let url = Url::parse(&format!("http://{}/echo", addr)).unwrap();
        let client = HttpClient::new(None);
        let resp = client
            .send(Request::post(url, b"{\"content\": \"Hello\"}".to_vec()))
            .await
            .expect("Failed to communicate with server");

        assert_eq!(resp.status, Some(200));
        assert_eq!(resp.text(), "{\"content\": \"Hello\"}");

        handle.join().unwrap().unwrap();
    }
}
