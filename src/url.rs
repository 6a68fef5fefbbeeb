use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Error, Result};

/// `http://<host>[:<port>][/<path>][?<query>][#<fragment>]`, fragment dropped
static URL_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:http)://([a-zA-Z0-9\.\-]+)(?::(\d{1,5}))?(/[^?#]*)?(?:\?([^#]*))?(?:#.*)?$")
        .expect("URL pattern is valid")
});

const DEFAULT_PORT: u16 = 80;

/// An absolute `http://` URL.
///
/// Only plain HTTP is supported since the transport speaks HTTP/1.1 directly over TCP. The
/// path is kept encoded, the query is kept as decoded key/value pairs in insertion order and
/// is re-encoded on display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    host: String,
    port: u16,
    path: String,
    query: Vec<(String, String)>,
}

impl Url {
    /// Parse and validate an absolute URL
    pub fn parse(input: &str) -> Result<Url> {
        let captures = URL_FORMAT
            .captures(input.trim())
            .ok_or_else(|| Error::BadUrl(input.to_string()))?;

        let host = captures[1].to_ascii_lowercase();
        let port = match captures.get(2) {
            Some(port) => port
                .as_str()
                .parse::<u16>()
                .map_err(|_| Error::BadUrl(input.to_string()))?,
            None => DEFAULT_PORT,
        };
        let path = captures
            .get(3)
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let query = match captures.get(4) {
            Some(query) => parse_query(query.as_str())?,
            None => Vec::new(),
        };

        Ok(Url {
            host,
            port,
            path,
            query,
        })
    }

    /// Parse the target of an HTTP request line (`/path?query`) received on `authority`
    pub fn from_target(authority: &str, target: &str) -> Result<Url> {
        if !target.starts_with('/') {
            return Err(Error::BadUrl(target.to_string()));
        }
        Url::parse(&format!("http://{}{}", authority, target))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Encoded path, always starting with `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query pairs, in the order they were added
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Value of the first query pair named `key`
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for the `Host` header: the port is omitted when it is the default one
    pub fn authority(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Request target as written on the request line
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, encode_query(&self.query))
        }
    }

    /// Return a copy of this URL with `segment` appended to the path.
    ///
    /// The segment is percent-encoded, so a `/` inside it does not create a new level.
    pub fn join(&self, segment: &str) -> Url {
        let mut url = self.clone();
        let base = url.path.trim_end_matches('/');
        url.path = format!("{}/{}", base, encode_component(segment));
        url
    }

    /// Append a query pair. Keys are not deduplicated.
    pub fn append_query(&mut self, key: &str, value: &str) {
        self.query.push((key.to_string(), value.to_string()));
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}{}", self.authority(), self.target())
    }
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(s: &str) -> Result<Url> {
        Url::parse(s)
    }
}

fn parse_query(query: &str) -> Result<Vec<(String, String)>> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

fn encode_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode everything but RFC 3986 unreserved characters
pub fn encode_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Reverse of [`encode_component`], also accepting `+` for a space
pub fn decode_component(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| Error::BadUrl(input.to_string()))?;
                decoded.push(hex);
                i += 3;
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(decoded).map_err(|_| Error::BadUrl(input.to_string()))
}
