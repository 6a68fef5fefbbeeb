use std::sync::LazyLock;
use std::time::Duration;

use clap::{Args, Parser};
use regex::Regex;

use crate::errors::{Error, Result};

/// Backend the client talks to when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Address the development backend listens on by default
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";

/// Requests running longer than this fail with `Error::Timeout`
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const BASE_URL_ENV: &str = "ORDERAPP_BASE_URL";
pub const TIMEOUT_ENV: &str = "ORDERAPP_TIMEOUT_SECS";
pub const ADDRESS_ENV: &str = "ORDERAPP_ADDRESS";

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9\.\-]+:\d{1,5}$").expect("address pattern is valid")
});

/// Settings of the menu client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origin every endpoint is appended to
    pub base_url: String,
    /// `None` waits forever
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: timeout_from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Settings of the development backend
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

/// Command line flags shared by every client command
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Origin of the backend, e.g. http://127.0.0.1:8080
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds, 0 to disable
    #[arg(long, env = TIMEOUT_ENV, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl ClientArgs {
    pub fn into_config(self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url,
            request_timeout: timeout_from_secs(self.timeout),
        }
    }
}

/// Development backend serving the menu API
#[derive(Parser, Debug, Clone)]
#[command(name = "server", version)]
pub struct ServerArgs {
    /// Address to listen on, as <host>:<port>
    #[arg(long, short, env = ADDRESS_ENV, default_value = DEFAULT_ADDRESS)]
    pub address: String,
}

impl ServerArgs {
    /// Fails with `Error::BadUrl` when the address is not in the <host>:<port> format
    pub fn into_config(self) -> Result<ServerConfig> {
        let address = validate_address(&self.address)?.to_string();
        Ok(ServerConfig { address })
    }
}

/// Validate the format of a TCP address
///
/// Returns its input if the address is in the format <host>:<port>, otherwise BadUrl
pub fn validate_address(address: &str) -> Result<&str> {
    if ADDRESS_RE.is_match(address) {
        Ok(address)
    } else {
        Err(Error::BadUrl(format!(
            "invalid address '{}', expected <host>:<port>",
            address
        )))
    }
}

/// A zero timeout means none
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
