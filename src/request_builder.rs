use crate::endpoints::Endpoint;
use crate::errors::Result;
use crate::url::Url;

/// Composes absolute URLs for the backend API from a configured base address.
///
/// The base address is only validated when a URL is built, so a builder can be created from
/// unchecked configuration and report the problem on first use.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_address: String,
}

impl RequestBuilder {
    pub fn new(base_address: impl Into<String>) -> Self {
        RequestBuilder {
            base_address: base_address.into(),
        }
    }

    /// Build the URL of `endpoint`, with the given query pairs appended in order.
    ///
    /// Fails with `Error::BadUrl` if the base address is not a valid URL. Query keys are
    /// assumed to be unique.
    pub fn build_url(&self, endpoint: Endpoint, queries: Option<&[(&str, &str)]>) -> Result<Url> {
        let mut url = Url::parse(&self.base_address)?.join(endpoint.token());
        for (key, value) in queries.unwrap_or_default() {
            url.append_query(key, value);
        }
        Ok(url)
    }

    pub fn categories_url(&self) -> Result<Url> {
        self.build_url(Endpoint::Categories, None)
    }

    pub fn menu_url(&self, category: &str) -> Result<Url> {
        self.build_url(
            Endpoint::Menu,
            Some(&[(Endpoint::Category.token(), category)]),
        )
    }

    pub fn order_url(&self) -> Result<Url> {
        self.build_url(Endpoint::Order, None)
    }
}
