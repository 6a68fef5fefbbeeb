use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::api::{CategoriesResponse, MenuItem, MenuResponse};
use crate::config::ClientConfig;
use crate::errors::{Error, Result};
use crate::fetch::Fetcher;
use crate::http::{HttpClient, Request, Transport};
use crate::image::Image;
use crate::loader::ImageSource;
use crate::request_builder::RequestBuilder;
use crate::url::Url;

/// Entry point of the client: lists categories and menu items, fetches pictures and submits
/// orders (see `order.rs`) against one backend.
#[derive(Clone)]
pub struct MenuClient {
    pub(crate) builder: RequestBuilder,
    pub(crate) fetcher: Fetcher,
}

impl MenuClient {
    pub fn new(builder: RequestBuilder, fetcher: Fetcher) -> Self {
        MenuClient { builder, fetcher }
    }

    /// Client talking HTTP to the configured backend, bound to the current tokio runtime
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpClient::new(config.request_timeout));
        Ok(MenuClient::new(
            RequestBuilder::new(config.base_url.clone()),
            Fetcher::new(transport)?,
        ))
    }

    pub async fn fetch_categories(&self) -> Result<Vec<String>> {
        let url = self.builder.categories_url()?;
        let response: CategoriesResponse = self.fetcher.fetch(&url).await?;
        Ok(response.categories)
    }

    pub fn fetch_categories_with<F>(&self, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<String>>) + Send + 'static,
    {
        let client = self.clone();
        self.fetcher
            .complete_with(async move { client.fetch_categories().await }, on_complete)
    }

    /// Items listed under `category`, in the order the backend sends them
    pub async fn fetch_menu_items(&self, category: &str) -> Result<Vec<MenuItem>> {
        let url = self.builder.menu_url(category)?;
        let response: MenuResponse = self.fetcher.fetch(&url).await?;
        Ok(response.items)
    }

    pub fn fetch_menu_items_with<F>(&self, category: &str, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<MenuItem>>) + Send + 'static,
    {
        let client = self.clone();
        let category = category.to_string();
        self.fetcher.complete_with(
            async move { client.fetch_menu_items(&category).await },
            on_complete,
        )
    }

    /// GET a picture and decode it.
    ///
    /// A status other than 200, a missing status and undecodable bytes all fail with
    /// `Error::ImageDataMissing`. Transport failures are passed through.
    pub async fn fetch_image(&self, url: &Url) -> Result<Image> {
        let response = self.fetcher.send(Request::get(url.clone())).await?;
        if response.status != Some(200) {
            return Err(Error::ImageDataMissing);
        }
        Image::decode(&response.body)
    }

    pub fn fetch_image_with<F>(&self, url: Url, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Image>) + Send + 'static,
    {
        let client = self.clone();
        self.fetcher
            .complete_with(async move { client.fetch_image(&url).await }, on_complete)
    }
}

#[async_trait]
impl ImageSource for MenuClient {
    async fn load_image(&self, url: &Url) -> Result<Image> {
        self.fetch_image(url).await
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::http::mock::MockTransport;
    use crate::image::PLACEHOLDER_PNG;
    use tokio::sync::oneshot;

    pub(crate) const BASE: &str = "http://localhost:8080";

    pub(crate) fn client(transport: &Arc<MockTransport>) -> MenuClient {
        MenuClient::new(
            RequestBuilder::new(BASE),
            Fetcher::new(transport.clone()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_categories() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_with(
            "http://localhost:8080/categories",
            200,
            br#"{"categories":["appetizers","entrees"]}"#,
        );

        let categories = client(&transport).fetch_categories().await.unwrap();
        assert_eq!(categories, vec!["appetizers", "entrees"]);
    }

    #[tokio::test]
    async fn test_fetch_menu_items() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_with(
            "http://localhost:8080/menu?category=entrees",
            200,
            br#"{"items":[{"id":1,"name":"Spaghetti","price":9.5,"detailText":"","imageURL":"http://localhost:8080/images/1.png"}]}"#,
        );

        let items = client(&transport).fetch_menu_items("entrees").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Spaghetti");
        assert_eq!(transport.requests()[0].url.query_value("category"), Some("entrees"));
    }

    #[tokio::test]
    async fn test_fetch_menu_items_with_callback() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_with("http://localhost:8080/menu?category=soups", 404, b"");

        let (tx, rx) = oneshot::channel();
        client(&transport).fetch_menu_items_with("soups", move |result| {
            let _ = tx.send(result);
        });
        assert!(matches!(rx.await.unwrap(), Err(Error::NotFound(404))));
    }

    #[tokio::test]
    async fn test_bad_base_address_fails_before_io() {
        let transport = Arc::new(MockTransport::new());
        let client = MenuClient::new(
            RequestBuilder::new("nonsense"),
            Fetcher::new(transport.clone()).unwrap(),
        );

        assert!(matches!(client.fetch_categories().await, Err(Error::BadUrl(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_image() {
        let transport = Arc::new(MockTransport::new());
        let url = Url::parse("http://localhost:8080/images/1.png").unwrap();
        transport.respond_with(&url.to_string(), 200, PLACEHOLDER_PNG);

        let image = client(&transport).fetch_image(&url).await.unwrap();
        assert_eq!(image.width(), 1);
    }

    #[tokio::test]
    async fn test_fetch_image_failures() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);
        let url = Url::parse("http://localhost:8080/images/1.png").unwrap();

        transport.respond_with(&url.to_string(), 404, PLACEHOLDER_PNG);
        assert!(matches!(client.fetch_image(&url).await, Err(Error::ImageDataMissing)));

        transport.respond_with(&url.to_string(), 200, b"<html>not found</html>");
        assert!(matches!(client.fetch_image(&url).await, Err(Error::ImageDataMissing)));
    }
}
