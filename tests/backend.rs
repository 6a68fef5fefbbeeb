use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use orderkit::backend::{mock::MockStore, Backend};
use orderkit::config::ClientConfig;
use orderkit::errors::Error;
use orderkit::http::HttpServer;
use orderkit::image::{ImageFormat, PLACEHOLDER_PNG};
use orderkit::loader::{ImageLoader, RowBindings};
use orderkit::menu::MenuClient;
use orderkit::order::PreparationTime;
use orderkit::order_state::OrderState;
use orderkit::url::Url;

/// Start a development backend on a free port and return its store and base URL
fn start_backend() -> (Arc<MockStore>, String) {
    let store = Arc::new(MockStore::new());
    let backend = Arc::new(Backend::new(store.clone()).unwrap());
    let server = HttpServer::new("127.0.0.1:0").unwrap();
    let address = backend.spawn(server).unwrap();
    (store, format!("http://{}", address))
}

fn client(base_url: &str) -> MenuClient {
    MenuClient::from_config(&ClientConfig {
        base_url: base_url.to_string(),
        request_timeout: Some(Duration::from_secs(5)),
    })
    .unwrap()
}

async fn wait_idle(loader: &ImageLoader<usize>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while loader.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("image loads never finished");
}

#[tokio::test]
async fn test_browse_menu() {
    let (_store, base_url) = start_backend();
    let client = client(&base_url);

    let categories = client.fetch_categories().await.unwrap();
    assert_eq!(categories, vec!["appetizers", "entrees", "soups", "desserts"]);

    let entrees = client.fetch_menu_items("entrees").await.unwrap();
    assert_eq!(entrees.len(), 3);
    assert!(entrees
        .iter()
        .all(|item| item.category.as_deref() == Some("entrees")));
    assert!(entrees[0].image_url.starts_with(&base_url));
}

#[tokio::test]
async fn test_unknown_category() {
    let (_store, base_url) = start_backend();
    let result = client(&base_url).fetch_menu_items("breakfast").await;
    assert!(matches!(result, Err(Error::NotFound(404))));
}

#[tokio::test]
async fn test_fetch_image() {
    let (_store, base_url) = start_backend();
    let client = client(&base_url);
    let item = &client.fetch_menu_items("desserts").await.unwrap()[0];

    let image = client.fetch_image(&item.image_location().unwrap()).await.unwrap();
    assert_eq!(image.format(), ImageFormat::Png);
    assert_eq!(image.data(), PLACEHOLDER_PNG);

    let missing = Url::parse(&format!("{}/images/404.png", base_url)).unwrap();
    assert!(matches!(client.fetch_image(&missing).await, Err(Error::ImageDataMissing)));
}

#[tokio::test]
async fn test_checkout() {
    let (store, base_url) = start_backend();
    let client = client(&base_url);

    let order = OrderState::new();
    for item in client.fetch_menu_items("soups").await.unwrap() {
        order.append(item);
    }
    let soups = order.menu_ids();
    assert_eq!(soups.len(), 2);

    let minutes = client.submit_order(&soups).await.unwrap();
    assert!(minutes >= PreparationTime(6));
    assert_eq!(store.orders(), vec![soups]);

    assert!(matches!(
        client.submit_order(&[]).await,
        Err(Error::OrderRequestFailed(400))
    ));
    assert!(matches!(
        client.submit_order(&[1000]).await,
        Err(Error::OrderRequestFailed(400))
    ));
}

#[tokio::test]
async fn test_checkout_with_callback() {
    let (_store, base_url) = start_backend();
    let (tx, rx) = tokio::sync::oneshot::channel();

    client(&base_url).submit_order_with(&[1, 2, 3], move |result| {
        let _ = tx.send(result);
    });

    let minutes = rx.await.unwrap().unwrap();
    assert!(minutes.minutes() >= 7);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_row_images() {
    let (_store, base_url) = start_backend();
    let client = client(&base_url);
    let items = client.fetch_menu_items("entrees").await.unwrap();

    let loader = ImageLoader::new(Arc::new(client.clone())).unwrap();
    let bindings = RowBindings::new();
    let applied = Arc::new(Mutex::new(Vec::new()));

    for (row, item) in items.iter().enumerate() {
        bindings.bind(row, item.id);
        let applied = Arc::clone(&applied);
        loader.request_image(
            row,
            item.image_location().unwrap(),
            bindings.is_current(row, item.id),
            move |image| applied.lock().push((row, image.width())),
        );
    }

    // A row that points at a picture the backend does not have gets nothing
    let missing = Url::parse(&format!("{}/images/999.png", base_url)).unwrap();
    bindings.bind(10, 999);
    let sink = Arc::clone(&applied);
    loader.request_image(10, missing, bindings.is_current(10, 999), move |image| {
        sink.lock().push((10, image.width()))
    });

    wait_idle(&loader).await;
    let mut applied = applied.lock().clone();
    applied.sort();
    assert_eq!(applied, vec![(0, 1), (1, 1), (2, 1)]);
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop a listener to get a port nobody listens on
    let address = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = client(&format!("http://{}", address));
    assert!(matches!(client.fetch_categories().await, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_bad_base_url() {
    let client = client("ftp://example.com");
    assert!(matches!(client.fetch_categories().await, Err(Error::BadUrl(_))));
    assert!(matches!(client.submit_order(&[1]).await, Err(Error::BadUrl(_))));
}
