use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use crate::api::{CategoriesResponse, MenuItem, MenuResponse, OrderRequest, OrderResponse};
use crate::endpoints::Endpoint;
use crate::errors::{Error, Result};
use crate::http::{HttpServer, Request, Response};
use crate::routes::*;

/// Trait hiding where the menu comes from
///
/// The development backend only ships an in-memory store, but the handlers only ever see this
/// trait.
pub trait MenuStore: Send + Sync {
    /// Every category, in display order
    fn categories(&self) -> Vec<String>;

    /// Items of `category`, or `None` if there is no such category
    ///
    /// `image_url` holds the bare file name of the picture; handlers turn it into an absolute
    /// URL on the address the request came in on.
    fn items(&self, category: &str) -> Option<Vec<MenuItem>>;

    /// Encoded picture with the given file name
    fn image(&self, name: &str) -> Option<Vec<u8>>;

    /// Record an order and return its preparation time in minutes
    ///
    /// Should fail with `Error::BadRequest` on an empty order or an unknown item id
    fn place_order(&self, menu_ids: &[u32]) -> Result<u32>;
}

/// Create the router serving the menu API
pub fn create_http_router() -> Result<HttpRouter> {
    let mut router = HttpRouter::new()?;

    router.add_route("GET", names::CATEGORIES, get_categories);
    router.add_route("GET", names::MENU, get_menu);
    router.add_route("POST", names::ORDER, post_order);
    router.add_route("GET", names::IMAGE_BY_NAME, get_image);

    Ok(router)
}

fn get_categories(_: Request, _: HttpParams, store: &dyn MenuStore) -> Result<Response> {
    Response::json(&CategoriesResponse {
        categories: store.categories(),
    })
}

fn get_menu(request: Request, _: HttpParams, store: &dyn MenuStore) -> Result<Response> {
    let category = request
        .url
        .query_value(Endpoint::Category.token())
        .ok_or_else(|| Error::BadRequest("missing category".to_string()))?;
    let mut items = store
        .items(category)
        .ok_or_else(|| Error::RouteNotFound(format!("category {}", category)))?;

    let authority = request.url.authority();
    for item in &mut items {
        item.image_url = format!("http://{}{}", authority, image_by_name(&item.image_url));
    }
    Response::json(&MenuResponse { items })
}

fn post_order(request: Request, _: HttpParams, store: &dyn MenuStore) -> Result<Response> {
    let order: OrderRequest = serde_json::from_slice(&request.body)?;
    let preparation_time = store.place_order(&order.menu_ids)?;
    Response::json(&OrderResponse { preparation_time })
}

fn get_image(_: Request, params: HttpParams, store: &dyn MenuStore) -> Result<Response> {
    let name = params
        .get(params::NAME)
        .ok_or_else(|| Error::BadRequest("missing image name".to_string()))?;
    let image = store
        .image(name)
        .ok_or_else(|| Error::RouteNotFound(format!("image {}", name)))?;
    Ok(Response::ok_with_body(image).with_header("Content-Type", "image/png"))
}

/// The development backend: a router over a menu store
pub struct Backend {
    router: HttpRouter,
    store: Arc<dyn MenuStore>,
}

impl Backend {
    pub fn new(store: Arc<dyn MenuStore>) -> Result<Self> {
        Ok(Backend {
            router: create_http_router()?,
            store,
        })
    }

    /// Answer a request. Errors become empty-bodied responses carrying their status code.
    pub fn handle(&self, request: Request) -> Response {
        let method = request.method.clone();
        let path = request.url.path().to_string();
        match self.router.route(request, self.store.as_ref()) {
            Ok(response) => response,
            Err(err) => {
                let code = err.status_code();
                if code >= 500 {
                    warn!(%method, %path, "request failed: {}", err);
                } else {
                    info!(%method, %path, code, "rejected request: {}", err);
                }
                Response::error(code)
            }
        }
    }

    /// Serve on `server` from a background thread, for as long as the process lives
    pub fn spawn(self: Arc<Self>, server: HttpServer) -> Result<SocketAddr> {
        let address = server.local_addr()?;
        thread::Builder::new()
            .name("menu-backend".to_string())
            .spawn(move || server.serve(move |request| self.handle(request)))?;
        Ok(address)
    }
}

pub mod mock {
    use parking_lot::Mutex;
    use rand::Rng;

    use super::*;
    use crate::image::PLACEHOLDER_PNG;

    struct Dish {
        item: MenuItem,
        preparation_time: u32,
    }

    /// In-memory menu with a handful of dishes per category
    pub struct MockStore {
        categories: Vec<String>,
        dishes: Vec<Dish>,
        orders: Mutex<Vec<Vec<u32>>>,
    }

    const MENU: &[(&str, &str, f64, &str)] = &[
        ("appetizers", "Spring Rolls", 5.5, "Crispy rolls with a sweet chili dip."),
        ("appetizers", "Garlic Bread", 3.0, "Toasted baguette with garlic butter."),
        ("entrees", "Spaghetti and Meatballs", 9.5, "Seasoned meatballs on freshly-made spaghetti."),
        ("entrees", "Grilled Salmon", 14.0, "Salmon fillet with lemon and seasonal vegetables."),
        ("entrees", "Mushroom Risotto", 11.25, "Creamy arborio rice with porcini."),
        ("soups", "Tomato Soup", 4.75, "Roasted tomatoes and basil."),
        ("soups", "Miso Soup", 3.5, "Tofu, wakame and scallions."),
        ("desserts", "Cheesecake", 6.0, "New York style with berry compote."),
    ];

    impl MockStore {
        pub fn new() -> Self {
            let mut categories: Vec<String> = Vec::new();
            let mut rng = rand::thread_rng();
            let dishes = MENU
                .iter()
                .zip(1..)
                .map(|(&(category, name, price, detail), id)| {
                    if !categories.iter().any(|c| c == category) {
                        categories.push(category.to_string());
                    }
                    Dish {
                        item: MenuItem {
                            id,
                            name: name.to_string(),
                            price,
                            detail_text: detail.to_string(),
                            image_url: format!("{}.png", id),
                            category: Some(category.to_string()),
                        },
                        preparation_time: rng.gen_range(5..15),
                    }
                })
                .collect();

            MockStore {
                categories,
                dishes,
                orders: Mutex::new(Vec::new()),
            }
        }

        /// Orders placed so far, oldest first
        pub fn orders(&self) -> Vec<Vec<u32>> {
            self.orders.lock().clone()
        }

        fn dish(&self, id: u32) -> Option<&Dish> {
            self.dishes.iter().find(|dish| dish.item.id == id)
        }
    }

    impl Default for MockStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MenuStore for MockStore {
        fn categories(&self) -> Vec<String> {
            self.categories.clone()
        }

        fn items(&self, category: &str) -> Option<Vec<MenuItem>> {
            if !self.categories.iter().any(|c| c == category) {
                return None;
            }
            Some(
                self.dishes
                    .iter()
                    .filter(|dish| dish.item.category.as_deref() == Some(category))
                    .map(|dish| dish.item.clone())
                    .collect(),
            )
        }

        fn image(&self, name: &str) -> Option<Vec<u8>> {
            let id = name.strip_suffix(".png")?.parse::<u32>().ok()?;
            self.dish(id).map(|_| PLACEHOLDER_PNG.to_vec())
        }

        /// The kitchen works in parallel: an order takes as long as its slowest dish, plus a
        /// minute per additional dish
        fn place_order(&self, menu_ids: &[u32]) -> Result<u32> {
            if menu_ids.is_empty() {
                return Err(Error::BadRequest("empty order".to_string()));
            }
            let mut slowest = 0;
            for id in menu_ids {
                let dish = self
                    .dish(*id)
                    .ok_or_else(|| Error::BadRequest(format!("no menu item with id {}", id)))?;
                slowest = slowest.max(dish.preparation_time);
            }
            self.orders.lock().push(menu_ids.to_vec());
            Ok(slowest + menu_ids.len() as u32 - 1)
        }
    }

}
