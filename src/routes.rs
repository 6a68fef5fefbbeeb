use std::collections::HashMap;

use matchit::Router;

use crate::backend::MenuStore;
use crate::errors::{Error, Result};
use crate::http::{Request, Response};

/// Utility macro generating a constant for the HTTP route, and associate it with
/// an identifier. Matchit requires both
macro_rules! make_routes {
    ($($name:ident: $path:expr,)*) => {
        /// Route patterns as understood by matchit
        pub mod patterns {
            use crate::endpoints::paths;
            $(
                pub const $name: &str = $path;
            )*
        }

        /// Names of the routes, used to register handlers
        pub mod names {
            $(
                pub const $name: &str = stringify!($name);
            )*
        }
    };
}

make_routes! {
    CATEGORIES: paths::Categories,
    MENU: paths::Menu,
    ORDER: paths::Order,
    IMAGE_BY_NAME: "/images/{name}",
}

/// Utility to add a list of routes to the router automatically
macro_rules! add_route {
    ($router:ident $(, $name:ident)*) => {
        $(
            $router.insert(patterns::$name, names::$name)?;
        )*
    }
}

/// Names of the parameters in the HTTP paths, used to extract them
/// from the parameters inside of request handling
pub mod params {
    /// File name of an image
    pub const NAME: &str = "name";
}

/// Return the HTTP path of an image based on its file name
pub fn image_by_name(name: &str) -> String {
    patterns::IMAGE_BY_NAME.replace("{name}", name)
}

// spurious warning, I am using this in tests
#[allow(unused_macros)]
/// Utility to create easily hashmaps of parameters for testing
macro_rules! make_params {
    () => {
        std::collections::HashMap::new()
    };
    ($name:ident: $value:expr $(, $name2:ident: $value2:expr)* ) => {
        {
            let mut map = std::collections::HashMap::new();
            map.insert($crate::routes::params::$name.to_string(), $value.to_string());
            $(
                map.insert($crate::routes::params::$name2.to_string(), $value2.to_string());
            )*
            map
        }
    }
}

#[allow(unused_imports)]
pub(crate) use make_params;

/// Create a new router with the paths defined in this module
///
/// Errors from this functions are programming errors, most likely steming from a
/// misuse of matchit
fn new_router() -> Result<Router<&'static str>> {
    let mut router = Router::new();
    add_route!(router, CATEGORIES, MENU, ORDER, IMAGE_BY_NAME);
    Ok(router)
}

/// Type of the object containing the HTTP path parameters passed to handlers
pub type HttpParams = HashMap<String, String>;
/// Type of the function that handles HTTP requests
pub type HttpHandler = fn(Request, HttpParams, &dyn MenuStore) -> Result<Response>;

/// The router is in charge of taking in parsed HTTP requests and to dispatch them to
/// the appropriate handler function.
pub struct HttpRouter {
    routes: Router<&'static str>,
    handlers: HashMap<&'static str, HashMap<&'static str, HttpHandler>>,
}

impl HttpRouter {
    /// Creates a new router without any handler
    ///
    /// Although the matchit router is not empty, there are no methods associated
    /// to the routes yet, so no request can be processed
    /// Errors in this function are programming errors.
    pub fn new() -> Result<Self> {
        Ok(HttpRouter {
            routes: new_router()?,
            handlers: HashMap::new(),
        })
    }

    /// Add a new handler to the router
    pub fn add_route(&mut self, method: &'static str, route: &'static str, handler: HttpHandler) {
        self.handlers
            .entry(route)
            .or_default()
            .insert(method, handler);
    }

    /// Sends a request to the appropriate handler if it exists
    ///
    /// If there is a route matching the request path and method, the result is whatever its
    /// handler returns. Otherwise `Error::RouteNotFound`.
    ///
    /// Checking that all parameters are presents and that the body is correct is the
    /// responsibility of the handler
    pub fn route(&self, request: Request, store: &dyn MenuStore) -> Result<Response> {
        let path = request.url.path().to_string();
        let route = self
            .routes
            .at(&path)
            .map_err(|_| Error::RouteNotFound(path.clone()))?;
        let handler = self
            .handlers
            .get(route.value)
            .and_then(|methods| methods.get(request.method.as_str()))
            .ok_or_else(|| Error::RouteNotFound(format!("{} {}", request.method, path)))?;

        let params: HttpParams = route
            .params
            .iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        handler(request, params, store)
    }
}
