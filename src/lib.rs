//! Client side of a restaurant ordering app: menu browsing, image loading for recycled list
//! rows, a shared order with change notification and checkout. Also ships the small blocking
//! HTTP backend the client is developed and tested against.

pub mod api;
pub mod config;
pub mod endpoints;
pub mod errors;
pub mod fetch;
pub mod http;
pub mod image;
pub mod loader;
pub mod logging;
pub mod menu;
pub mod order;
pub mod order_state;
pub mod request_builder;
pub mod url;

pub mod backend;
pub mod routes;
pub mod threadpool;
