// This file contains the basic types used to communicate through the API
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::url::Url;

/// A dish on the menu, as returned by the API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MenuItem {
    /// Unique within a category listing
    pub id: u32,
    pub name: String,
    /// Price in dollars, never negative
    pub price: f64,
    #[serde(rename = "detailText")]
    pub detail_text: String,
    /// Absolute URL of the item picture
    #[serde(rename = "imageURL")]
    pub image_url: String,
    /// Category the item is listed under, when the backend sends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl MenuItem {
    /// The picture URL, parsed. Fails with `BadUrl` when the backend sent garbage.
    pub fn image_location(&self) -> Result<Url> {
        Url::parse(&self.image_url)
    }
}

/// Body of `GET /categories`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

/// Body of `GET /menu?category=<name>`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MenuResponse {
    pub items: Vec<MenuItem>,
}

/// Body of `POST /order`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderRequest {
    #[serde(rename = "menuIds")]
    pub menu_ids: Vec<u32>,
}

/// Answer to `POST /order`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct OrderResponse {
    /// Minutes until the order is ready
    pub preparation_time: u32,
}

/// The selection of items awaiting checkout
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Order {
    #[serde(rename = "menuItems")]
    pub menu_items: Vec<MenuItem>,
}

impl Order {
    /// Sum of the prices of every item, duplicates included
    pub fn total(&self) -> f64 {
        self.menu_items.iter().map(|item| item.price).sum()
    }

    /// Ids of the items in order, as sent on checkout
    pub fn menu_ids(&self) -> Vec<u32> {
        self.menu_items.iter().map(|item| item.id).collect()
    }
}
