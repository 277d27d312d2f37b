use itertools::Itertools;
use serde::Serialize;

pub const UNKNOWN_RESTAURANT: &str = "Unknown Restaurant";
pub const FAILED_RESTAURANT: &str = "Unknown";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub has_image: bool,
    pub image_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub restaurant_name: String,
    pub menu_items: Vec<MenuItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
}

impl RestaurantResult {
    pub fn scraped(url: &str, restaurant_name: String, menu_items: Vec<MenuItem>) -> Self {
        RestaurantResult {
            url: url.to_string(),
            error: None,
            restaurant_name,
            menu_items,
            scraped_at: Some(now_timestamp()),
        }
    }

    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        RestaurantResult {
            url: url.to_string(),
            error: Some(error.into()),
            restaurant_name: FAILED_RESTAURANT.to_string(),
            menu_items: vec![],
            scraped_at: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Local wall clock time in the format used by every response.
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Drops items whose trimmed name was already seen. First one wins.
pub fn dedup_by_name(items: impl IntoIterator<Item = MenuItem>) -> Vec<MenuItem> {
    items
        .into_iter()
        .unique_by(|item| item.name.trim().to_string())
        .collect()
}
