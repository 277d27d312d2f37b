pub mod image_url;
pub mod item_parser;
pub mod menu_item;

pub use image_url::*;
pub use item_parser::*;
pub use menu_item::*;
