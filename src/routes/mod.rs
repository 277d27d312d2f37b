pub mod api_response;
pub mod default_route;
pub mod health_route;
pub mod scrape_route;

pub use api_response::*;
