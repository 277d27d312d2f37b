pub mod droid;
pub mod page_driver;
pub mod page_loader;
pub mod restaurant_scraper;

#[cfg(test)]
pub(crate) mod fake_driver;

pub use droid::*;
pub use page_driver::*;
pub use page_loader::*;
pub use restaurant_scraper::*;
