use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::{
    configuration::ScraperSettings,
    domain::{
        build_menu_item, dedup_by_name, parser_for, ImageValidator, ItemParser, ItemSnapshot,
        MenuItem, RestaurantResult, UNKNOWN_RESTAURANT,
    },
};

use super::{DriverError, Locator, PageDriver, PageLoader, SessionFactory};

type Snapshots = Vec<Result<ItemSnapshot, DriverError>>;

/// Opens a session, scrapes `url` and always quits the session.
///
/// Only a failure to open the session is returned as an error. Everything
/// after that ends up in the returned `RestaurantResult`.
pub async fn scrape_with_session(
    factory: &dyn SessionFactory,
    url: &str,
    settings: &ScraperSettings,
) -> Result<RestaurantResult, DriverError> {
    let scrape_id = Uuid::new_v4();
    log::info!("[{}] Starting scrape for URL: {}", scrape_id, url);

    let driver = factory.open().await?;

    let result = match timeout(
        settings.scrape_timeout(),
        scrape_restaurant(driver.as_ref(), url, settings),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => {
            log::error!(
                "[{}] Scrape timed out after {} seconds",
                scrape_id,
                settings.scrape_timeout_secs
            );
            RestaurantResult::failed(
                url,
                format!(
                    "Scrape timed out after {} seconds",
                    settings.scrape_timeout_secs
                ),
            )
        }
    };

    if let Err(e) = driver.quit().await {
        log::error!("[{}] Failed to close browser session: {}", scrape_id, e);
    }

    match &result.error {
        Some(e) => log::error!("[{}] Scrape failed: {}", scrape_id, e),
        None => log::info!(
            "[{}] Scraped {} menu items from {}",
            scrape_id,
            result.menu_items.len(),
            result.restaurant_name
        ),
    }

    Ok(result)
}

/// Scrapes a restaurant page with an already open session. Never fails:
/// errors come back as a `RestaurantResult` carrying the message.
pub async fn scrape_restaurant(
    driver: &dyn PageDriver,
    url: &str,
    settings: &ScraperSettings,
) -> RestaurantResult {
    let scraper = RestaurantScraper::new(driver, settings);

    match scraper.run(url).await {
        Ok(result) => result,
        Err(e) => {
            log::error!("Error scraping restaurant {}: {}", url, e);
            RestaurantResult::failed(url, e.to_string())
        }
    }
}

pub struct RestaurantScraper<'a> {
    driver: &'a dyn PageDriver,
    settings: &'a ScraperSettings,
    parser: Box<dyn ItemParser>,
    validator: ImageValidator,
}

impl<'a> RestaurantScraper<'a> {
    pub fn new(driver: &'a dyn PageDriver, settings: &'a ScraperSettings) -> Self {
        RestaurantScraper {
            driver,
            settings,
            parser: parser_for(settings.name_strategy, &settings.boilerplate_prefixes),
            validator: ImageValidator::new(&settings.images),
        }
    }

    async fn run(&self, url: &str) -> Result<RestaurantResult, DriverError> {
        log::info!("Navigating to: {}", url);
        self.driver.goto(url).await?;
        sleep(self.settings.settle_delay()).await;

        PageLoader::new(self.driver, self.settings).prepare().await;

        let restaurant_name = self.extract_restaurant_name().await?;
        let menu_items = self.extract_menu_items().await?;

        Ok(RestaurantResult::scraped(url, restaurant_name, menu_items))
    }

    pub async fn extract_restaurant_name(&self) -> Result<String, DriverError> {
        for selector in self.settings.selectors.restaurant_name.iter() {
            if let Some(name) = self.driver.first_text(&Locator::css(selector)).await? {
                log::info!("Restaurant: {}", name);
                return Ok(name);
            }
        }

        let title = self.driver.title().await?;
        if let Some(name) = name_from_title(&title, &self.settings.title_brand) {
            log::info!("Restaurant (from title): {}", name);
            return Ok(name);
        }

        log::warn!("Could not extract restaurant name");
        Ok(UNKNOWN_RESTAURANT.to_string())
    }

    pub async fn extract_menu_items(&self) -> Result<Vec<MenuItem>, DriverError> {
        let snapshots = self.find_item_snapshots().await?;

        let parsed: Vec<MenuItem> = snapshots
            .into_iter()
            .enumerate()
            .filter_map(|(index, snapshot)| match snapshot {
                Ok(snapshot) => {
                    let item =
                        build_menu_item(self.parser.as_ref(), &self.validator, &snapshot);
                    if item.is_none() {
                        log::debug!("Skipping element {}: no item name found", index);
                    }
                    item
                }
                Err(e) => {
                    log::warn!("Error extracting item {}: {}", index, e);
                    None
                }
            })
            .collect();

        let parsed_count = parsed.len();
        let mut menu_items = dedup_by_name(parsed);
        if menu_items.len() < parsed_count {
            log::info!(
                "Skipped {} duplicate items",
                parsed_count - menu_items.len()
            );
        }
        if menu_items.len() > self.settings.max_items {
            log::info!("Stopping at {} items", self.settings.max_items);
            menu_items.truncate(self.settings.max_items);
        }

        for item in menu_items.iter() {
            log::debug!(
                "Extracted item: {} (image valid: {})",
                item.name,
                item.image_valid
            );
        }

        Ok(menu_items)
    }

    async fn find_item_snapshots(&self) -> Result<Snapshots, DriverError> {
        let selectors = &self.settings.selectors;
        let limit = self.settings.max_elements;

        for selector in selectors.menu_items.iter() {
            match self.driver.snapshots(&Locator::css(selector), limit).await {
                Ok(snapshots) if !snapshots.is_empty() => {
                    log::info!(
                        "Found {} menu items using selector: {}",
                        snapshots.len(),
                        selector
                    );
                    return Ok(snapshots);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Item selector {} failed: {}", selector, e),
            }
        }

        log::warn!("No menu items found with configured selectors");

        if !selectors.fallback_items.is_empty() {
            let fallback = Locator::css(selectors.fallback_items.join(", "));
            let snapshots = self.driver.snapshots(&fallback, limit).await?;
            if !snapshots.is_empty() {
                log::info!("Trying fallback approach, found {} potential elements", snapshots.len());
                return Ok(snapshots);
            }
        }

        let generic = Locator::css(selectors.generic_items.as_str());
        let snapshots = self
            .driver
            .snapshots(&generic, selectors.generic_limit.min(limit))
            .await?;
        log::info!("Trying generic approach, found {} potential elements", snapshots.len());

        Ok(snapshots)
    }
}

/// Strips the brand and separators from a page title like "Bao House | Uber Eats".
fn name_from_title(title: &str, brand: &str) -> Option<String> {
    if brand.is_empty() || !title.contains(brand) {
        return None;
    }

    let name = title.replace(brand, "");
    let name = name.trim_matches(|c: char| c.is_whitespace() || c == '|' || c == '-');

    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{
        domain::FAILED_RESTAURANT,
        services::fake_driver::{FakeDriver, FakeFactory, Stage},
    };

    const URL: &str = "https://www.ubereats.com/ca/store/bao-house/asnz-rOyQg2LrGchrWtqwg";
    const ITEMS: &str = r#"a[href*="item"]"#;
    const CDN_IMAGE: &str = "https://tb-static.uber.com/prod/image-proc/processed_images/1f/2e";

    fn menu_page() -> FakeDriver {
        FakeDriver::default()
            .with_text(r#"h1[data-testid="store-title"]"#, "Bao House")
            .with_items(
                ITEMS,
                vec![
                    ("#1 most liked\n302 Dumplings\n$7.49 • 89% (192)", Some(CDN_IMAGE)),
                    ("Pork Bao\nSteamed bun\n$3.00", Some("https://cdn.example.com/placeholder.png")),
                    ("302 Dumplings\n$7.49", None),
                    ("#3 most liked\n$1.00", None),
                ],
            )
            .with_broken_item(ITEMS)
            .with_items(ITEMS, vec![("Tofu Rice\n$8.00", Some("https://img.example.com/tofu.jpg"))])
    }

    #[tokio::test(start_paused = true)]
    async fn scrapes_name_and_deduplicated_items() {
        let driver = menu_page();
        let settings = ScraperSettings::default();

        let result = scrape_restaurant(&driver, URL, &settings).await;

        assert!(!result.is_error());
        assert_eq!(result.restaurant_name, "Bao House");
        assert_eq!(driver.visited(), vec![URL.to_string()]);

        let names: Vec<&str> = result.menu_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["302 Dumplings", "Pork Bao", "Tofu Rice"]);

        let dumplings = &result.menu_items[0];
        assert_eq!(dumplings.price, "$7.49");
        assert!(dumplings.has_image && dumplings.image_valid);

        let bao = &result.menu_items[1];
        assert_eq!(bao.description, "Steamed bun");
        assert!(bao.has_image && !bao.image_valid);
        assert!(result.scraped_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn name_falls_back_to_title_then_constant() {
        let settings = ScraperSettings::default();

        let driver = FakeDriver::default().with_title("Bao House (North York) | Uber Eats");
        let result = scrape_restaurant(&driver, URL, &settings).await;
        assert_eq!(result.restaurant_name, "Bao House (North York)");

        let driver = FakeDriver::default().with_title("Just a moment...");
        let result = scrape_restaurant(&driver, URL, &settings).await;
        assert_eq!(result.restaurant_name, UNKNOWN_RESTAURANT);
        assert!(!result.is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn name_extraction_failure_yields_error_result() {
        let driver = menu_page().failing_at(Stage::Name);
        let settings = ScraperSettings::default();

        let result = scrape_restaurant(&driver, URL, &settings).await;

        assert!(result.is_error());
        assert_eq!(result.restaurant_name, FAILED_RESTAURANT);
        assert!(result.menu_items.is_empty());
        assert_eq!(result.url, URL);
    }

    #[tokio::test(start_paused = true)]
    async fn best_effort_steps_do_not_abort() {
        let driver = menu_page()
            .failing_at(Stage::Popup)
            .failing_at(Stage::Escape)
            .failing_at(Stage::Count)
            .failing_at(Stage::Script);
        let settings = ScraperSettings::default();

        let result = scrape_restaurant(&driver, URL, &settings).await;

        assert!(!result.is_error());
        assert_eq!(result.menu_items.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_menu_containers() {
        let fallback = "div[class*='menu'], article[class*='menu'], section[class*='menu']";
        let driver = FakeDriver::default().with_items(fallback, vec![("Beef Noodle Soup\n$12.00", None)]);
        let settings = ScraperSettings::default();

        let result = scrape_restaurant(&driver, URL, &settings).await;

        assert_eq!(result.menu_items.len(), 1);
        assert_eq!(result.menu_items[0].name, "Beef Noodle Soup");
    }

    #[tokio::test(start_paused = true)]
    async fn caps_unique_items() {
        let texts: Vec<String> = (0..80).map(|i| format!("Dish {}\n${}.00", i, i)).collect();
        let driver = FakeDriver::default().with_items(
            ITEMS,
            texts.iter().map(|t| (t.as_str(), None)).collect(),
        );
        let settings = ScraperSettings::default();

        let result = scrape_restaurant(&driver, URL, &settings).await;

        assert_eq!(result.menu_items.len(), settings.max_items);
        assert_eq!(result.menu_items[0].name, "Dish 0");
    }

    #[tokio::test(start_paused = true)]
    async fn session_closed_once_on_success() {
        let driver = menu_page();
        let quits = driver.quit_counter();
        let factory = FakeFactory::new(driver);

        let result = scrape_with_session(&factory, URL, &ScraperSettings::default())
            .await
            .unwrap();

        assert!(!result.is_error());
        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn session_closed_once_whichever_stage_fails() {
        for stage in [Stage::Goto, Stage::Name, Stage::Title, Stage::Items] {
            let driver = FakeDriver::default().failing_at(stage);
            let quits = driver.quit_counter();
            let factory = FakeFactory::new(driver);

            let result = scrape_with_session(&factory, URL, &ScraperSettings::default())
                .await
                .unwrap();

            assert!(result.is_error(), "{:?} should produce an error result", stage);
            assert_eq!(quits.load(Ordering::SeqCst), 1, "quit count after {:?}", stage);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_page_times_out_and_closes_session() {
        let driver = FakeDriver::default().hanging_on_goto();
        let quits = driver.quit_counter();
        let factory = FakeFactory::new(driver);

        let result = scrape_with_session(&factory, URL, &ScraperSettings::default())
            .await
            .unwrap();

        assert_eq!(
            result.error.as_deref(),
            Some("Scrape timed out after 180 seconds")
        );
        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_failure_keeps_result() {
        let driver = menu_page().failing_at(Stage::Quit);
        let quits = driver.quit_counter();
        let factory = FakeFactory::new(driver);

        let result = scrape_with_session(&factory, URL, &ScraperSettings::default())
            .await
            .unwrap();

        assert!(!result.is_error());
        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_start_failure_propagates() {
        let factory = FakeFactory::default();

        let result = scrape_with_session(&factory, URL, &ScraperSettings::default()).await;

        assert!(matches!(result, Err(DriverError::Session(_))));
        assert_eq!(factory.opens(), 1);
    }

    #[test]
    fn title_cleanup() {
        assert_eq!(
            name_from_title("Bao House - Uber Eats", "Uber Eats").as_deref(),
            Some("Bao House")
        );
        assert_eq!(name_from_title("Uber Eats", "Uber Eats"), None);
        assert_eq!(name_from_title("Bao House", "Uber Eats"), None);
    }
}
