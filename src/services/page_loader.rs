//! Gets a dynamically rendered page into a scrapeable state.
//!
//! Every step here is best-effort: failures are logged and the scrape moves on
//! with whatever the page has rendered so far.

use tokio::time::{sleep, Instant};

use crate::configuration::ScraperSettings;

use super::{DriverError, Locator, PageDriver};

const SCROLL_TO_BOTTOM: &str =
    "window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight;";
const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    Clicked,
    Escaped,
    Untouched,
}

pub struct PageLoader<'a> {
    driver: &'a dyn PageDriver,
    settings: &'a ScraperSettings,
}

impl<'a> PageLoader<'a> {
    pub fn new(driver: &'a dyn PageDriver, settings: &'a ScraperSettings) -> Self {
        PageLoader { driver, settings }
    }

    pub async fn prepare(&self) {
        self.dismiss_popups().await;
        self.wait_for_items().await;
        self.scroll_to_load().await;
    }

    pub async fn dismiss_popups(&self) -> PopupOutcome {
        let selectors = &self.settings.selectors;
        let candidates = selectors
            .popup_close_css
            .iter()
            .map(Locator::css)
            .chain(selectors.popup_close_xpath.iter().map(Locator::xpath));

        for locator in candidates {
            match self.driver.click_first_interactable(&locator).await {
                Ok(true) => {
                    log::info!("Closed popup using {}", locator);
                    return PopupOutcome::Clicked;
                }
                Ok(false) => {}
                Err(e) => log::warn!("Popup close attempt with {} failed: {}", locator, e),
            }
        }

        match self.driver.press_escape().await {
            Ok(()) => {
                log::debug!("No popup close control found, sent Escape");
                PopupOutcome::Escaped
            }
            Err(e) => {
                log::warn!("Failed to send Escape to dismiss popups: {}", e);
                PopupOutcome::Untouched
            }
        }
    }

    /// Polls until at least one item element exists. Returns whether any showed up.
    pub async fn wait_for_items(&self) -> bool {
        let Some(selector) = self.settings.selectors.menu_items.first() else {
            return false;
        };
        let locator = Locator::css(selector);
        let deadline = Instant::now() + self.settings.item_wait_timeout();

        loop {
            match self.driver.count(&locator).await {
                Ok(count) if count > 0 => {
                    log::info!("Found {} item elements for {}", count, locator);
                    return true;
                }
                Ok(_) => {}
                Err(e) => log::warn!("Counting {} failed: {}", locator, e),
            }

            if Instant::now() >= deadline {
                log::warn!("Timeout waiting for menu items to load");
                return false;
            }
            sleep(self.settings.poll_interval()).await;
        }
    }

    /// Scrolls to the bottom until the page height settles or the round budget is spent.
    /// Returns the number of rounds performed.
    pub async fn scroll_to_load(&self) -> u32 {
        let mut last_height: Option<u64> = None;
        let mut rounds = 0;

        while rounds < self.settings.scroll_rounds {
            let height = match self.scroll_once().await {
                Ok(height) => height,
                Err(e) => {
                    log::warn!("Scrolling failed after {} rounds: {}", rounds, e);
                    break;
                }
            };
            rounds += 1;
            sleep(self.settings.scroll_pause()).await;

            if height.is_some() && height == last_height {
                log::debug!("Page height settled after {} scroll rounds", rounds);
                break;
            }
            last_height = height;
        }

        if let Err(e) = self.driver.execute(SCROLL_TO_TOP).await {
            log::warn!("Failed to scroll back to top: {}", e);
        }

        rounds
    }

    async fn scroll_once(&self) -> Result<Option<u64>, DriverError> {
        let height = self.driver.execute(SCROLL_TO_BOTTOM).await?;
        Ok(height.as_u64())
    }
}
