use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::{prelude::*, ChromiumLikeCapabilities};

use crate::{configuration::BrowserSettings, domain::ItemSnapshot};

use super::{DriverError, Locator, PageDriver, SessionFactory};

// WebDriver key code for Escape
const ESCAPE_KEY: &str = "\u{e00c}";

pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(settings: &BrowserSettings) -> Result<Self, DriverError> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in settings.chrome_args() {
            caps.add_arg(&arg)
                .map_err(|e| DriverError::Session(format!("Invalid chrome argument {}: {}", arg, e)))?;
        }
        if let Some(binary) = &settings.chrome_binary {
            caps.set_binary(binary)
                .map_err(|e| DriverError::Session(format!("Invalid chrome binary {}: {}", binary, e)))?;
        }

        let driver = WebDriver::new(settings.webdriver_url.as_str(), caps)
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?;

        let droid = Droid { driver };
        let configured = droid.configure_timeouts(settings).await;
        if let Err(e) = configured {
            log::error!("Failed to configure browser timeouts: {:?}", e);
            if let Err(quit_error) = droid.driver.quit().await {
                log::error!("Failed to quit half-initialised browser: {:?}", quit_error);
            }
            return Err(DriverError::Session(e.to_string()));
        }

        log::info!("WebDriver session started at {}", settings.webdriver_url);
        Ok(droid)
    }

    async fn configure_timeouts(&self, settings: &BrowserSettings) -> WebDriverResult<()> {
        self.driver
            .set_page_load_timeout(settings.page_load_timeout())
            .await?;
        // Waiting is done by explicit polling, never by the driver
        self.driver.set_implicit_wait_timeout(Duration::ZERO).await
    }

    fn by(locator: &Locator) -> By {
        match locator {
            Locator::Css(selector) => By::Css(selector.as_str()),
            Locator::XPath(expression) => By::XPath(expression.as_str()),
        }
    }
}

#[async_trait]
impl PageDriver for Droid {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.driver.title().await?)
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        Ok(self.driver.find_all(Self::by(locator)).await?.len())
    }

    async fn first_text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let elements = self.driver.find_all(Self::by(locator)).await?;
        match elements.first() {
            Some(element) => {
                let text = element.text().await?;
                let text = text.trim();
                Ok((!text.is_empty()).then(|| text.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn snapshots(
        &self,
        locator: &Locator,
        limit: usize,
    ) -> Result<Vec<Result<ItemSnapshot, DriverError>>, DriverError> {
        let elements = self.driver.find_all(Self::by(locator)).await?;

        let mut snapshots = Vec::with_capacity(elements.len().min(limit));
        for element in elements.into_iter().take(limit) {
            let snapshot = async {
                // Rendered text keeps inline runs together and leaves out hidden nodes
                let text = element.text().await?;
                let html = element.outer_html().await?;
                Ok::<_, DriverError>(ItemSnapshot::from_rendered(&text, &html))
            }
            .await;
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    async fn click_first_interactable(&self, locator: &Locator) -> Result<bool, DriverError> {
        for element in self.driver.find_all(Self::by(locator)).await? {
            let displayed = element.is_displayed().await.unwrap_or(false);
            let enabled = element.is_enabled().await.unwrap_or(false);
            if displayed && enabled {
                element.click().await?;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn press_escape(&self) -> Result<(), DriverError> {
        let body = self.driver.find(By::Tag("body")).await?;
        body.send_keys(ESCAPE_KEY).await?;
        Ok(())
    }

    async fn execute(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let ret = self
            .driver
            .execute(script, Vec::new())
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(ret.json().clone())
    }

    async fn quit(self: Box<Self>) -> Result<(), DriverError> {
        let Droid { driver } = *self;
        driver.quit().await?;
        log::info!("WebDriver closed");
        Ok(())
    }
}

/// Opens a fresh chrome session per scrape.
pub struct DroidFactory {
    settings: BrowserSettings,
}

impl DroidFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        DroidFactory { settings }
    }
}

#[async_trait]
impl SessionFactory for DroidFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let droid = Droid::new(&self.settings).await?;
        Ok(Box::new(droid))
    }
}
