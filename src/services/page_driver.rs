use std::fmt;

use async_trait::async_trait;
use thirtyfour::error::WebDriverError;

use crate::domain::ItemSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css:{}", selector),
            Locator::XPath(expression) => write!(f, "xpath:{}", expression),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Failed to start browser session: {0}")]
    Session(String),

    #[error("Failed to navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Script execution failed: {0}")]
    Script(String),

    #[error(transparent)]
    WebDriver(#[from] WebDriverError),
}

/// One controlled browser session.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError>;

    /// Trimmed text of the first match, `None` when nothing matches.
    async fn first_text(&self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// Snapshots of up to `limit` matches. A failure reading one element
    /// does not fail the others.
    async fn snapshots(
        &self,
        locator: &Locator,
        limit: usize,
    ) -> Result<Vec<Result<ItemSnapshot, DriverError>>, DriverError>;

    /// Clicks the first displayed and enabled match. Returns whether a click happened.
    async fn click_first_interactable(&self, locator: &Locator) -> Result<bool, DriverError>;

    async fn press_escape(&self) -> Result<(), DriverError>;

    async fn execute(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    async fn quit(self: Box<Self>) -> Result<(), DriverError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError>;
}
