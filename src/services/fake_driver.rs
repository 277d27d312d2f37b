//! In-memory `PageDriver` used by the orchestration tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::domain::ItemSnapshot;

use super::{DriverError, Locator, PageDriver, SessionFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Goto,
    Title,
    Name,
    Items,
    Popup,
    Escape,
    Count,
    Script,
    Quit,
}

#[derive(Default)]
pub struct FakeDriver {
    failing: HashSet<Stage>,
    hang_on_goto: bool,
    title: String,
    texts: HashMap<String, String>,
    clickable: HashSet<String>,
    items: HashMap<String, Vec<Option<ItemSnapshot>>>,
    hidden_polls: usize,
    polls: AtomicUsize,
    scroll_heights: Mutex<VecDeque<u64>>,
    scripts: Mutex<Vec<String>>,
    visited: Mutex<Vec<String>>,
    escapes: AtomicUsize,
    quits: Arc<AtomicUsize>,
}

fn key(locator: &Locator) -> &str {
    match locator {
        Locator::Css(selector) => selector,
        Locator::XPath(expression) => expression,
    }
}

fn fail(stage: Stage) -> DriverError {
    DriverError::Script(format!("fake driver failure at {:?}", stage))
}

impl FakeDriver {
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.failing.insert(stage);
        self
    }

    pub fn hanging_on_goto(mut self) -> Self {
        self.hang_on_goto = true;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_clickable(mut self, selector: &str) -> Self {
        self.clickable.insert(selector.to_string());
        self
    }

    pub fn with_items(mut self, selector: &str, items: Vec<(&str, Option<&str>)>) -> Self {
        let snapshots = items
            .into_iter()
            .map(|(text, image)| Some(ItemSnapshot::new(text, image.map(|i| i.to_string()))));
        self.items
            .entry(selector.to_string())
            .or_default()
            .extend(snapshots);
        self
    }

    /// Adds an element that fails when read.
    pub fn with_broken_item(mut self, selector: &str) -> Self {
        self.items.entry(selector.to_string()).or_default().push(None);
        self
    }

    pub fn items_visible_after_polls(mut self, polls: usize) -> Self {
        self.hidden_polls = polls;
        self
    }

    pub fn with_scroll_heights(self, heights: Vec<u64>) -> Self {
        *self.scroll_heights.lock().unwrap() = heights.into();
        self
    }

    pub fn quit_counter(&self) -> Arc<AtomicUsize> {
        self.quits.clone()
    }

    pub fn escapes(&self) -> usize {
        self.escapes.load(Ordering::SeqCst)
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    fn check(&self, stage: Stage) -> Result<(), DriverError> {
        match self.failing.contains(&stage) {
            true => Err(fail(stage)),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        if self.hang_on_goto {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        if self.failing.contains(&Stage::Goto) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.check(Stage::Title)?;
        Ok(self.title.clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        self.check(Stage::Count)?;
        let polls = self.polls.fetch_add(1, Ordering::SeqCst);
        if polls < self.hidden_polls {
            return Ok(0);
        }
        Ok(self.items.get(key(locator)).map_or(0, Vec::len))
    }

    async fn first_text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        self.check(Stage::Name)?;
        Ok(self
            .texts
            .get(key(locator))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }

    async fn snapshots(
        &self,
        locator: &Locator,
        limit: usize,
    ) -> Result<Vec<Result<ItemSnapshot, DriverError>>, DriverError> {
        self.check(Stage::Items)?;
        Ok(self
            .items
            .get(key(locator))
            .map(|items| {
                items
                    .iter()
                    .take(limit)
                    .map(|item| item.clone().ok_or_else(|| fail(Stage::Items)))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn click_first_interactable(&self, locator: &Locator) -> Result<bool, DriverError> {
        self.check(Stage::Popup)?;
        Ok(self.clickable.contains(key(locator)))
    }

    async fn press_escape(&self) -> Result<(), DriverError> {
        self.check(Stage::Escape)?;
        self.escapes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.check(Stage::Script)?;
        self.scripts.lock().unwrap().push(script.to_string());
        if script.contains("scrollHeight") {
            let mut heights = self.scroll_heights.lock().unwrap();
            let height = match heights.len() {
                0 => None,
                1 => heights.front().copied(),
                _ => heights.pop_front(),
            };
            return Ok(height.map_or(serde_json::Value::Null, serde_json::Value::from));
        }
        Ok(serde_json::Value::Null)
    }

    async fn quit(self: Box<Self>) -> Result<(), DriverError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        self.check(Stage::Quit)
    }
}

/// Hands out a single prepared `FakeDriver`.
#[derive(Default)]
pub struct FakeFactory {
    driver: Mutex<Option<FakeDriver>>,
    opens: AtomicUsize,
}

impl FakeFactory {
    pub fn new(driver: FakeDriver) -> Self {
        FakeFactory {
            driver: Mutex::new(Some(driver)),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.driver.lock().unwrap().take() {
            Some(driver) => Ok(Box::new(driver)),
            None => Err(DriverError::Session(
                "session not created: chrome not reachable".to_string(),
            )),
        }
    }
}
