use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::item_parser::NameStrategy;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub scraper: ScraperSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub window_width: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub window_height: u32,
    pub user_agent: String,
    pub chrome_binary: Option<String>,
    pub extra_args: Vec<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub page_load_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            chrome_binary: None,
            extra_args: vec![],
            page_load_timeout_secs: 30,
        }
    }
}

impl BrowserSettings {
    /// Chrome command line arguments for a scraping session.
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            format!("--window-size={},{}", self.window_width, self.window_height),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-extensions".to_string(),
            "--disable-plugins".to_string(),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ScraperSettings {
    pub target_domain: String,
    pub title_brand: String,
    pub settle_delay_ms: u64,
    pub item_wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub scroll_rounds: u32,
    pub scroll_pause_ms: u64,
    pub scrape_timeout_secs: u64,
    pub max_elements: usize,
    pub max_items: usize,
    pub name_strategy: NameStrategy,
    pub boilerplate_prefixes: Vec<String>,
    pub selectors: SelectorSettings,
    pub images: ImageSettings,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            target_domain: "ubereats.com".to_string(),
            title_brand: "Uber Eats".to_string(),
            settle_delay_ms: 2_000,
            item_wait_timeout_secs: 10,
            poll_interval_ms: 500,
            scroll_rounds: 5,
            scroll_pause_ms: 2_000,
            scrape_timeout_secs: 180,
            max_elements: 100,
            max_items: 50,
            name_strategy: NameStrategy::FirstLine,
            boilerplate_prefixes: vec![
                "Popular".to_string(),
                "most liked".to_string(),
                "Plus small".to_string(),
            ],
            selectors: SelectorSettings::default(),
            images: ImageSettings::default(),
        }
    }
}

impl ScraperSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn item_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.item_wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SelectorSettings {
    pub restaurant_name: Vec<String>,
    pub menu_items: Vec<String>,
    pub fallback_items: Vec<String>,
    pub generic_items: String,
    pub generic_limit: usize,
    pub popup_close_css: Vec<String>,
    pub popup_close_xpath: Vec<String>,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            restaurant_name: vec![
                r#"h1[data-testid="store-title"]"#.to_string(),
                r#"h1[class*="title"]"#.to_string(),
                "h1".to_string(),
            ],
            menu_items: vec![r#"a[href*="item"]"#.to_string()],
            fallback_items: vec![
                "div[class*='menu']".to_string(),
                "article[class*='menu']".to_string(),
                "section[class*='menu']".to_string(),
            ],
            generic_items: "div, article, section".to_string(),
            generic_limit: 50,
            popup_close_css: vec![
                r#"button[aria-label="Close"]"#.to_string(),
                r#"button[aria-label="close"]"#.to_string(),
                r#"[data-testid="close-button"]"#.to_string(),
                r#"[role="dialog"] button[aria-label*="lose"]"#.to_string(),
            ],
            popup_close_xpath: vec![
                "//button[normalize-space()='Close' or normalize-space()='×' or normalize-space()='Not now' or normalize-space()='No thanks']".to_string(),
            ],
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ImageSettings {
    pub placeholder_patterns: Vec<String>,
    pub cdn_host: String,
    pub cdn_path_marker: String,
    pub extensions: Vec<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            placeholder_patterns: [
                "placeholder",
                "no-image",
                "default",
                "missing",
                "empty",
                "null",
                "undefined",
                "data:image",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            cdn_host: "tb-static.uber.com".to_string(),
            cdn_path_marker: "processed_images".to_string(),
            extensions: [".jpg", ".jpeg", ".png", ".webp", ".gif"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename)).required(false),
        )
        // E.g. `APP_APPLICATION__PORT=5002` sets `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
