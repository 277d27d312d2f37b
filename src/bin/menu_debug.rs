//! Command line companion to the HTTP API for checking what a page yields.

use std::{collections::HashSet, path::PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use menu_scraper::{
    configuration::{get_configuration, BrowserSettings, ScraperSettings},
    domain::RestaurantResult,
    services::{
        scrape_with_session, DroidFactory, Locator, PageDriver, PageLoader, SessionFactory,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Full report, also saved as JSON
    Report,
    /// Numbered list of extracted items
    Items,
    /// First line of every matched element, no parsing
    Names,
}

#[derive(Parser)]
#[command(name = "menu-debug")]
#[command(about = "Scrape one restaurant page and print what was found")]
#[command(version)]
struct Cli {
    /// Restaurant page url
    url: String,

    #[arg(short, long, value_enum, default_value_t = Mode::Report)]
    mode: Mode,

    /// Where `report` mode writes its JSON
    #[arg(short, long, default_value = "scraping_results.json")]
    output: PathBuf,

    /// Overrides the configured WebDriver endpoint
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Scrape even if the url is not on the target site
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let (mut browser, scraper) = match get_configuration() {
        Ok(settings) => (settings.browser, settings.scraper),
        Err(e) => {
            log::warn!("Using default settings, configuration not loaded: {}", e);
            (BrowserSettings::default(), ScraperSettings::default())
        }
    };
    if let Some(url) = cli.webdriver_url.clone() {
        browser.webdriver_url = url;
    }

    if !cli.url.contains(&scraper.target_domain) {
        if !cli.force {
            bail!(
                "{} does not look like a {} url, pass --force to scrape it anyway",
                cli.url,
                scraper.target_domain
            );
        }
        log::warn!("Scraping {} outside of {}", cli.url, scraper.target_domain);
    }

    let factory = DroidFactory::new(browser);

    match cli.mode {
        Mode::Report => {
            let result = scrape_with_session(&factory, &cli.url, &scraper).await?;
            print_report(&result);
            if result.error.is_none() {
                let json = serde_json::to_string_pretty(&result)?;
                std::fs::write(&cli.output, json)
                    .with_context(|| format!("Failed to write {}", cli.output.display()))?;
                println!("\nResults saved to: {}", cli.output.display());
            }
        }
        Mode::Items => {
            let result = scrape_with_session(&factory, &cli.url, &scraper).await?;
            print_items(&result);
        }
        Mode::Names => {
            let driver = factory.open().await?;
            let names = element_first_lines(driver.as_ref(), &cli.url, &scraper).await;
            if let Err(e) = driver.quit().await {
                log::error!("Failed to close browser session: {}", e);
            }
            print_names(&names?);
        }
    }

    Ok(())
}

fn print_report(result: &RestaurantResult) {
    println!("{}", "=".repeat(60));
    println!("Restaurant: {}", result.restaurant_name);
    println!("URL: {}", result.url);
    println!("Scraped at: {}", result.scraped_at.as_deref().unwrap_or("N/A"));
    println!("Total items: {}", result.menu_items.len());
    println!("{}", "=".repeat(60));

    if let Some(error) = &result.error {
        println!("Error: {}", error);
        return;
    }

    if result.menu_items.is_empty() {
        println!("No menu items found. The page layout may have changed, the restaurant may");
        println!("have no menu, the page may not have loaded, or the scraper was blocked.");
        return;
    }

    for (i, item) in result.menu_items.iter().enumerate() {
        println!("\n{}. {}", i + 1, item.name);
        if !item.description.is_empty() {
            println!("   description: {}", item.description);
        }
        if !item.price.is_empty() {
            println!("   price: {}", item.price);
        }
        match (item.has_image, item.image_valid) {
            (true, true) => println!("   image: valid {}", truncate(&item.image_url, 50)),
            (true, false) => println!("   image: placeholder {}", truncate(&item.image_url, 50)),
            (false, _) => println!("   image: none"),
        }
    }

    let with_images = result.menu_items.iter().filter(|i| i.has_image).count();
    let valid_images = result.menu_items.iter().filter(|i| i.image_valid).count();
    println!("\nSummary:");
    println!("   items with images: {}", with_images);
    println!("   items without images: {}", result.menu_items.len() - with_images);
    println!("   valid images: {}", valid_images);
    println!(
        "   invalid or missing images: {}",
        result.menu_items.len() - valid_images
    );
}

fn print_items(result: &RestaurantResult) {
    if let Some(error) = &result.error {
        println!("Error: {}", error);
        return;
    }

    println!("Total items extracted: {}", result.menu_items.len());
    println!("{}", "=".repeat(60));
    for (i, item) in result.menu_items.iter().enumerate() {
        println!("{:3}. {}", i + 1, item.name);
        if !item.price.is_empty() {
            println!("     {}", item.price);
        }
        if !item.description.is_empty() {
            println!("     {}", truncate(&item.description, 80));
        }
        println!();
    }
    println!("{}", "=".repeat(60));
}

fn print_names(names: &[String]) {
    println!("Found {} elements", names.len());
    println!("{}", "=".repeat(50));
    for (i, name) in names.iter().enumerate() {
        println!("{:3}. {}", i + 1, name);
    }
    println!("{}", "=".repeat(50));
    let unique: HashSet<&String> = names.iter().collect();
    println!("Total unique names: {}", unique.len());
}

/// First line of each item element after popups and lazy loading are handled.
async fn element_first_lines(
    driver: &dyn PageDriver,
    url: &str,
    settings: &ScraperSettings,
) -> anyhow::Result<Vec<String>> {
    driver.goto(url).await?;
    let loader = PageLoader::new(driver, settings);
    loader.dismiss_popups().await;
    loader.scroll_to_load().await;

    let Some(selector) = settings.selectors.menu_items.first() else {
        bail!("No menu item selector configured");
    };
    let snapshots = driver
        .snapshots(&Locator::css(selector), settings.max_elements)
        .await?;

    let names = snapshots
        .into_iter()
        .filter_map(|snapshot| match snapshot {
            Ok(snapshot) => snapshot
                .text
                .lines()
                .next()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('$'))
                .map(|line| line.to_string()),
            Err(e) => Some(format!("[error extracting: {}]", e)),
        })
        .collect();

    Ok(names)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
