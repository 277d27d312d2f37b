use std::{net::TcpListener, sync::Arc};

use env_logger::Env;
use menu_scraper::{configuration::get_configuration, services::DroidFactory, startup::run};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    log::info!("Starting menu scraper on http://{}", address);
    log::info!("WebDriver endpoint: {}", configuration.browser.webdriver_url);

    let session_factory = Arc::new(DroidFactory::new(configuration.browser));

    run(listener, session_factory, configuration.scraper)?.await
}
