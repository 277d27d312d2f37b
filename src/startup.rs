use std::{net::TcpListener, sync::Arc};

use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    configuration::ScraperSettings,
    routes::{default_route, envelope_error_handlers, health_route, scrape_route},
    services::SessionFactory,
};

pub fn run(
    listener: TcpListener,
    session_factory: Arc<dyn SessionFactory>,
    scraper_settings: ScraperSettings,
) -> Result<Server, std::io::Error> {
    let session_factory: Data<dyn SessionFactory> = Data::from(session_factory);
    let scraper_settings = web::Data::new(scraper_settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(envelope_error_handlers())
            .wrap(Logger::default())
            .service(default_route::default)
            .service(
                // Resources answer unmatched methods with 405 instead of falling through to 404.
                web::scope("/api")
                    .service(
                        web::resource("/scrape").route(web::post().to(scrape_route::scrape_menu)),
                    )
                    .service(
                        web::resource("/health").route(web::get().to(health_route::health_check)),
                    ),
            )
            .app_data(scrape_route::json_config())
            .app_data(session_factory.clone())
            .app_data(scraper_settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
