use actix_web::{get, web, HttpResponse};
use askama::Template;

use crate::configuration::ScraperSettings;

use super::ApiResponse;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    version: &'a str,
    target_domain: &'a str,
}

#[get("/")]
pub async fn default(settings: web::Data<ScraperSettings>) -> HttpResponse {
    let page = IndexTemplate {
        version: env!("CARGO_PKG_VERSION"),
        target_domain: &settings.target_domain,
    };

    match page.render() {
        Ok(body) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body),
        Err(e) => {
            log::error!("Failed to render index page: {:?}", e);
            HttpResponse::InternalServerError().json(ApiResponse::failure("Internal server error"))
        }
    }
}
