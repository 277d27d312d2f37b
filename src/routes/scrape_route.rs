use actix_web::{error::InternalError, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::{
    configuration::ScraperSettings,
    services::{scrape_with_session, SessionFactory},
};

use super::ApiResponse;

#[derive(Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UrlRejection {
    #[error("URL is required")]
    Missing,
    #[error("Please provide a valid Uber Eats URL")]
    WrongSite,
}

/// Trims the requested url and checks it belongs to the target site.
pub fn validate_scrape_url(url: Option<&str>, target_domain: &str) -> Result<String, UrlRejection> {
    let url = url.map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(UrlRejection::Missing);
    }
    if !url.contains(target_domain) {
        return Err(UrlRejection::WrongSite);
    }
    Ok(url.to_string())
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        log::warn!("Rejected scrape request body: {}", err);
        let response = HttpResponse::BadRequest().json(ApiResponse::failure("No JSON data provided"));
        InternalError::from_response(err, response).into()
    })
}

pub async fn scrape_menu(
    body: web::Json<ScrapeRequest>,
    factory: web::Data<dyn SessionFactory>,
    settings: web::Data<ScraperSettings>,
) -> HttpResponse {
    let url = match validate_scrape_url(body.url.as_deref(), &settings.target_domain) {
        Ok(url) => url,
        Err(rejection) => {
            return HttpResponse::BadRequest().json(ApiResponse::failure(rejection.to_string()))
        }
    };

    match scrape_with_session(factory.get_ref(), &url, &settings).await {
        Ok(result) => match result.error.clone() {
            Some(error) => HttpResponse::InternalServerError().json(ApiResponse::failure(error)),
            None => HttpResponse::Ok().json(ApiResponse::success(result)),
        },
        Err(e) => {
            log::error!("Error in scrape_menu: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::failure(format!("Internal server error: {}", e)))
        }
    }
}
