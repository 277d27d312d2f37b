use actix_web::{
    body::EitherBody,
    dev::ServiceResponse,
    http::header::{self, HeaderValue},
    middleware::{ErrorHandlerResponse, ErrorHandlers},
    HttpResponse,
};
use serde::Serialize;

use crate::domain::now_timestamp;

/// Envelope shared by every JSON response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: now_timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: now_timestamp(),
        }
    }
}

/// Rewrites bare 404/405/500 responses into the JSON envelope.
pub fn envelope_error_handlers<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(actix_web::http::StatusCode::NOT_FOUND, |res| {
            wrap_in_envelope(res, |_| "Endpoint not found".to_string())
        })
        .handler(actix_web::http::StatusCode::METHOD_NOT_ALLOWED, |res| {
            wrap_in_envelope(res, |_| "Method not allowed".to_string())
        })
        .handler(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, |res| {
            wrap_in_envelope(res, |res| {
                if let Some(e) = res.response().error() {
                    log::error!("Internal server error: {}", e);
                }
                "Internal server error".to_string()
            })
        })
}

fn wrap_in_envelope<B>(
    res: ServiceResponse<B>,
    message: impl FnOnce(&ServiceResponse<B>) -> String,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let json = HeaderValue::from_static("application/json");
    if res.response().headers().get(header::CONTENT_TYPE) == Some(&json) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let message = message(&res);
    let status = res.status();
    let (req, _) = res.into_parts();
    let response = HttpResponse::build(status).json(ApiResponse::failure(message));
    let res: ServiceResponse<EitherBody<B>> =
        ServiceResponse::new(req, response).map_into_right_body();

    Ok(ErrorHandlerResponse::Response(res))
}
