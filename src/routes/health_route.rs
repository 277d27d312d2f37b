use actix_web::{HttpResponse, Responder};
use serde::Serialize;

use crate::domain::now_timestamp;

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthStatus {
        status: "healthy",
        timestamp: now_timestamp(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
