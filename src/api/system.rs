//! Root and health endpoints

use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::warn;

use crate::application::state::AppState;

pub const API_NAME: &str = "PC Components API";

/// `GET /`
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": API_NAME }))
}

/// `GET /health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.repository.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "healthy", "database": "connected" })),
        Err(e) => {
            warn!("Health check failed: {:#}", e);
            HttpResponse::ServiceUnavailable().json(json!({ "status": "unhealthy", "database": "disconnected" }))
        }
    }
}
