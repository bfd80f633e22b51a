//! Scrape trigger and refresh status handlers under `/parsing`

use actix_web::{HttpResponse, web};
use serde_json::json;

use super::error::ApiError;
use crate::application::state::AppState;

/// `POST /parsing/force-update`: runs the whole pipeline and reports its summary.
///
/// A failed run is still a 200; the outcome is in `success` and `message`.
pub async fn force_update(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let summary = state.force_update().await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": summary.success,
        "message": summary.message,
        "timestamp": summary.finished_at,
        "summary": summary,
    })))
}

/// `GET /parsing/status`
pub async fn update_status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.update_status().await)
}

/// `POST /parsing/reset`
pub async fn reset_update(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let removed = state.reset_update().await?;
    let message = if removed {
        "Update date reset"
    } else {
        "No update recorded"
    };
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": message })))
}
