//! HTTP error mapping
//!
//! Every failure leaves the API as `{"success": false, "detail": "..."}` with a status
//! code matching its cause.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::application::state::TriggerError;
use crate::domain::component::{ComponentKind, UnknownComponent};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown component type: {0}")]
    UnknownComponent(String),

    #[error("No {kind} found matching '{name}'")]
    NotFound { kind: ComponentKind, name: String },

    #[error("{0}")]
    Validation(String),

    #[error("{kind} '{name}' already exists")]
    Duplicate { kind: ComponentKind, name: String },

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<UnknownComponent> for ApiError {
    fn from(err: UnknownComponent) -> Self {
        ApiError::UnknownComponent(err.0)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownComponent(_) | ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Duplicate { .. } | ApiError::Trigger(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(e) = self {
            error!("Request failed: {:#}", e);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "detail": self.to_string(),
        }))
    }
}
