//! HTTP API for the sight-words settings record.
//!
//! `GET /api/sight-words` fetches the record for the fixed user,
//! `POST /api/sight-words` replaces it (creating it on first write).

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::settings::store::SettingsStore;
use crate::settings::validate::{validate_update, FieldErrors};
use crate::settings::{NewSightWords, DEFAULT_USER_ID};

pub const SETTINGS_PATH: &str = "/api/sight-words";

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn SettingsStore>,
}

#[derive(Serialize)]
struct ErrorBody {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

#[derive(Debug)]
enum ApiError {
    NotFound,
    Invalid(FieldErrors),
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    message: "Sight words configuration not found",
                    errors: None,
                },
            ),
            ApiError::Invalid(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: "Invalid data provided",
                    errors: Some(errors),
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    message,
                    errors: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(SETTINGS_PATH, get(handle_get).post(handle_replace))
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve(state: ApiState, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Settings API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutting down settings API");
        })
        .await
}

// --- Handlers ---

async fn handle_get(State(state): State<ApiState>) -> Result<Response, ApiError> {
    match state.store.get(DEFAULT_USER_ID) {
        Ok(Some(record)) => Ok(Json(record).into_response()),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            error!("Error fetching sight words: {e}");
            Err(ApiError::Internal("Failed to fetch sight words"))
        }
    }
}

async fn handle_replace(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!("Rejected settings body: {rejection}");
            return Err(ApiError::Invalid(FieldErrors::form(rejection.body_text())));
        }
    };

    let update = validate_update(&body).map_err(|errors| {
        warn!("Invalid settings payload: {} field(s)", errors.fields.len());
        ApiError::Invalid(errors)
    })?;

    let failed = |e: crate::errors::StoreError| {
        error!("Error updating sight words: {e}");
        ApiError::Internal("Failed to update sight words")
    };

    if state.store.get(DEFAULT_USER_ID).map_err(failed)?.is_some() {
        let updated = state
            .store
            .update(DEFAULT_USER_ID, &update)
            .map_err(failed)?
            .ok_or_else(|| {
                error!("Settings record vanished during update");
                ApiError::Internal("Failed to update sight words")
            })?;
        info!("Replaced settings ({} words)", updated.words.len());
        Ok(Json(updated).into_response())
    } else {
        let created = state
            .store
            .create(NewSightWords::for_user(DEFAULT_USER_ID, update))
            .map_err(failed)?;
        info!("Created settings ({} words)", created.words.len());
        Ok((StatusCode::CREATED, Json(created)).into_response())
    }
}
