//! # HTTP API
//!
//! JSON façade over [`LanguageChangeCoordinator`]:
//!
//! - `GET  /api/user/:id` — profile with the active language
//! - `POST /api/request-language-change` — switch directly or issue an OTP
//! - `POST /api/verify-language-otp` — confirm a pending switch
//! - `GET  /api/languages` — selectable languages and their channels
//! - `GET  /health` — liveness
//!
//! Handlers only validate the payload shape and translate outcomes; all state
//! transitions live in the coordinator.

use crate::coordinator::{ChangeError, ChangeOutcome, LanguageChangeCoordinator};
use crate::language::{Channel, LanguageRegistry};
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<LanguageChangeCoordinator>,
    /// Echo the issued code back in the request-change response. Demo only.
    pub expose_otp: bool,
}

impl AppState {
    pub fn new(coordinator: Arc<LanguageChangeCoordinator>) -> Self {
        Self {
            coordinator,
            expose_otp: false,
        }
    }

    pub fn with_exposed_otp(mut self, expose: bool) -> Self {
        self.expose_otp = expose;
        self
    }
}

// ==================== Payloads ====================

/// Request fields are taken as raw JSON so a present but non-string value
/// can be told apart from a missing one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageChangeRequest {
    #[serde(default)]
    pub user_id: Value,
    #[serde(default)]
    pub new_language: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub user_id: Value,
    #[serde(default)]
    pub otp: Value,
}

/// A request field, classified.
#[derive(Debug, PartialEq, Eq)]
enum Field {
    /// Absent, `null`, `""`, `false` or `0`.
    Missing,
    Text(String),
    /// Present, but not a string. Never equal to any stored value.
    Other,
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Field::Missing,
            Value::String(s) if s.is_empty() => Field::Missing,
            Value::String(s) => Field::Text(s),
            Value::Number(n) if n.as_f64() == Some(0.0) => Field::Missing,
            _ => Field::Other,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub preferred_language: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageChangeResponse {
    pub requires_otp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub preferred_language: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
    pub native_name: String,
    /// `None` when switching to this language needs no verification.
    pub channel: Option<Channel>,
}

// ==================== Errors ====================

/// Error returned by handlers, rendered as a JSON body.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 400 `{message}`
    #[error("{0}")]
    BadRequest(String),

    /// 400 `{success: false, message}`; verification refused.
    #[error("{0}")]
    Rejected(String),

    /// 404 `{message}`
    #[error("{0}")]
    NotFound(String),

    /// 500 `{message}`; details are logged, not returned.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Re-tag client errors as failed verifications.
    fn into_rejection(self) -> Self {
        match self {
            ApiError::BadRequest(message) => ApiError::Rejected(message),
            other => other,
        }
    }
}

impl From<ChangeError> for ApiError {
    fn from(err: ChangeError) -> Self {
        let message = err.to_string();
        match err {
            ChangeError::NotFound(_) => ApiError::NotFound(message),
            ChangeError::Storage(source) => {
                error!("Storage failure: {:#}", source);
                ApiError::Internal
            }
            ChangeError::InvalidArgument(_)
            | ChangeError::NoPendingChallenge
            | ChangeError::Expired
            | ChangeError::CodeMismatch => ApiError::BadRequest(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "message": message }),
            ),
            ApiError::Rejected(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "success": false, "message": message }),
            ),
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "message": message }),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "message": message }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

// ==================== Router ====================

/// Routes without cross-origin or tracing layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/languages", get(list_languages))
        .route("/api/user/:id", get(get_user))
        .route("/api/request-language-change", post(request_language_change))
        .route("/api/verify-language-otp", post(verify_language_otp))
        .with_state(state)
}

/// Full application: routes plus CORS for `allowed_origins` and request tracing.
pub fn app(state: AppState, allowed_origins: &[String]) -> Result<Router> {
    Ok(router(state)
        .layer(cors_layer(allowed_origins)?)
        .layer(TraceLayer::new_for_http()))
}

/// CORS restricted to an explicit origin list, with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid allowed origin '{}'", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

// ==================== Handlers ====================

async fn health() -> &'static str {
    "OK"
}

async fn list_languages(State(state): State<AppState>) -> Json<Vec<LanguageEntry>> {
    let resolver = state.coordinator.resolver();
    let entries = LanguageRegistry::get()
        .list_all()
        .iter()
        .map(|lang| LanguageEntry {
            code: lang.code.to_string(),
            name: lang.name.to_string(),
            native_name: lang.native_name.to_string(),
            channel: resolver.resolve(lang.code),
        })
        .collect();
    Json(entries)
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.coordinator.profile(&id).await?;
    Ok(Json(ProfileResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        mobile: user.mobile,
        preferred_language: user.preferred_language,
    }))
}

async fn request_language_change(
    State(state): State<AppState>,
    payload: Result<Json<LanguageChangeRequest>, JsonRejection>,
) -> Result<Json<LanguageChangeResponse>, ApiError> {
    const MISSING: &str = "userId and newLanguage are required";

    let Json(request) = payload.map_err(|_| ApiError::BadRequest(MISSING.to_string()))?;
    let (user_id, new_language) = match (
        Field::from(request.user_id),
        Field::from(request.new_language),
    ) {
        (Field::Missing, _) | (_, Field::Missing) => {
            return Err(ApiError::BadRequest(MISSING.to_string()))
        }
        (Field::Other, _) => return Err(ChangeError::NotFound(String::new()).into()),
        (Field::Text(user_id), Field::Other) => {
            state.coordinator.profile(&user_id).await?;
            return Err(ApiError::BadRequest(
                "newLanguage must be a language code".to_string(),
            ));
        }
        (Field::Text(user_id), Field::Text(new_language)) => (user_id, new_language),
    };

    let outcome = state
        .coordinator
        .request_change(&user_id, &new_language)
        .await?;

    let response = match outcome {
        ChangeOutcome::Unchanged { preferred_language }
        | ChangeOutcome::Applied { preferred_language } => LanguageChangeResponse {
            requires_otp: false,
            preferred_language: Some(preferred_language),
            channel: None,
            message: None,
            otp: None,
        },
        ChangeOutcome::ChallengeIssued { channel, code, .. } => LanguageChangeResponse {
            requires_otp: true,
            preferred_language: None,
            channel: Some(channel),
            message: Some(format!("OTP sent via {}", channel)),
            otp: state.expose_otp.then_some(code),
        },
    };

    Ok(Json(response))
}

async fn verify_language_otp(
    State(state): State<AppState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    const MISSING: &str = "userId and otp are required";

    let Json(request) = payload.map_err(|_| ApiError::Rejected(MISSING.to_string()))?;
    let (user_id, otp) = match (Field::from(request.user_id), Field::from(request.otp)) {
        (Field::Missing, _) | (_, Field::Missing) => {
            return Err(ApiError::Rejected(MISSING.to_string()))
        }
        (Field::Other, _) => return Err(ChangeError::NotFound(String::new()).into()),
        (Field::Text(user_id), Field::Other) => {
            state.coordinator.profile(&user_id).await?;
            return Err(ApiError::from(ChangeError::CodeMismatch).into_rejection());
        }
        (Field::Text(user_id), Field::Text(otp)) => (user_id, otp),
    };

    let verified = state
        .coordinator
        .verify_change(&user_id, &otp)
        .await
        .map_err(|e| ApiError::from(e).into_rejection())?;

    Ok(Json(VerifyOtpResponse {
        success: true,
        preferred_language: verified.preferred_language,
        message: "Language changed successfully".to_string(),
    }))
}
