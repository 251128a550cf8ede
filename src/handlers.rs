// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the recovery email guard.
//!
//! `/check` is a dry run for other services. The `/users` routes change the
//! stored recovery email of a user.

use crate::config::Config;
use crate::error::GuardError;
use crate::metrics::Metrics;
use crate::recovery::RecoveryEmailService;
use crate::rules::{UserContext, ValidationResult};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub service: RecoveryEmailService,
    pub metrics: Arc<Metrics>,
    pub config: Config,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Dry-run validation request.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub email: String,
    #[serde(flatten)]
    pub context: UserContext,
}

/// Dry-run validation response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// New recovery email for a user. An empty `email` removes it.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub email: String,
}

/// Recovery email state after a change.
#[derive(Debug, Serialize)]
pub struct RecoveryEmailResponse {
    pub recovery_email: Option<String>,
    pub unverified_recovery_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check))
        .route("/users/:user_id/recovery-email", put(submit_recovery_email))
        .route(
            "/users/:user_id/recovery-email/verify",
            post(verify_recovery_email),
        );

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "recovery-email-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Validate a candidate without storing anything.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Response {
    debug!(user_id = %req.context.user_id, "Processing recovery email check");

    match state.service.pipeline().validate(&req.email, &req.context).await {
        Ok(ValidationResult::Valid) => Json(CheckResponse {
            allowed: true,
            code: None,
            reason: None,
        })
        .into_response(),
        Ok(ValidationResult::Rejected(rejection)) => Json(CheckResponse {
            allowed: false,
            code: Some(rejection.code()),
            reason: Some(rejection.to_string()),
        })
        .into_response(),
        Err(err) => error_response(&state, err),
    }
}

/// Submit a new recovery email for a user.
pub async fn submit_recovery_email(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    let result = match state.service.submit(&user_id, &req.email).await {
        Ok(result) => result,
        Err(err) => return error_response(&state, err),
    };

    if let ValidationResult::Rejected(rejection) = result {
        info!(%user_id, code = rejection.code(), "Recovery email rejected");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: rejection.to_string(),
                code: rejection.code(),
                retry_after_secs: None,
            }),
        )
            .into_response();
    }

    match recovery_state(&state, &user_id).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(&state, err),
    }
}

/// Confirm the pending recovery email of a user.
pub async fn verify_recovery_email(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Response {
    match state.service.make_recovery_email_verified(&user_id).await {
        Ok(verified) => Json(VerifyResponse { verified }).into_response(),
        Err(err) => error_response(&state, err.into()),
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn recovery_state(
    state: &AppState,
    user_id: &str,
) -> Result<RecoveryEmailResponse, GuardError> {
    Ok(RecoveryEmailResponse {
        recovery_email: state.service.recovery_email(user_id).await?,
        unverified_recovery_email: state.service.unverified_recovery_email(user_id).await?,
    })
}

fn error_response(state: &AppState, err: GuardError) -> Response {
    let (status, code, retry_after) = match &err {
        GuardError::RateLimited { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            Some(ceil_secs(state.config.rate_limit.window_duration())),
        ),
        GuardError::TooManyAttempts { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            "TOO_MANY_ATTEMPTS",
            Some(ceil_secs(*retry_after)),
        ),
        GuardError::VerificationUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "VERIFICATION_UNAVAILABLE",
            None,
        ),
        GuardError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", None),
    };

    if status.is_server_error() {
        error!(error = %err, code, "Request failed");
    } else {
        warn!(error = %err, code, "Request refused");
    }

    let body = Json(ErrorResponse {
        error: err.to_string(),
        code,
        retry_after_secs: retry_after,
    });

    match retry_after {
        Some(secs) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
        None => (status, body).into_response(),
    }
}

/// Whole seconds, rounded up.
fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
