//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

use crate::http::request::{request_id, LoginRequest, RegisterRequest};
use crate::http::response::{ApiError, UserResponse};
use crate::http::server::AppState;
use crate::store::{StoreStatus, UserStore};

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::invalid_body(e).for_environment(state.environment))?;
    tracing::debug!(request_id = %request_id(&headers), email = %req.email, "Registration request");

    let user = state
        .store
        .create_user(&req.email, &req.password, &req.name)
        .await
        .map_err(|e| ApiError::from_store(e, state.environment))?;

    tracing::info!(request_id = %request_id(&headers), user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(user.profile()).with_message("Signup successful")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::invalid_body(e).for_environment(state.environment))?;

    let profile = state
        .store
        .authenticate(&req.email, &req.password)
        .await
        .map_err(|e| ApiError::from_store(e, state.environment))?
        .ok_or_else(ApiError::invalid_credentials)?;

    tracing::debug!(request_id = %request_id(&headers), user_id = %profile.id, "Login succeeded");
    Ok(Json(UserResponse::new(profile).with_message("Login successful")))
}

/// Session hydration: resolve a user id back to its profile.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_id(&id)
        .await
        .map_err(|e| ApiError::from_store(e, state.environment))?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(UserResponse::new(user.profile())))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: crate::config::Environment,
    pub uptime_secs: u64,
    pub primary_tier: Option<&'static str>,
    pub store: StoreStatus,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.store.status();
    let breaker_tripped = store
        .tiers
        .iter()
        .any(|t| matches!(t.breaker, Some(s) if s != "closed"));
    let degraded = store.pool.unhealthy > 0 || breaker_tripped;

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment,
        uptime_secs: state.started_at.elapsed().as_secs(),
        primary_tier: state.store.primary_tier(),
        store,
    })
}
