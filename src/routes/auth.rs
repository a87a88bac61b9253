use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use tracing::instrument;

use super::account_error;
use crate::{accounts::Session, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Session>), (StatusCode, String)> {
    let session = state
        .session
        .register(&payload.email, &payload.username, &payload.password)
        .map_err(account_error)?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>, (StatusCode, String)> {
    let session = state
        .session
        .login(&payload.email, &payload.password)
        .map_err(account_error)?;
    Ok(Json(session))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> Result<StatusCode, (StatusCode, String)> {
    state.session.logout().map_err(account_error)?;
    Ok(StatusCode::NO_CONTENT)
}
