use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{account_error, not_signed_in};
use crate::{
    accounts::{AccountUpdate, Session},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub loading: bool,
    pub session: Option<Session>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route("/me/password", post(change_password))
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>) -> Json<MeResponse> {
    let current = state.session.state();
    Json(MeResponse {
        loading: current.loading(),
        session: current.session().cloned(),
    })
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<Session>, (StatusCode, String)> {
    state
        .session
        .update_account(&payload)
        .map_err(account_error)?
        .map(Json)
        .ok_or_else(not_signed_in)
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .session
        .change_password(&payload.current_password, &payload.new_password)
        .map_err(account_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_response_serialization() {
        let json = serde_json::to_string(&MeResponse {
            loading: true,
            session: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"loading":true,"session":null}"#);
    }
}
