use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{error, instrument};

use super::{account_error, not_signed_in};
use crate::{
    accounts::{NewProject, Project},
    cards::Card,
    state::AppState,
};

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(add_project))
        .route("/projects/cards", get(project_cards))
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    let session = state.session.current().ok_or_else(not_signed_in)?;
    Ok(Json(session.projects))
}

#[instrument(skip(state))]
pub async fn project_cards(
    State(state): State<AppState>,
) -> Result<Json<Vec<Card>>, (StatusCode, String)> {
    let session = state.session.current().ok_or_else(not_signed_in)?;
    Ok(Json(session.projects.iter().map(Card::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn add_project(
    State(state): State<AppState>,
    Json(payload): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), (StatusCode, String)> {
    let session = state
        .session
        .add_project(payload)
        .map_err(account_error)?
        .ok_or_else(not_signed_in)?;
    let Some(project) = session.projects.last().cloned() else {
        error!(user_id = %session.id, "project list empty after append");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".into(),
        ));
    };
    Ok((StatusCode::CREATED, Json(project)))
}
