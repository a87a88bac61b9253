use axum::{http::StatusCode, Router};
use tracing::error;

use crate::accounts::AccountError;
use crate::providers::ProviderError;
use crate::state::AppState;

pub mod auth;
pub mod me;
pub mod projects;
pub mod tools;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::auth_routes())
        .merge(me::me_routes())
        .merge(projects::project_routes())
        .merge(tools::tool_routes())
}

pub(crate) fn account_error(e: AccountError) -> (StatusCode, String) {
    let status = match &e {
        AccountError::DuplicateEmail => StatusCode::CONFLICT,
        AccountError::InvalidCredentials | AccountError::NotAuthenticated => {
            StatusCode::UNAUTHORIZED
        }
        AccountError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => {
            error!(error = %e, "account store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.client_message())
}

pub(crate) fn provider_error(e: ProviderError) -> (StatusCode, String) {
    error!(error = %e, "provider failure");
    (
        StatusCode::BAD_GATEWAY,
        "Upstream service unavailable".into(),
    )
}

pub(crate) fn not_signed_in() -> (StatusCode, String) {
    account_error(AccountError::NotAuthenticated)
}
