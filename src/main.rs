use softverse::{app, session::SessionState, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "softverse=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;

    let mut sessions = state.session.subscribe();
    tokio::spawn(async move {
        while sessions.changed().await.is_ok() {
            match &*sessions.borrow_and_update() {
                SessionState::Initializing => {}
                SessionState::Anonymous => tracing::info!("signed out"),
                SessionState::Authenticated(s) => {
                    tracing::info!(user_id = %s.id, username = %s.username, "signed in")
                }
            }
        }
    });

    let bind = state.config.bind_address();
    app::serve(app::build_app(state), &bind).await
}
