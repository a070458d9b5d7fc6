mod app;
mod config;
mod routes;
mod state;
mod storage;
mod users;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userform=debug,axum=info,tower_http=info".to_string());
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

    let app_state = match AppState::init().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = ?e, "failed to start server");
            return Err(e);
        }
    };

    let users = app_state.users.count().await?;
    tracing::info!(
        users,
        data_dir = %app_state.config.data_dir.display(),
        static_dir = %app_state.config.static_dir.display(),
        "user store ready"
    );

    app::serve(app_state).await
}
