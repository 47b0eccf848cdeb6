use anyhow::Context;

mod app;
mod auth;
mod config;
mod error;
mod seed;
mod state;

use crate::{config::AppConfig, seed::seed_default_accounts, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accounts_backend=debug,axum=info,tower_http=info".to_string());
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

    // Missing DATABASE_URL or JWT_SECRET stops the process here.
    let config = AppConfig::from_env().context("load configuration")?;
    tracing::info!("configuration loaded");

    let (app_state, db) = AppState::init(config).await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    if app_state.config.seed_accounts.is_empty() {
        tracing::info!("no default accounts configured; skipping seeding");
    } else {
        seed_default_accounts(app_state.users.as_ref(), &app_state.config.seed_accounts).await;
    }

    let config = app_state.config.clone();
    app::serve(app::build_app(app_state), &config).await
}
