mod app;
mod auth;
mod config;
mod error;
mod plans;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tiffin=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;
    tracing::info!(
        half_price = app_state.config.pricing.half,
        full_price = app_state.config.pricing.full,
        utc_offset = %app_state.config.week.utc_offset,
        "pricing and week configuration loaded"
    );

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    app::serve(app::build_app(app_state)).await
}
