use anyhow::Context;
use puzzle_bff::{build_router, AppConfig, AppState, ConfigLoader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "puzzle_bff=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    init_tracing(&config);

    info!(
        mode = ?config.stores.mode,
        bind_address = %config.bind_address,
        "Starting puzzle BFF"
    );

    let app_state = AppState::from_config(&config).context("Failed to build backend clients")?;
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Server running on http://{}", config.bind_address);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
