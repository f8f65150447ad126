use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use vendorserver::api_router::configure_api_routes;
use vendorserver::bootstrap;
use vendorserver::config::AppConfig;
use vendorserver::shared::state::AppState;
use vendorserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config.database_url).context("Failed to create database pool")?;
    run_migrations(&pool).map_err(|e| anyhow!("Failed to run migrations: {}", e))?;
    bootstrap::ensure_seed_data(&pool)?;

    let state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = configure_api_routes(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .context("SERVER_HOST must be an IP address")?;
    let addr = SocketAddr::new(host, config.server.port);

    info!("Starting HTTP server on {}", addr);
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .context("HTTP server failed")?;

    Ok(())
}
