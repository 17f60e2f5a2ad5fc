//! Binary entrypoint for the critic HTTP server.
//!
//! Configuration comes from `CRITIC_*` environment variables; see
//! [`ServerConfig::from_env`].

use critic_server::config::ServerConfig;
use critic_server::router::build_router;
use critic_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let port = config.port;
    tracing::info!(
        db = %config.db_path,
        auth = %config.auth_type,
        visibility = %config.account_visibility,
        "loaded configuration"
    );

    let state = AppState::new(config)?;
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("critic server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
