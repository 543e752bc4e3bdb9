use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use casting_service::app_state::AppState;
use casting_service::auth::{build_authorizer, spawn_jwks_refresh};
use casting_service::config::ServiceConfig;
use casting_service::store::CastingStore;
use casting_service::{app, SERVICE_NAME};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let auth = build_authorizer(&config)?;
    if let Some(cache) = auth.jwks_cache.clone() {
        spawn_jwks_refresh(cache, config.jwks_refresh_interval);
    }
    info!(audience = %config.audience, "JWT verifier initialised");

    let state = AppState::new(Arc::new(CastingStore::new()), auth.authorizer);

    let ip: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("HOST '{}' is not an IP address", config.host))?;
    let addr = SocketAddr::from((ip, config.port));

    info!(%addr, "starting {SERVICE_NAME}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
