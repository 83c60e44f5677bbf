use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{AppState, routes};
use services::services::{profile_sync::ProfileSync, settings::ProfileSettings};
use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_DATABASE_URL: &str = "sqlite://profile-sync.db";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let settings = ProfileSettings::from_env().context("invalid profile sync settings")?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = DBService::new(&database_url)
        .await
        .with_context(|| format!("failed to open database at {database_url}"))?;

    let sync = ProfileSync::new(Arc::new(settings), db)?;
    let app = routes::router(AppState::new(sync));

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    tracing::info!("profile sync listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
