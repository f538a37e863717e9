pub mod auth;
pub mod axum_http;
pub mod config;
pub mod usecases;

use std::sync::Arc;

use anyhow::Result;
use crates::infra::db::postgres::postgres_connection;
use tracing::info;

pub async fn run() -> Result<()> {
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config::config_loader::load()?;
    info!(stage = %config::config_loader::get_stage(), "ENV has been loaded");

    let user_secret = config::config_loader::get_user_secret()?;

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    axum_http::http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        user_secret,
    )
    .await?;

    Ok(())
}
