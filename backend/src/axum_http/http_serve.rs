use crate::{
    axum_http::{default_routers, routers},
    config::config_model::{DotEnvyConfig, UserSecret},
};
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    infra::db::postgres::postgres_connection::PgPoolSquad, payments::mpesa_client::MpesaClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(
    config: Arc<DotEnvyConfig>,
    db_pool: Arc<PgPoolSquad>,
    user_secret: UserSecret,
) -> Result<()> {
    let mpesa_client = Arc::new(MpesaClient::new(
        config.mpesa.base_url.clone(),
        config.mpesa.consumer_key.clone(),
        config.mpesa.consumer_secret.clone(),
        config.mpesa.business_short_code.clone(),
        config.mpesa.passkey.clone(),
        config.mpesa.callback_url.clone(),
    ));

    let client_origin = config
        .client
        .origin
        .parse::<HeaderValue>()
        .context("CLIENT_URL is not a valid origin")?;

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/auth",
            routers::auth::routes(Arc::clone(&db_pool), user_secret),
        )
        .nest("/api/events", routers::events::routes(Arc::clone(&db_pool)))
        .nest(
            "/api/payments",
            routers::payments::routes(Arc::clone(&db_pool), mpesa_client),
        )
        .nest("/api/users", routers::users::routes(Arc::clone(&db_pool)))
        .nest("/api/reviews", routers::reviews::routes(Arc::clone(&db_pool)))
        .route("/api/health", get(default_routers::health_check))
        .layer(timeout_layer(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
                .allow_origin(client_origin),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(port = config.backend_server.port, "Server is running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Requests running past `timeout` are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = ?err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = ?err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
