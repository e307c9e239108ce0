//! IS23 ImouRelay - Imou OpenAPI credential relay (araneaDevice ar-is23)
//!
//! Main entry point for the relay application.

use is23_imourelay::{
    imou_client::ImouClient,
    state::{AppConfig, AppState},
    web_api,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "is23_imourelay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting IS23 ImouRelay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration; the secret itself stays out of the logs
    let config = AppConfig::default();
    tracing::info!(
        imou_api_base = %config.imou_api_base,
        host = %config.host,
        port = config.port,
        credential_loaded = config.credential.is_some(),
        "Configuration loaded"
    );

    if config.credential.is_none() {
        tracing::warn!(
            "IMOU_APP_ID / IMOU_APP_SECRET not set; relay operations will fail until configured"
        );
    }

    // Initialize the vendor client
    let imou = Arc::new(ImouClient::new(
        config.imou_api_base.clone(),
        config.credential.clone(),
    ));
    tracing::info!("ImouClient initialized");

    // Create application state
    let state = AppState {
        config,
        imou,
        started_at: Instant::now(),
    };

    let cors = build_cors(&state.config.allowed_origins)?;

    let app = web_api::create_router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Explicit allow-list when ALLOWED_ORIGINS is set, permissive otherwise
fn build_cors(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| origin.parse())
        .collect::<Result<Vec<axum::http::HeaderValue>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Resolve on ctrl-c or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(err) => {
                tracing::error!("Error setting up signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Error setting up SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received shutdown signal"),
        _ = sigterm => tracing::info!("Received SIGTERM signal"),
    }
}
