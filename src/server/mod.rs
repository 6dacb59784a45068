pub mod api;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod services;
pub mod utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::{
    Extension, Router,
    http::{HeaderValue, Method},
    routing::get,
};
use once_cell::sync::Lazy;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{config::AppConfig, database::DynCatalogRepository};

use api::{CatalogController, StreamController, health_endpoint};
use services::AppServices;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub fn get_uptime_seconds() -> u64 {
    START_TIME.elapsed().as_secs()
}

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub struct ApplicationServer;

impl ApplicationServer {
    /// the full router. the relay routes set their own cors headers, the json api goes through
    /// the configured cors layer
    pub fn router(services: AppServices) -> Router {
        let cors = Self::cors_layer(&services.config.cors_origin);

        Router::new()
            .route("/health", get(health_endpoint))
            .merge(StreamController::app())
            .nest("/api", CatalogController::app().layer(cors))
            .layer(Extension(services))
            .layer(TraceLayer::new_for_http())
    }

    fn cors_layer(cors_origin: &str) -> CorsLayer {
        let layer = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);

        if cors_origin.trim() == "*" {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = cors_origin
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid cors origin {}", origin);
                    None
                }
            })
            .collect();

        layer.allow_origin(AllowOrigin::list(origins))
    }

    pub async fn serve(config: Arc<AppConfig>, catalog: DynCatalogRepository) -> anyhow::Result<()> {
        Lazy::force(&START_TIME);

        let services = AppServices::new(config.clone(), catalog)?;
        let app = Self::router(services);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        info!("relay listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .context("server error")?;

        info!("relay shut down");

        Ok(())
    }

    async fn shutdown_signal() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    }
}
