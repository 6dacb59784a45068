use axum::Extension;
use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::error;

use crate::logger::Logger;
use crate::server::dtos::health_dto::{
    CatalogHealth, HealthResponse, HealthStatus, ServiceHealthDetails,
};
use crate::server::services::AppServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health endpoint, the relay itself is stateless so the catalog is the only thing to check
pub async fn health_endpoint(
    Extension(services): Extension<AppServices>,
) -> (StatusCode, Json<HealthResponse>) {
    let catalog_health = check_catalog_health(&services).await;

    let response = HealthResponse {
        status: catalog_health.status,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: Logger::environment_name(services.config.cargo_env).to_string(),
        services: ServiceHealthDetails {
            catalog: catalog_health,
        },
    };

    let http_status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}

async fn check_catalog_health(services: &AppServices) -> CatalogHealth {
    match services.catalog.count().await {
        Ok(entries) => CatalogHealth {
            // an empty catalog still relays nothing, worth flagging
            status: if entries == 0 {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            },
            entries,
        },
        Err(e) => {
            error!("Catalog health check failed: {}", e);
            CatalogHealth {
                status: HealthStatus::Unhealthy,
                entries: 0,
            }
        }
    }
}
