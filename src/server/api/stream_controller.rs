// the two relay routes. /stream starts playback from a catalog id, /segment serves every url
// that ended up in a rewritten playlist
use axum::{
    Extension, Router,
    extract::{Path, RawQuery},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::debug;

use crate::{
    database::CatalogEntry,
    server::{
        error::{AppResult, Error},
        extractors::ForwardedHeaders,
        services::{AppServices, RelayService},
        utils::url_utils::ProxyReference,
    },
};

pub struct StreamController;

impl StreamController {
    pub fn app() -> Router {
        Router::new()
            .route(
                "/stream/{video_id}",
                get(Self::stream_root).options(Self::proxy_options),
            )
            .route(
                "/segment/{video_id}",
                get(Self::segment_relay).options(Self::proxy_options),
            )
    }

    async fn stream_root(
        Extension(services): Extension<AppServices>,
        Path(video_id): Path<String>,
        forwarded: ForwardedHeaders,
    ) -> AppResult<Response> {
        let entry = Self::require_entry(&services, &video_id).await?;
        debug!("Proxying stream root for {}: {}", video_id, entry.upstream_url());

        let fetched = services
            .upstream
            .fetch(entry.upstream_url(), &forwarded)
            .await;

        services
            .relay
            .relay(fetched, &video_id, services.config.stream_chunk_size)
            .await
    }

    async fn segment_relay(
        Extension(services): Extension<AppServices>,
        Path(video_id): Path<String>,
        RawQuery(query): RawQuery,
        forwarded: ForwardedHeaders,
    ) -> AppResult<Response> {
        // parameter problems are answered before the catalog or the network is touched
        let reference = ProxyReference::from_query(&video_id, query.as_deref())?;

        // only an existence check, the url to fetch is the one from the query
        Self::require_entry(&services, &reference.video_id).await?;
        debug!("Proxying segment for {}: {}", video_id, reference.upstream_url);

        let fetched = services
            .upstream
            .fetch(&reference.upstream_url, &forwarded)
            .await;

        services
            .relay
            .relay(fetched, &video_id, services.config.segment_chunk_size)
            .await
    }

    async fn proxy_options() -> impl IntoResponse {
        RelayService::preflight()
    }

    async fn require_entry(services: &AppServices, video_id: &str) -> AppResult<CatalogEntry> {
        services
            .catalog
            .get_by_id(video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("video {} not found", video_id)))
    }
}
