use std::sync::Arc;

use tracing::info;

use crate::{config::AppConfig, database::DynCatalogRepository};

use super::{
    relay_services::RelayService,
    upstream_services::{DynUpstreamService, UpstreamService},
};

/// everything a handler needs, cloned into each request through an Extension
#[derive(Clone)]
pub struct AppServices {
    pub catalog: DynCatalogRepository,
    pub upstream: DynUpstreamService,
    pub relay: RelayService,
    pub config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(config: Arc<AppConfig>, catalog: DynCatalogRepository) -> anyhow::Result<Self> {
        info!("starting relay services...");

        let upstream = Arc::new(UpstreamService::new(&config)?) as DynUpstreamService;

        info!(
            "upstream client ok (timeout {}s, max redirects {})",
            config.upstream_timeout_secs, config.upstream_max_redirects
        );

        Ok(Self::with_upstream(config, catalog, upstream))
    }

    /// same as `new` but with the upstream side swapped out, the tests use this with a mock
    pub fn with_upstream(
        config: Arc<AppConfig>,
        catalog: DynCatalogRepository,
        upstream: DynUpstreamService,
    ) -> Self {
        let relay = RelayService::new(config.max_playlist_bytes);

        Self {
            catalog,
            upstream,
            relay,
            config,
        }
    }
}
