use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;

use tracing::info;

use cinemahub::{AppConfig, ApplicationServer, DynCatalogRepository, InMemoryCatalog, Logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(AppConfig::parse());

    // guards are kept alive to flush logs and keep the sentry client around
    let _guards = Logger::init(config.cargo_env, config.sentry_dsn.clone());

    info!("logger and env prepped, loading catalog...");

    let catalog = InMemoryCatalog::load(&config.catalog_path).context("failed to load catalog")?;
    let catalog = Arc::new(catalog) as DynCatalogRepository;

    info!("catalog ok, starting relay server...");

    ApplicationServer::serve(config, catalog)
        .await
        .context("relay server failed to start")?;

    Ok(())
}
