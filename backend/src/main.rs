//! Service entry-point: loads configuration, migrates the database and serves
//! the webhook receivers, the session API and the OpenAPI docs.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use marketplace::inbound::http::health::HealthState;
use marketplace::inbound::http::session_config::{BuildMode, session_settings_from_env};
use marketplace::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use marketplace::settings::MarketplaceSettings;
use server::{ServerConfig, build_http_state, create_server};

#[cfg(feature = "metrics")]
use marketplace::outbound::metrics::PrometheusWebhookMetrics;
#[cfg(not(feature = "metrics"))]
use marketplace::domain::ports::NoOpWebhookMetrics;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        MarketplaceSettings::load().map_err(|err| eyre!("failed to load configuration: {err}"))?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("invalid session configuration")?;
    let bind_addr = settings.bind_addr()?;

    let database_url = settings.database_url()?;
    let applied = run_pending_migrations(database_url)
        .await
        .wrap_err("database migration failed")?;
    info!(applied = applied.len(), "database migrations complete");
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .wrap_err("failed to build database pool")?;

    #[cfg(feature = "metrics")]
    let config = {
        let prometheus = server::build_prometheus()?;
        let webhook_metrics = PrometheusWebhookMetrics::new(&prometheus.registry)
            .wrap_err("webhook metrics registration failed")?;
        let http_state = build_http_state(&settings, &pool, Arc::new(webhook_metrics))?;
        ServerConfig::new(session, bind_addr, http_state).with_metrics(prometheus)
    };
    #[cfg(not(feature = "metrics"))]
    let config = {
        let http_state = build_http_state(&settings, &pool, Arc::new(NoOpWebhookMetrics))?;
        ServerConfig::new(session, bind_addr, http_state)
    };

    let health_state = web::Data::new(HealthState::new());
    info!(%bind_addr, "starting marketplace payments server");
    create_server(health_state, config)?.await?;
    Ok(())
}
