//! Multi-source search service: binary entrypoint.
//! Loads configuration, wires the aggregator, and serves the Axum router.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use multisearch::config::{AggregatorConfig, AiConfig};
use multisearch::metrics::Metrics;
use multisearch::{build_aggregator, create_router, AppState};

/// Compact human logs by default; JSON lines when `LOG_FORMAT=json`.
/// Filter from `RUST_LOG`, falling back to `multisearch=info,warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("multisearch=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    // The runtime may already have installed a subscriber.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AggregatorConfig::load().context("loading aggregator config")?;
    let ai = AiConfig::load_default().context("loading ai config")?;
    let aggregator = build_aggregator(&cfg, ai.as_ref())?;

    let mut router = create_router(AppState::new(aggregator));
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(router.into())
}
