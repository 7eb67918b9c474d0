// =============================================================================
// Contrarian Screener: Main Entry Point
// =============================================================================
//
//   contrarian-screener         serve the HTTP trigger on SCREENER_BIND_ADDR
//   contrarian-screener scan    run one scan, print the result as JSON, exit
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod position_plan;
mod scanner;
mod screener_config;
mod signals;
mod store;
mod types;
mod universe;
mod yahoo;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::ScanResponse;
use crate::app_state::AppState;
use crate::market_data::MarketDataGateway;
use crate::screener_config::{default_tickers, normalize_tickers, ScreenerConfig};
use crate::store::{MemorySignalStore, RestSignalStore, SignalStore};
use crate::universe::{NasdaqDirectory, UniverseSource};
use crate::yahoo::YahooClient;

const DEFAULT_CONFIG_PATH: &str = "screener_config.json";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Contrarian Screener starting up");

    let config_path =
        std::env::var("SCREENER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = ScreenerConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        ScreenerConfig::default()
    });

    // Override the universe from env if available. An explicit list is
    // scanned as-is, without the dynamic listing.
    if let Ok(list) = std::env::var("SCREENER_TICKERS") {
        config.tickers = normalize_tickers(list.split(','));
        config.dynamic_universe = false;
    }
    if config.tickers.is_empty() {
        config.tickers = default_tickers();
    }
    config.validate().context("invalid screener configuration")?;

    info!(
        tickers = config.tickers.len(),
        vix_zone = %format!("{}-{}", config.vix_min, config.vix_max),
        min_score = config.min_score,
        dynamic = config.dynamic_universe,
        "Configured ticker universe"
    );

    // ── 2. Capabilities ──────────────────────────────────────────────────
    let gateway: Arc<dyn MarketDataGateway> = Arc::new(YahooClient::new()?);
    let store = build_store()?;
    let universe: Option<Arc<dyn UniverseSource>> = if config.dynamic_universe {
        Some(Arc::new(NasdaqDirectory::new()?))
    } else {
        None
    };
    info!(
        gateway = gateway.name(),
        store = store.name(),
        universe = universe.as_ref().map_or("configured", |u| u.name()),
        "Capabilities wired"
    );

    let state = Arc::new(AppState::new(config, gateway, store, universe));

    // ── 3. One-shot mode ─────────────────────────────────────────────────
    if std::env::args().nth(1).as_deref() == Some("scan") {
        return run_once(&state).await;
    }

    // ── 4. API server ────────────────────────────────────────────────────
    let bind_addr =
        std::env::var("SCREENER_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Contrarian Screener shut down complete.");
    Ok(())
}

/// HTTP store when both credentials are set, in-memory otherwise.
fn build_store() -> anyhow::Result<Arc<dyn SignalStore>> {
    match (
        std::env::var("SIGNAL_STORE_URL"),
        std::env::var("SIGNAL_STORE_KEY"),
    ) {
        (Ok(url), Ok(key)) if !url.is_empty() && !key.is_empty() => {
            Ok(Arc::new(RestSignalStore::new(url, &key)?))
        }
        (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
            warn!(
                "SIGNAL_STORE_URL and SIGNAL_STORE_KEY must both be set; picks will stay in memory"
            );
            Ok(Arc::new(MemorySignalStore::new()))
        }
        _ => {
            info!("No signal store configured; picks will stay in memory");
            Ok(Arc::new(MemorySignalStore::new()))
        }
    }
}

async fn run_once(state: &AppState) -> anyhow::Result<()> {
    state.record_trigger();
    let result = state.scanner.run().await;
    let body = ScanResponse::from_result(&result);
    println!("{}", serde_json::to_string_pretty(&body)?);
    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
