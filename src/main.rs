use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt};

use aria_tx::alpaca_api::AlpacaClient;
use aria_tx::core::{Config, PriceFeed, SuggestionStore};
use aria_tx::feeds::CoinGeckoFeed;
use aria_tx::oracle::OpenAiOracle;
use aria_tx::risk::RiskSizer;
use aria_tx::runner::ExecutionRunner;
use aria_tx::server::{self, AppState};
use aria_tx::store::JsonFileStore;
use aria_tx::workflow::ConfirmationWorkflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Initialize logger
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aria_tx=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();

    // 2. Load configuration (TOML + env overrides)
    let config = Config::from_env().context("failed to load configuration")?;
    config.warn_missing_credentials();

    // 3. Wire adapters behind their ports
    let store: Arc<dyn SuggestionStore> = Arc::new(
        JsonFileStore::open(&config.store.memory_path)
            .context("failed to open memory document")?,
    );
    let feed = Arc::new(CoinGeckoFeed::new(&config.feed)?);
    tracing::info!(feed = feed.name(), "price feed ready");
    let oracle = Arc::new(OpenAiOracle::new(&config.oracle)?);
    let broker = Arc::new(AlpacaClient::new(&config.broker)?);
    let sizer = RiskSizer::new(feed, config.risk.clone());

    // 4. Start the execution runner on its channel
    let (runner_tx, runner_rx) = flume::unbounded();
    let runner = ExecutionRunner::new(Arc::clone(&store), broker.clone(), runner_rx).spawn();

    let workflow = Arc::new(ConfirmationWorkflow::new(
        oracle,
        broker,
        sizer,
        Arc::clone(&store),
        &config,
        runner_tx,
    ));

    // 5. Serve the HTTP surface
    let router = server::create_router(AppState {
        workflow,
        store,
        auth_token: config.server.auth_token.clone(),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, symbols = ?config.trading.allowed_symbols, "aria-tx listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the router releases the last channel sender; the runner
    // finishes any in-flight execution before it stops.
    tracing::info!("draining execution runner");
    runner.await.ok();

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
