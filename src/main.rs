use anyhow::Context;
use hlcopy::datasource::{RemotePairlist, StaticWhitelist, WhitelistProvider};
use hlcopy::persistence::{CsvHistorySink, HistorySink};
use hlcopy::{api, config::Config, CopyState, HyperliquidDataSource, Orchestrator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let engine_config = config.engine_config();

    let fetcher = Arc::new(HyperliquidDataSource::new(config.hyperliquid_api_url.clone()));
    let whitelist: Arc<dyn WhitelistProvider> = match &config.whitelist_url {
        Some(url) => Arc::new(RemotePairlist::new(url.clone())),
        None => Arc::new(StaticWhitelist::new(config.whitelist.clone())),
    };
    let sink = Arc::new(
        CsvHistorySink::open(&config.data_dir)
            .with_context(|| format!("Failed to open data dir {}", config.data_dir))?,
    );

    // Resume change detection from the last persisted tracked snapshot.
    let mut state = CopyState::new(config.tracked_address.clone(), config.local_address.clone());
    match sink.load_last_snapshot(&config.tracked_address) {
        Ok(Some(snapshot)) => {
            tracing::info!(
                positions = snapshot.len(),
                timestamp = %snapshot.timestamp,
                "Restored tracked snapshot"
            );
            state = state.with_tracked(snapshot);
        }
        Ok(None) => tracing::info!("No persisted tracked snapshot, starting fresh"),
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable persisted snapshot"),
    }

    let orchestrator = Orchestrator::new(fetcher, whitelist, sink, engine_config, state);
    let app = api::create_router(api::AppState::new(orchestrator.status(), config.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let copy_loop = tokio::spawn(orchestrator.run(config.poll_interval, shutdown_rx));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        tracked = %config.tracked_address,
        local = %config.local_address,
        "Server listening on {}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    copy_loop.await.context("Copy loop panicked")?;
    Ok(())
}
