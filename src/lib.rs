pub mod aggregator;
pub mod config;
pub mod credentials;
pub mod log;
pub mod providers;
pub mod rate_source;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod ui;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::credentials::KeyringStore;
use crate::providers::bcv::BcvProvider;
use crate::providers::binance_p2p::BinanceP2pProvider;
use crate::providers::coinmarketcap::CoinMarketCapProvider;
use crate::scheduler::JobScheduler;
use crate::store::RateStore;

pub enum AppCommand {
    /// One fetch cycle, then render.
    Fetch,
    /// Render the last stored snapshot without fetching.
    Show,
    /// Fetch periodically and re-render on every publish.
    Watch,
}

const FETCH_JOB_NAME: &str = "currency-fetch";

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("vesrates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = RateStore::open(&config.data_path()?)?;

    match command {
        AppCommand::Show => {
            show(&store);
            Ok(())
        }
        AppCommand::Fetch => {
            fetch_once(&config, &store).await;
            Ok(())
        }
        AppCommand::Watch => watch(&config, store).await,
    }
}

fn build_providers(
    config: &AppConfig,
) -> (BcvProvider, BinanceP2pProvider, CoinMarketCapProvider) {
    let bcv_url = config
        .providers
        .bcv
        .as_ref()
        .map_or(config::DEFAULT_BCV_URL, |p| &p.base_url);
    let binance_url = config
        .providers
        .binance
        .as_ref()
        .map_or(config::DEFAULT_BINANCE_URL, |p| &p.base_url);
    let coinmarketcap_url = config
        .providers
        .coinmarketcap
        .as_ref()
        .map_or(config::DEFAULT_COINMARKETCAP_URL, |p| &p.base_url);

    (
        BcvProvider::new(bcv_url),
        BinanceP2pProvider::new(binance_url),
        CoinMarketCapProvider::new(coinmarketcap_url),
    )
}

async fn fetch_once(config: &AppConfig, store: &RateStore) {
    let (bcv, binance, coinmarketcap) = build_providers(config);

    let spinner = ui::new_spinner("Fetching rates...");
    let snapshot =
        aggregator::run_cycle(&bcv, &binance, &coinmarketcap, &KeyringStore, store).await;
    spinner.finish_and_clear();

    println!("{}", ui::render_snapshot(&snapshot));
}

fn show(store: &RateStore) {
    match store.latest() {
        Some(snapshot) => println!("{}", ui::render_snapshot(&snapshot)),
        None => println!("{}", ui::render_no_data()),
    }
}

async fn watch(config: &AppConfig, store: RateStore) -> Result<()> {
    let store = Arc::new(store);
    let config = Arc::new(config.clone());
    let scheduler = JobScheduler::new();
    let period = Duration::from_secs(config.fetch_interval_minutes.max(1) * 60);

    let mut updates = store.subscribe();
    {
        let store = Arc::clone(&store);
        let config = Arc::clone(&config);
        scheduler.schedule_repeating(FETCH_JOB_NAME, period, move || {
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            async move {
                let (bcv, binance, coinmarketcap) = build_providers(&config);
                aggregator::run_cycle(&bcv, &binance, &coinmarketcap, &KeyringStore, &store)
                    .await;
            }
        });
    }

    info!(
        "Watching rates every {} minutes. Press Ctrl-C to stop.",
        config.fetch_interval_minutes
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    println!("{}", ui::render_snapshot(&snapshot));
                }
            }
        }
    }

    scheduler.cancel(FETCH_JOB_NAME);
    Ok(())
}
