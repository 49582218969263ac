//! One fetch cycle: BCV, then Binance P2P, then CoinMarketCap, each guarded
//! so a failing source never stops the ones after it. The cycle always ends
//! in a publish, even when every source failed — the advancing timestamp is
//! what tells observers the data is fresh-but-empty rather than stale.

use tracing::{debug, error, info, instrument};

use crate::credentials::CredentialStore;
use crate::rate_source::{CryptoRateSource, MarketRateSource, OfficialRateSource, OfficialRates};
use crate::snapshot::RateSnapshot;
use crate::store::RateStore;

/// Locale-independent two-decimal formatting, dot separator.
fn format_rate(value: f64) -> String {
    format!("{value:.2}")
}

#[instrument(name = "FetchCycle", skip_all)]
pub async fn run_cycle(
    official: &dyn OfficialRateSource,
    market: &dyn MarketRateSource,
    crypto: &dyn CryptoRateSource,
    credentials: &dyn CredentialStore,
    store: &RateStore,
) -> RateSnapshot {
    info!("Starting fetch cycle");

    let official_rates = match official.fetch_rates().await {
        Ok(rates) => {
            debug!(usd = ?rates.usd, eur = ?rates.eur, "BCV rates");
            rates
        }
        Err(e) => {
            error!("Error fetching BCV rates: {e:#}");
            OfficialRates::default()
        }
    };

    let market_rate = match market.fetch_rate().await {
        Ok(rate) => {
            debug!(?rate, "Binance rate");
            rate
        }
        Err(e) => {
            error!("Error fetching Binance rate: {e:#}");
            None
        }
    };

    let crypto_rate = match credentials.api_key() {
        Some(api_key) => match crypto.fetch_rate(&api_key).await {
            Ok(rate) => {
                debug!(?rate, "Satoshi rate");
                rate
            }
            Err(e) => {
                error!("Error fetching satoshi rate: {e:#}");
                None
            }
        },
        None => {
            info!("API key not found. Skipping satoshi rate fetch.");
            None
        }
    };

    let snapshot = RateSnapshot::new(
        official_rates.usd.map(format_rate),
        official_rates.eur.map(format_rate),
        market_rate.map(format_rate),
        crypto_rate.map(format_rate),
    );

    store.publish(snapshot.clone());
    info!("Fetch cycle complete");
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct StubOfficial(Option<OfficialRates>);

    #[async_trait]
    impl OfficialRateSource for StubOfficial {
        async fn fetch_rates(&self) -> Result<OfficialRates> {
            self.0.ok_or_else(|| anyhow!("official source down"))
        }
    }

    struct StubMarket(Option<Option<f64>>);

    #[async_trait]
    impl MarketRateSource for StubMarket {
        async fn fetch_rate(&self) -> Result<Option<f64>> {
            self.0.ok_or_else(|| anyhow!("market source down"))
        }
    }

    struct StubCrypto {
        rate: Option<Option<f64>>,
        expected_key: &'static str,
    }

    #[async_trait]
    impl CryptoRateSource for StubCrypto {
        async fn fetch_rate(&self, api_key: &str) -> Result<Option<f64>> {
            assert_eq!(api_key, self.expected_key);
            self.rate.ok_or_else(|| anyhow!("crypto source down"))
        }
    }

    /// Fails the test if the aggregator attempts a crypto fetch.
    struct UnreachableCrypto;

    #[async_trait]
    impl CryptoRateSource for UnreachableCrypto {
        async fn fetch_rate(&self, _api_key: &str) -> Result<Option<f64>> {
            panic!("crypto source must not be called without a credential");
        }
    }

    struct StubCredentials(Option<&'static str>);

    impl CredentialStore for StubCredentials {
        fn api_key(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_format_rate_two_decimals_dot_separator() {
        assert_eq!(format_rate(36.5), "36.50");
        assert_eq!(format_rate(2000.0), "2000.00");
        assert_eq!(format_rate(40.125), "40.12");
    }

    #[tokio::test]
    async fn test_full_cycle_formats_every_rate() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();

        let snapshot = run_cycle(
            &StubOfficial(Some(OfficialRates {
                usd: Some(36.5),
                eur: Some(39.8),
            })),
            &StubMarket(Some(Some(40.123))),
            &StubCrypto {
                rate: Some(Some(2000.0)),
                expected_key: "sekret",
            },
            &StubCredentials(Some("sekret")),
            &store,
        )
        .await;

        assert_eq!(snapshot.bcv_rate.as_deref(), Some("36.50"));
        assert_eq!(snapshot.euro_rate.as_deref(), Some("39.80"));
        assert_eq!(snapshot.binance_rate.as_deref(), Some("40.12"));
        assert_eq!(snapshot.satoshi_rate.as_deref(), Some("2000.00"));
        assert_eq!(store.latest(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_failed_source_does_not_stop_the_others() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();

        let snapshot = run_cycle(
            &StubOfficial(None),
            &StubMarket(Some(Some(40.0))),
            &StubCrypto {
                rate: Some(Some(2000.0)),
                expected_key: "sekret",
            },
            &StubCredentials(Some("sekret")),
            &store,
        )
        .await;

        assert_eq!(snapshot.bcv_rate, None);
        assert_eq!(snapshot.euro_rate, None);
        assert_eq!(snapshot.binance_rate.as_deref(), Some("40.00"));
        assert_eq!(snapshot.satoshi_rate.as_deref(), Some("2000.00"));
    }

    #[tokio::test]
    async fn test_all_sources_failing_still_publishes() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();
        let mut rx = store.subscribe();

        let snapshot = run_cycle(
            &StubOfficial(None),
            &StubMarket(None),
            &StubCrypto {
                rate: None,
                expected_key: "sekret",
            },
            &StubCredentials(Some("sekret")),
            &store,
        )
        .await;

        assert!(snapshot.is_empty());
        assert!(snapshot.timestamp > 0);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().clone(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_crypto_fetch_skipped_without_credential() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();

        let snapshot = run_cycle(
            &StubOfficial(Some(OfficialRates {
                usd: Some(36.5),
                eur: None,
            })),
            &StubMarket(Some(None)),
            &UnreachableCrypto,
            &StubCredentials(None),
            &store,
        )
        .await;

        assert_eq!(snapshot.bcv_rate.as_deref(), Some("36.50"));
        assert_eq!(snapshot.satoshi_rate, None);
    }
}
