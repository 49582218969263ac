//! Seams between the aggregator and the concrete rate sources.
//!
//! Every fetch distinguishes absence from failure: `Ok(None)` means the
//! source answered but had no usable value (silent, by design), `Err` means
//! the call itself failed (transport error, bad status) and is logged by the
//! caller.

use anyhow::Result;
use async_trait::async_trait;

/// Both rates published on the BCV page. Each field parses independently, so
/// one missing or garbled element does not take the other down with it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OfficialRates {
    pub usd: Option<f64>,
    pub eur: Option<f64>,
}

#[async_trait]
pub trait OfficialRateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<OfficialRates>;
}

#[async_trait]
pub trait MarketRateSource: Send + Sync {
    async fn fetch_rate(&self) -> Result<Option<f64>>;
}

#[async_trait]
pub trait CryptoRateSource: Send + Sync {
    async fn fetch_rate(&self, api_key: &str) -> Result<Option<f64>>;
}
