use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::providers::util::{http_client, with_retry};
use crate::rate_source::CryptoRateSource;

const QUOTES_ENDPOINT: &str = "/v2/cryptocurrency/quotes/latest";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";
const BTC_ID: &str = "1";
const SATOSHIS_PER_BTC: f64 = 100_000_000.0;

/// Fetches the BTC/USD quote from CoinMarketCap and inverts it into
/// satoshis per USD.
pub struct CoinMarketCapProvider {
    base_url: String,
}

impl CoinMarketCapProvider {
    pub fn new(base_url: &str) -> Self {
        CoinMarketCapProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    data: Option<HashMap<String, AssetEntry>>,
}

#[derive(Debug, Deserialize)]
struct AssetEntry {
    quote: Option<QuoteMap>,
}

#[derive(Debug, Deserialize)]
struct QuoteMap {
    #[serde(rename = "USD")]
    usd: Option<UsdQuote>,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    price: Option<f64>,
}

// Defined only for strictly positive prices; a zero or negative quote is
// treated as absent.
fn satoshis_per_usd(btc_price_usd: Option<f64>) -> Option<f64> {
    match btc_price_usd {
        Some(price) if price > 0.0 => Some(SATOSHIS_PER_BTC / price),
        _ => None,
    }
}

#[async_trait]
impl CryptoRateSource for CoinMarketCapProvider {
    #[instrument(name = "CoinMarketCapFetch", skip(self, api_key))]
    async fn fetch_rate(&self, api_key: &str) -> Result<Option<f64>> {
        let url = format!("{}{}", self.base_url, QUOTES_ENDPOINT);
        debug!("Requesting BTC quote from {}", url);

        let client = http_client("vesrates/0.2")?;
        let response = with_retry(
            || async {
                client
                    .get(&url)
                    .query(&[("id", BTC_ID)])
                    .header(API_KEY_HEADER, api_key)
                    .header("Accept", "application/json")
                    .send()
                    .await
            },
            2,
            500,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for CoinMarketCap URL: {}", e, url))?;

        let status = response.status();
        if !status.is_success() {
            // Keep the body: CMC explains key/plan problems in it.
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "HTTP error: {} from CoinMarketCap. Body: {}",
                status,
                body
            ));
        }

        let quotes: QuotesResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse CoinMarketCap response: {}", e))?;

        let btc_price = quotes
            .data
            .and_then(|mut assets| assets.remove(BTC_ID))
            .and_then(|asset| asset.quote)
            .and_then(|quote| quote.usd)
            .and_then(|usd| usd.price);

        debug!(?btc_price, "Parsed BTC quote");
        Ok(satoshis_per_usd(btc_price))
    }
}
