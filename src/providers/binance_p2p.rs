use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::providers::util::{http_client, parse_decimal, with_retry};
use crate::rate_source::MarketRateSource;

const SEARCH_ENDPOINT: &str = "/bapi/c2c/v2/friendly/c2c/adv/search";

// The endpoint rejects non-browser clients.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:88.0) Gecko/20100101 Firefox/88.0";

/// Fetches the best USDT/VES sell offer from the Binance P2P ad search.
///
/// Gzip-compressed responses are decompressed transparently by reqwest, keyed
/// off the `Content-Encoding` response header.
pub struct BinanceP2pProvider {
    base_url: String,
}

impl BinanceP2pProvider {
    pub fn new(base_url: &str) -> Self {
        BinanceP2pProvider {
            base_url: base_url.to_string(),
        }
    }
}

// Fixed query: single PagoMovil sell-side USDT/VES ad.
fn search_payload() -> serde_json::Value {
    json!({
        "asset": "USDT",
        "fiat": "VES",
        "merchantCheck": false,
        "page": 1,
        "payTypes": ["PagoMovil"],
        "publisherType": null,
        "rows": 1,
        "tradeType": "SELL"
    })
}

#[derive(Debug, Deserialize)]
struct AdSearchResponse {
    data: Option<Vec<AdRecord>>,
}

#[derive(Debug, Deserialize)]
struct AdRecord {
    adv: Option<Ad>,
}

#[derive(Debug, Deserialize)]
struct Ad {
    price: Option<String>,
}

#[async_trait]
impl MarketRateSource for BinanceP2pProvider {
    #[instrument(name = "BinanceFetch", skip(self))]
    async fn fetch_rate(&self) -> Result<Option<f64>> {
        let url = format!("{}{}", self.base_url, SEARCH_ENDPOINT);
        debug!("Requesting P2P ads from {}", url);

        let client = http_client(BROWSER_USER_AGENT)?;
        let payload = search_payload();
        let response = with_retry(
            || async {
                client
                    .post(&url)
                    .header("Accept", "*/*")
                    .header("Accept-Language", "en-GB,en-US;q=0.9,en;q=0.8")
                    .header("Origin", "https://p2p.binance.com")
                    .json(&payload)
                    .send()
                    .await
            },
            2,
            500,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for Binance P2P URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} from Binance P2P",
                response.status()
            ));
        }

        let search: AdSearchResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Binance P2P response: {}", e))?;

        let price = search
            .data
            .and_then(|ads| ads.into_iter().next())
            .and_then(|record| record.adv)
            .and_then(|ad| ad.price)
            .and_then(|price| parse_decimal(&price));

        debug!(?price, "Parsed first P2P ad");
        Ok(price)
    }
}
