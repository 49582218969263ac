use anyhow::{Result, anyhow};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use crate::providers::util::{http_client, parse_decimal, with_retry};
use crate::rate_source::{OfficialRateSource, OfficialRates};

// Verify these selectors if the BCV site changes
const DOLLAR_SELECTOR: &str = "#dolar strong";
const EURO_SELECTOR: &str = "#euro strong";

/// Scrapes the official USD and EUR reference rates off the central bank's
/// home page.
pub struct BcvProvider {
    base_url: String,
}

impl BcvProvider {
    pub fn new(base_url: &str) -> Self {
        BcvProvider {
            base_url: base_url.to_string(),
        }
    }
}

fn select_rate(document: &Html, css: &str) -> Option<f64> {
    let selector = Selector::parse(css).ok()?;
    let element = document.select(&selector).next()?;
    let text = element.text().collect::<String>();
    debug!(selector = css, text = %text.trim(), "Scraped rate element");
    parse_decimal(&text)
}

// `Html` is not Send, so scraping happens outside the async call chain.
fn scrape_rates(html: &str) -> OfficialRates {
    let document = Html::parse_document(html);
    OfficialRates {
        usd: select_rate(&document, DOLLAR_SELECTOR),
        eur: select_rate(&document, EURO_SELECTOR),
    }
}

#[async_trait]
impl OfficialRateSource for BcvProvider {
    #[instrument(name = "BcvFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<OfficialRates> {
        debug!("Requesting BCV page from {}", self.base_url);

        let client = http_client("vesrates/0.2")?;
        let response = with_retry(|| async { client.get(&self.base_url).send().await }, 2, 500)
            .await
            .map_err(|e| anyhow!("Request error: {} for BCV URL: {}", e, self.base_url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} from BCV", response.status()));
        }

        let html = response.text().await?;
        Ok(scrape_rates(&html))
    }
}
