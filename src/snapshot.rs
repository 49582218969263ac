use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Latest known rates, captured once per fetch cycle.
///
/// Every field is optional: a source that failed or was skipped leaves its
/// field absent. An all-absent snapshot is still a valid snapshot — it means
/// "we fetched and found nothing", which is different from never having
/// fetched at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    /// Official BCV USD/VES rate, formatted to two decimals.
    pub bcv_rate: Option<String>,
    /// Official BCV EUR/VES rate.
    pub euro_rate: Option<String>,
    /// Binance P2P USDT/VES sell price.
    pub binance_rate: Option<String>,
    /// Satoshis per USD derived from the BTC quote.
    pub satoshi_rate: Option<String>,
    /// Capture time, milliseconds since epoch.
    pub timestamp: i64,
}

impl RateSnapshot {
    pub fn new(
        bcv_rate: Option<String>,
        euro_rate: Option<String>,
        binance_rate: Option<String>,
        satoshi_rate: Option<String>,
    ) -> Self {
        Self {
            bcv_rate,
            euro_rate,
            binance_rate,
            satoshi_rate,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bcv_rate.is_none()
            && self.euro_rate.is_none()
            && self.binance_rate.is_none()
            && self.satoshi_rate.is_none()
    }
}
