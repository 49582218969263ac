use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Total request deadline for every provider call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Connection establishment deadline.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client with bounded timeouts, so a stalled source delays
/// the cycle by at most the request deadline.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Normalizes a decimal string that may use a comma separator ("36,50") and
/// parses it. Returns `None` for anything non-numeric.
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse::<f64>().ok()
}
