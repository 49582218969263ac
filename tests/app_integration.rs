use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vesrates::store::RateStore;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_bcv_server(html: &str, status: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string(html))
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub async fn create_binance_server(body: &str, status: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bapi/c2c/v2/friendly/c2c/adv/search"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub async fn create_cmc_server(body: &str, status: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/cryptocurrency/quotes/latest"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }
}

fn write_config(
    bcv_url: &str,
    binance_url: &str,
    cmc_url: &str,
    data_dir: &Path,
) -> (tempfile::NamedTempFile, PathBuf) {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
providers:
  bcv:
    base_url: "{bcv_url}"
  binance:
    base_url: "{binance_url}"
  coinmarketcap:
    base_url: "{cmc_url}"
data_dir: "{}"
"#,
        data_dir.display()
    );
    std::fs::write(config_file.path(), &config_content).expect("Failed to write config file");
    let path = config_file.path().to_path_buf();
    (config_file, path)
}

#[test_log::test(tokio::test)]
async fn test_fetch_cycle_persists_and_publishes() {
    let bcv_html = r#"
        <html><body>
          <div id="dolar"><strong>36,50</strong></div>
          <div id="euro"><strong>39,80</strong></div>
        </body></html>"#;
    let binance_body = r#"{"data": [{"adv": {"price": "40.123"}}]}"#;

    let bcv_server = test_utils::create_bcv_server(bcv_html, 200).await;
    let binance_server = test_utils::create_binance_server(binance_body, 200).await;
    let cmc_server = test_utils::create_cmc_server(r#"{"data": {}}"#, 200).await;

    let data_dir = TempDir::new().expect("Failed to create data dir");
    let (_config_file, config_path) = write_config(
        &bcv_server.uri(),
        &binance_server.uri(),
        &cmc_server.uri(),
        data_dir.path(),
    );

    let result = vesrates::run_command(
        vesrates::AppCommand::Fetch,
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Fetch failed with: {:?}", result.err());

    // Reopen the store the way a later invocation would.
    let store = RateStore::open(data_dir.path()).unwrap();
    let snapshot = store.latest().expect("snapshot should be persisted");
    assert_eq!(snapshot.bcv_rate.as_deref(), Some("36.50"));
    assert_eq!(snapshot.euro_rate.as_deref(), Some("39.80"));
    assert_eq!(snapshot.binance_rate.as_deref(), Some("40.12"));
    assert!(snapshot.timestamp > 0);
}

#[test_log::test(tokio::test)]
async fn test_all_sources_down_still_persists_empty_snapshot() {
    let bcv_server = test_utils::create_bcv_server("down", 503).await;
    let binance_server = test_utils::create_binance_server("{}", 503).await;
    let cmc_server = test_utils::create_cmc_server("{}", 503).await;

    let data_dir = TempDir::new().expect("Failed to create data dir");
    let (_config_file, config_path) = write_config(
        &bcv_server.uri(),
        &binance_server.uri(),
        &cmc_server.uri(),
        data_dir.path(),
    );

    let result = vesrates::run_command(
        vesrates::AppCommand::Fetch,
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "A fully failed cycle must not error");

    let store = RateStore::open(data_dir.path()).unwrap();
    let snapshot = store.latest().expect("empty snapshot must still be persisted");
    assert!(snapshot.is_empty());
    assert!(snapshot.timestamp > 0);
}

#[test_log::test(tokio::test)]
async fn test_second_cycle_supersedes_the_first() {
    let bcv_html = r#"<div id="dolar"><strong>36,50</strong></div>"#;
    let bcv_server = test_utils::create_bcv_server(bcv_html, 200).await;
    let binance_server = test_utils::create_binance_server(r#"{"data": []}"#, 200).await;
    let cmc_server = test_utils::create_cmc_server(r#"{"data": {}}"#, 200).await;

    let data_dir = TempDir::new().expect("Failed to create data dir");
    let (_config_file, config_path) = write_config(
        &bcv_server.uri(),
        &binance_server.uri(),
        &cmc_server.uri(),
        data_dir.path(),
    );
    let config_path = config_path.to_str().unwrap().to_string();

    vesrates::run_command(vesrates::AppCommand::Fetch, Some(&config_path))
        .await
        .unwrap();
    let first = {
        let store = RateStore::open(data_dir.path()).unwrap();
        store.latest().unwrap()
    };

    vesrates::run_command(vesrates::AppCommand::Fetch, Some(&config_path))
        .await
        .unwrap();
    let second = {
        let store = RateStore::open(data_dir.path()).unwrap();
        store.latest().unwrap()
    };

    assert_eq!(second.bcv_rate.as_deref(), Some("36.50"));
    assert!(second.timestamp >= first.timestamp);
}

#[test_log::test(tokio::test)]
async fn test_show_renders_without_fetching() {
    let data_dir = TempDir::new().expect("Failed to create data dir");
    // Unroutable provider URLs: show must not touch the network.
    let (_config_file, config_path) = write_config(
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        data_dir.path(),
    );

    let result = vesrates::run_command(
        vesrates::AppCommand::Show,
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Show failed with: {:?}", result.err());
}
