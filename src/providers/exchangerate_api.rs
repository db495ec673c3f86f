use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::config::ExchangeRateProviderConfig;
use crate::core::{FetchError, RateProvider, RateTable};

// ExchangeRateApiProvider implementation for RateProvider
pub struct ExchangeRateApiProvider {
    base_url: String,
    timeout: Duration,
    retries: usize,
    retry_delay_ms: u64,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            retries: 0,
            retry_delay_ms: 0,
        }
    }

    pub fn from_config(config: &ExchangeRateProviderConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
            .with_retries(config.retries, config.retry_delay_ms)
    }

    pub fn with_retries(mut self, retries: usize, delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    async fn fetch_once(&self, base: &str) -> Result<RateTable, FetchError> {
        let url = format!("{}/v4/latest/{}", self.base_url, base);
        debug!("Requesting exchange rates from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(concat!("fxform/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {e}")))?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Request error: {e} for base: {base}")))?;

        if !response.status().is_success() {
            return Err(FetchError::Server(format!(
                "HTTP {} for base: {}",
                response.status(),
                base
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response body: {e}")))?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| FetchError::Parse(format!("invalid JSON for {base}: {e}")))?;

        let published_at = data
            .time_last_updated
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        Ok(RateTable::new(base, data.rates, Utc::now())?.with_published_at(published_at))
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
    time_last_updated: Option<i64>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RateTable, FetchError> {
        let base = base.to_uppercase();
        with_retry(
            || self.fetch_once(&base),
            self.retries,
            self.retry_delay_ms,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(base: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v4/latest/{base}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(&server.uri(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_response = r#"{
            "provider": "https://www.exchangerate-api.com",
            "base": "BRL",
            "date": "2024-05-02",
            "time_last_updated": 1714608001,
            "rates": {"BRL": 1, "USD": 0.193, "EUR": 0.181, "GBP": 0.155}
        }"#;
        let server = create_mock_server(
            "BRL",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let table = provider(&server).fetch_rates("brl").await.unwrap();
        assert_eq!(table.base(), "BRL");
        assert_eq!(table.len(), 4);
        assert_eq!(table.rate("USD"), Some(0.193));
        assert_eq!(table.rate("GBP"), Some(0.155));
        assert_eq!(
            table.published_at(),
            Utc.timestamp_opt(1714608001, 0).single()
        );
        assert!(table.fetched_at() <= Utc::now());
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = create_mock_server("BRL", ResponseTemplate::new(500)).await;

        let result = provider(&server).fetch_rates("BRL").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Rate service error: HTTP 500 Internal Server Error for base: BRL"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"base": "BRL", "conversion_rates": {"USD": 0.2}}"#;
        let server = create_mock_server(
            "BRL",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let result = provider(&server).fetch_rates("BRL").await;
        let err = result.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
        assert!(err.to_string().contains("invalid JSON for BRL"));
    }

    #[tokio::test]
    async fn test_non_positive_rate_is_rejected() {
        let mock_response = r#"{"rates": {"USD": 0.2, "EUR": 0}}"#;
        let server = create_mock_server(
            "BRL",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let result = provider(&server).fetch_rates("BRL").await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let server = create_mock_server(
            "BRL",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"rates": {}}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&server.uri(), Duration::from_millis(50));
        let result = provider.fetch_rates("BRL").await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/BRL"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/BRL"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"rates": {"USD": 0.2}}"#),
            )
            .mount(&server)
            .await;

        let provider = provider(&server).with_retries(1, 1);
        let table = provider.fetch_rates("BRL").await.unwrap();
        assert_eq!(table.rate("USD"), Some(0.2));
    }
}
