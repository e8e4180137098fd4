use super::util::with_rate_limit_backoff;
use crate::core::config::AppConfig;
use crate::core::rates::RawPayload;
use crate::core::source::{FetchOutcome, RateDate, RateSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Daily rate tables from the jsDelivr-hosted currency API, laid out as
/// `{base_url}@{date}/v1/currencies/{base}.json`.
pub struct CurrencyApiProvider {
    base_url: String,
    base: String,
    client: reqwest::Client,
    rate_limit_retries: usize,
    backoff: Duration,
}

impl CurrencyApiProvider {
    pub fn new(base_url: &str, base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxseed/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(CurrencyApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            base: base.to_lowercase(),
            client,
            rate_limit_retries: 0,
            backoff: DEFAULT_BACKOFF,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(
            Self::new(&config.source.base_url, &config.base, config.source.timeout())?
                .with_rate_limit_retries(config.source.rate_limit_retries, DEFAULT_BACKOFF),
        )
    }

    pub fn with_rate_limit_retries(mut self, retries: usize, backoff: Duration) -> Self {
        self.rate_limit_retries = retries;
        self.backoff = backoff;
        self
    }

    fn url(&self, date: RateDate) -> String {
        format!(
            "{}@{}/v1/currencies/{}.json",
            self.base_url, date, self.base
        )
    }
}

#[async_trait]
impl RateSource for CurrencyApiProvider {
    #[instrument(name = "CurrencyApiFetch", skip(self), fields(date = %date))]
    async fn fetch(&self, date: RateDate) -> FetchOutcome {
        let url = self.url(date);
        debug!("Requesting rates from {}", url);

        let response = match with_rate_limit_backoff(
            || self.client.get(&url).send(),
            self.rate_limit_retries,
            self.backoff,
        )
        .await
        {
            Ok(response) => response,
            Err(e) => return FetchOutcome::TransientError(format!("Request error: {e}")),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return FetchOutcome::NotAvailable;
        }
        if !status.is_success() {
            return FetchOutcome::TransientError(format!("HTTP error: {status}"));
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return FetchOutcome::TransientError(format!("Failed to read response: {e}"));
            }
        };

        match serde_json::from_str::<RawPayload>(&text) {
            Ok(payload) => FetchOutcome::Payload(payload),
            Err(e) => FetchOutcome::TransientError(format!("Failed to parse JSON response: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_JSON: &str = r#"{
        "date": "2024-06-01",
        "krw": {
            "usd": 0.00072,
            "eur": 0.00066,
            "jpy": 0
        }
    }"#;

    fn june_first() -> RateDate {
        RateDate::Day(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    async fn create_mock_server(
        date: &str,
        template: ResponseTemplate,
    ) -> (MockServer, CurrencyApiProvider) {
        let mock_server = MockServer::start().await;
        let request_path = format!("/npm/currency-api@{date}/v1/currencies/krw.json");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        let base_url = format!("{}/npm/currency-api", mock_server.uri());
        let provider = CurrencyApiProvider::new(&base_url, "KRW", Duration::from_secs(5)).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_successful_fetch() {
        let (_server, provider) = create_mock_server(
            "2024-06-01",
            ResponseTemplate::new(200).set_body_string(MOCK_JSON),
        )
        .await;

        match provider.fetch(june_first()).await {
            FetchOutcome::Payload(payload) => {
                assert_eq!(payload["date"], json!("2024-06-01"));
                assert_eq!(payload["krw"]["usd"], json!(0.00072));
            }
            other => panic!("Expected a payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_latest_alias_path() {
        let (_server, provider) = create_mock_server(
            "latest",
            ResponseTemplate::new(200).set_body_string(MOCK_JSON),
        )
        .await;

        assert!(matches!(
            provider.fetch(RateDate::Latest).await,
            FetchOutcome::Payload(_)
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_not_available() {
        let (_server, provider) =
            create_mock_server("2024-06-01", ResponseTemplate::new(404)).await;

        assert_eq!(provider.fetch(june_first()).await, FetchOutcome::NotAvailable);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let (_server, provider) =
            create_mock_server("2024-06-01", ResponseTemplate::new(500)).await;

        assert_eq!(
            provider.fetch(june_first()).await,
            FetchOutcome::TransientError("HTTP error: 500 Internal Server Error".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_transient() {
        let (_server, provider) = create_mock_server(
            "2024-06-01",
            ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
        )
        .await;

        match provider.fetch(june_first()).await {
            FetchOutcome::TransientError(reason) => {
                assert!(reason.contains("Failed to parse JSON response"))
            }
            other => panic!("Expected a transient error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(MOCK_JSON)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let base_url = format!("{}/npm/currency-api", mock_server.uri());
        let provider =
            CurrencyApiProvider::new(&base_url, "KRW", Duration::from_millis(50)).unwrap();

        assert!(matches!(
            provider.fetch(june_first()).await,
            FetchOutcome::TransientError(_)
        ));
    }

    #[tokio::test]
    async fn test_rate_limited_request_is_retried() {
        let mock_server = MockServer::start().await;
        let request_path = "/npm/currency-api@2024-06-01/v1/currencies/krw.json";
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_JSON))
            .mount(&mock_server)
            .await;

        let base_url = format!("{}/npm/currency-api", mock_server.uri());
        let provider = CurrencyApiProvider::new(&base_url, "KRW", Duration::from_secs(5))
            .unwrap()
            .with_rate_limit_retries(2, Duration::from_millis(1));

        assert!(matches!(
            provider.fetch(june_first()).await,
            FetchOutcome::Payload(_)
        ));
    }
}
