use super::util::{RetryPolicy, with_retry};
use crate::core::config::SteamProviderConfig;
use crate::core::{PriceProvider, ResolvedPrice, UnavailableReason};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// The market rejects requests carrying default HTTP client signatures.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(StatusCode),
    #[error("malformed response body: {0}")]
    Body(#[source] serde_json::Error),
    #[error("market does not know this item")]
    InvalidName,
    #[error("no active listings")]
    NoListings,
    #[error("unparseable price: {0:?}")]
    Price(String),
}

impl FetchError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_) | FetchError::Status(_) | FetchError::Body(_)
        )
    }

    fn reason(&self) -> UnavailableReason {
        match self {
            FetchError::InvalidName => UnavailableReason::InvalidName,
            FetchError::NoListings => UnavailableReason::NoListings,
            FetchError::Transport(_)
            | FetchError::Status(_)
            | FetchError::Body(_)
            | FetchError::Price(_) => UnavailableReason::ConnectionError,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceOverviewResponse {
    #[serde(default)]
    success: bool,
    lowest_price: Option<String>,
}

/// Normalizes a market price string such as `"1 234,56 zł"` or `"$3.10"`
/// into a decimal. Returns `None` when nothing numeric is left.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let kept: String = raw
        .replace("--", "00")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.'))
        .collect();
    let trimmed = kept.trim_matches(|c: char| !c.is_ascii_digit());

    // The separator that comes last is the decimal one.
    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };
    Decimal::from_str(&normalized).ok()
}

/// Price lookups against the Steam Community Market `priceoverview` endpoint.
pub struct SteamMarketProvider {
    client: reqwest::Client,
    endpoint: String,
    country: String,
    currency: u32,
    app_id: u32,
    retry: RetryPolicy,
}

impl SteamMarketProvider {
    pub fn new(config: &SteamProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(SteamMarketProvider {
            client,
            endpoint: format!(
                "{}/market/priceoverview/",
                config.base_url.trim_end_matches('/')
            ),
            country: config.country.clone(),
            currency: config.currency,
            app_id: config.app_id,
            retry: RetryPolicy::new(
                config.retries,
                Duration::from_millis(config.retry_delay_ms),
            ),
        })
    }

    fn url_for(&self, item_name: &str) -> Result<Url> {
        let params = [
            ("country", self.country.clone()),
            ("currency", self.currency.to_string()),
            ("appid", self.app_id.to_string()),
            ("market_hash_name", item_name.to_string()),
        ];
        Url::parse_with_params(&self.endpoint, &params)
            .with_context(|| format!("Invalid market endpoint: {}", self.endpoint))
    }

    async fn request(&self, url: &Url) -> Result<PriceOverviewResponse, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(FetchError::Body)
    }

    async fn lookup(&self, url: &Url) -> Result<Decimal, FetchError> {
        let overview =
            with_retry(|| self.request(url), &self.retry, FetchError::is_transient).await?;

        if !overview.success {
            return Err(FetchError::InvalidName);
        }
        let raw = overview
            .lowest_price
            .filter(|p| !p.trim().is_empty())
            .ok_or(FetchError::NoListings)?;
        parse_price(&raw).ok_or(FetchError::Price(raw))
    }
}

#[async_trait]
impl PriceProvider for SteamMarketProvider {
    #[instrument(
        name = "SteamPriceFetch",
        skip(self),
        fields(item = %item_name)
    )]
    async fn fetch_price(&self, item_name: &str) -> ResolvedPrice {
        let url = match self.url_for(item_name) {
            Ok(url) => url,
            Err(e) => {
                error!("{e:#}");
                return ResolvedPrice::Unavailable(UnavailableReason::ConnectionError);
            }
        };
        debug!("Requesting price data from {}", url);

        match self.lookup(&url).await {
            Ok(price) => {
                debug!("Resolved {} to {}", item_name, price);
                ResolvedPrice::Value(price)
            }
            Err(e) => {
                debug!("Price lookup failed for {}: {}", item_name, e);
                ResolvedPrice::Unavailable(e.reason())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ITEM: &str = "AK-47 | Redline (Field-Tested)";
    const PRICE_PATH: &str = "/market/priceoverview/";

    fn provider_for(server: &MockServer) -> SteamMarketProvider {
        let config = SteamProviderConfig {
            base_url: server.uri(),
            retry_delay_ms: 1,
            ..SteamProviderConfig::default()
        };
        SteamMarketProvider::new(&config).unwrap()
    }

    async fn mount_body(server: &MockServer, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(PRICE_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("12,34 zł"), Some(dec!(12.34)));
        assert_eq!(parse_price("1\u{a0}234,56 zł"), Some(dec!(1234.56)));
        assert_eq!(parse_price("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_price("7,--€"), Some(dec!(7.00)));
        assert_eq!(parse_price("123,45 pуб."), Some(dec!(123.45)));
        assert_eq!(parse_price("0.03 USD"), Some(dec!(0.03)));
        assert_eq!(parse_price("zł"), None);
        assert_eq!(parse_price("1,2,3"), None);
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PRICE_PATH))
            .and(query_param("country", "PL"))
            .and(query_param("currency", "6"))
            .and(query_param("appid", "730"))
            .and(query_param("market_hash_name", ITEM))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success":true,"lowest_price":"12,34 zł","volume":"1,024","median_price":"12,50 zł"}"#,
            ))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider.fetch_price(ITEM).await;
        assert_eq!(result, ResolvedPrice::Value(dec!(12.34)));

        // The header matcher splits on commas, so compare the raw value.
        let requests = server.received_requests().await.unwrap();
        let user_agent = requests[0]
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok());
        assert_eq!(user_agent, Some(BROWSER_USER_AGENT));
    }

    #[tokio::test]
    async fn test_transient_status_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PRICE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        mount_body(&server, 200, r#"{"success":true,"lowest_price":"12,34 zł"}"#).await;

        let provider = provider_for(&server);
        let result = provider.fetch_price(ITEM).await;

        assert_eq!(result, ResolvedPrice::Value(dec!(12.34)));
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_is_connection_error() {
        let server = MockServer::start().await;
        mount_body(&server, 500, "").await;

        let provider = provider_for(&server);
        let result = provider.fetch_price(ITEM).await;

        assert_eq!(
            result,
            ResolvedPrice::Unavailable(UnavailableReason::ConnectionError)
        );
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_slow_response_times_out_and_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PRICE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success":true,"lowest_price":"12,34 zł"}"#)
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = SteamProviderConfig {
            base_url: server.uri(),
            timeout_secs: 1,
            retry_delay_ms: 1,
            ..SteamProviderConfig::default()
        };
        let provider = SteamMarketProvider::new(&config).unwrap();
        let result = provider.fetch_price(ITEM).await;

        assert_eq!(
            result,
            ResolvedPrice::Unavailable(UnavailableReason::ConnectionError)
        );
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_unsuccessful_body_is_invalid_name() {
        let server = MockServer::start().await;
        mount_body(&server, 200, r#"{"success":false}"#).await;

        let provider = provider_for(&server);
        let result = provider.fetch_price("Not A Real Skin").await;

        assert_eq!(
            result,
            ResolvedPrice::Unavailable(UnavailableReason::InvalidName)
        );
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_missing_lowest_price_is_no_listings() {
        let server = MockServer::start().await;
        mount_body(&server, 200, r#"{"success":true,"volume":"3"}"#).await;

        let provider = provider_for(&server);
        let result = provider.fetch_price(ITEM).await;

        assert_eq!(
            result,
            ResolvedPrice::Unavailable(UnavailableReason::NoListings)
        );
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_unparseable_price_is_not_retried() {
        let server = MockServer::start().await;
        mount_body(&server, 200, r#"{"success":true,"lowest_price":"soon"}"#).await;

        let provider = provider_for(&server);
        let result = provider.fetch_price(ITEM).await;

        assert_eq!(
            result,
            ResolvedPrice::Unavailable(UnavailableReason::ConnectionError)
        );
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_retried() {
        let server = MockServer::start().await;
        mount_body(&server, 200, "null").await;

        let provider = provider_for(&server);
        let result = provider.fetch_price(ITEM).await;

        assert_eq!(
            result,
            ResolvedPrice::Unavailable(UnavailableReason::ConnectionError)
        );
        assert_eq!(request_count(&server).await, 3);
    }
}
