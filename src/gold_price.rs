use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Grams per troy ounce, used to convert the upstream per-ounce quote.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// How long a fetched price stays fresh before a refresh is attempted.
pub const PRICE_TTL: Duration = Duration::from_secs(15 * 60);

/// Last successfully fetched price. Process-lifetime only; the cache is
/// cold after a restart.
#[derive(Debug, Clone)]
struct CachedPrice {
    price_per_gram: f64,
    fetched_at: DateTime<Utc>,
}

/// A resolved gold quote. `price_per_ounce` is only present on a live
/// refresh; `stale` is only serialized when the value outlived its
/// freshness window.
#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub price_per_gram: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_ounce: Option<f64>,
    pub cached: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    items: Vec<SpotItem>,
}

#[derive(Debug, Deserialize)]
struct SpotItem {
    #[serde(rename = "xauPrice")]
    xau_price: f64,
}

/// Client for the upstream gold quote source, holding the in-process
/// price cache. Constructed once and shared through application state.
pub struct GoldPriceClient {
    http: reqwest::Client,
    base_url: String,
    ttl: Duration,
    cache: Mutex<Option<CachedPrice>>,
}

impl GoldPriceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_ttl(base_url, PRICE_TTL)
    }

    /// Same as [`GoldPriceClient::new`] with an explicit freshness window,
    /// so expiry behavior is deterministic under test.
    pub fn with_ttl(base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Resolve the current per-gram gold price.
    ///
    /// Serves the cached value while fresh, refreshes from the quote
    /// source otherwise, and falls back to the stale cached value when the
    /// refresh fails. Errors only when the refresh fails with an empty
    /// cache; callers then have to accept manual entry.
    pub async fn current_price(&self) -> Result<PriceQuote> {
        let last_good = self.cache.lock().await.clone();

        if let Some(cached) = &last_good {
            let age = Utc::now().signed_duration_since(cached.fetched_at);
            if age.to_std().map_or(true, |age| age < self.ttl) {
                debug!(price_per_gram = cached.price_per_gram, "gold price cache hit");
                return Ok(PriceQuote {
                    price_per_gram: cached.price_per_gram,
                    price_per_ounce: None,
                    cached: true,
                    stale: false,
                    updated_at: cached.fetched_at,
                });
            }
        }

        // The lock is not held across the fetch, so two requests racing an
        // expired cache may both refresh. Harmless beyond the extra call.
        match self.fetch_spot().await {
            Ok(price_per_ounce) => {
                let price_per_gram = price_per_ounce / GRAMS_PER_TROY_OUNCE;
                let fetched_at = Utc::now();
                *self.cache.lock().await = Some(CachedPrice {
                    price_per_gram,
                    fetched_at,
                });

                Ok(PriceQuote {
                    price_per_gram,
                    price_per_ounce: Some(price_per_ounce),
                    cached: false,
                    stale: false,
                    updated_at: fetched_at,
                })
            }
            Err(err) => match last_good {
                Some(cached) => {
                    warn!(error = %err, "gold price refresh failed, serving stale cache");
                    Ok(PriceQuote {
                        price_per_gram: cached.price_per_gram,
                        price_per_ounce: None,
                        cached: true,
                        stale: true,
                        updated_at: cached.fetched_at,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Fetch the spot price per troy ounce. Any deviation from the
    /// expected response shape counts as a fetch failure.
    async fn fetch_spot(&self) -> Result<f64> {
        let url = format!("{}/dbXRates/USD", self.base_url);
        debug!("Requesting spot gold price from {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Gold price request failed: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Gold price source returned HTTP {}",
                response.status()
            ));
        }

        let body: SpotResponse = response
            .json()
            .await
            .context("Malformed gold price response")?;

        let price_per_ounce = body
            .items
            .first()
            .map(|item| item.xau_price)
            .ok_or_else(|| anyhow!("Gold price response contained no items"))?;

        if price_per_ounce <= 0.0 {
            return Err(anyhow!("Gold price source returned a non-positive quote"));
        }

        Ok(price_per_ounce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_spot_server(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dbXRates/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_converts_ounces_to_grams() {
        let server =
            mock_spot_server(r#"{"items": [{"curr": "USD", "xauPrice": 2000.0}]}"#).await;
        let client = GoldPriceClient::new(server.uri());

        let quote = client.current_price().await.unwrap();

        assert!((quote.price_per_gram - 2000.0 / GRAMS_PER_TROY_OUNCE).abs() < 1e-9);
        assert_eq!(quote.price_per_ounce, Some(2000.0));
        assert!(!quote.cached);
        assert!(!quote.stale);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dbXRates/USD"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"items": [{"xauPrice": 1900.0}]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = GoldPriceClient::new(server.uri());

        let first = client.current_price().await.unwrap();
        let second = client.current_price().await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert!(!second.stale);
        assert_eq!(first.price_per_gram, second.price_per_gram);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn test_expired_cache_refreshes() {
        let server =
            mock_spot_server(r#"{"items": [{"xauPrice": 1800.0}]}"#).await;
        let client = GoldPriceClient::with_ttl(server.uri(), Duration::ZERO);

        let first = client.current_price().await.unwrap();
        let second = client.current_price().await.unwrap();

        assert!(!first.cached);
        assert!(!second.cached);
    }

    #[tokio::test]
    async fn test_stale_fallback_after_refresh_failure() {
        let server =
            mock_spot_server(r#"{"items": [{"xauPrice": 2100.0}]}"#).await;
        // Zero TTL forces a refresh attempt on every request.
        let client = GoldPriceClient::with_ttl(server.uri(), Duration::ZERO);

        let first = client.current_price().await.unwrap();

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/dbXRates/USD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fallback = client.current_price().await.unwrap();

        assert!(fallback.cached);
        assert!(fallback.stale);
        assert_eq!(fallback.price_per_gram, first.price_per_gram);
        assert_eq!(fallback.updated_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_cold_cache_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dbXRates/USD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = GoldPriceClient::new(server.uri());
        assert!(client.current_price().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_items_is_a_fetch_failure() {
        let server = mock_spot_server(r#"{"items": []}"#).await;
        let client = GoldPriceClient::new(server.uri());

        assert!(client.current_price().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_price_field_is_a_fetch_failure() {
        let server = mock_spot_server(r#"{"items": [{"curr": "USD"}]}"#).await;
        let client = GoldPriceClient::new(server.uri());

        assert!(client.current_price().await.is_err());
    }

    #[tokio::test]
    async fn test_zero_quote_is_a_fetch_failure() {
        let server = mock_spot_server(r#"{"items": [{"xauPrice": 0.0}]}"#).await;
        let client = GoldPriceClient::new(server.uri());

        assert!(client.current_price().await.is_err());
    }

    #[tokio::test]
    async fn test_stale_flag_is_skipped_when_fresh() {
        let server =
            mock_spot_server(r#"{"items": [{"xauPrice": 2000.0}]}"#).await;
        let client = GoldPriceClient::new(server.uri());

        let quote = client.current_price().await.unwrap();
        let json = serde_json::to_value(&quote).unwrap();

        assert!(json.get("stale").is_none());
        assert!(json.get("price_per_ounce").is_some());
    }
}
