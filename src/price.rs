//! ETH/USD Price Service
//!
//! Fetches the spot price from a public feed and keeps it in an injected
//! [`PriceCache`]. Lookups consult the cache first; a failed fetch degrades
//! to the last cached value, then to a fixed fallback. Price lookups never
//! return an error.

use crate::cache::PriceCache;
use crate::config::PriceConfig;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Price used when the feed fails and nothing has been cached
pub const FALLBACK_ETH_USD: f64 = 3000.0;

/// Longest refresh interval honoured; larger settings are capped
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

fn capped_interval_secs(secs: u64) -> u64 {
    secs.min(MAX_REFRESH_INTERVAL_SECS)
}

/// Upstream spot price source
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_eth_usd(&self) -> Result<f64, PriceError>;
}

/// CoinGecko `simple/price` feed
pub struct CoinGeckoFeed {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    ethereum: Option<UsdQuote>,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    usd: Option<f64>,
}

impl CoinGeckoFeed {
    pub fn new(url: impl Into<String>) -> Result<Self, PriceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn parse(body: SimplePrice) -> Result<f64, PriceError> {
        let price = body
            .ethereum
            .and_then(|q| q.usd)
            .ok_or(PriceError::MissingPrice)?;

        if !price.is_finite() || price <= 0.0 {
            return Err(PriceError::InvalidPrice(price));
        }
        Ok(price)
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn fetch_eth_usd(&self) -> Result<f64, PriceError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                PriceError::Timeout
            } else {
                PriceError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Http(status.as_u16()));
        }

        let body: SimplePrice = response.json().await?;
        Self::parse(body)
    }
}

/// Where a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Cached and younger than the refresh interval
    Cache,
    /// Fetched just now
    Live,
    /// Feed failed; last cached value
    Stale,
    /// Feed failed and nothing cached
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub price_usd: f64,
    pub source: PriceSource,
}

/// Cache-first ETH/USD lookups
pub struct PriceService {
    feed: Arc<dyn PriceFeed>,
    cache: Arc<PriceCache>,
    max_age: Duration,
    fallback_usd: f64,
}

impl PriceService {
    pub fn new(feed: Arc<dyn PriceFeed>, cache: Arc<PriceCache>, config: &PriceConfig) -> Self {
        Self {
            feed,
            cache,
            max_age: max_age(config.refresh_interval_secs),
            fallback_usd: config.fallback_usd,
        }
    }

    /// Service backed by CoinGecko at `config.url`
    pub fn from_config(config: &PriceConfig, cache: Arc<PriceCache>) -> Result<Self, PriceError> {
        let feed = CoinGeckoFeed::new(config.url.clone())?;
        Ok(Self::new(Arc::new(feed), cache, config))
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// How long a cached price counts as fresh
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Current price, from cache when fresh
    pub async fn eth_usd(&self) -> PriceQuote {
        if let Some(cached) = self.cache.fresh(self.max_age, Utc::now()) {
            return PriceQuote {
                price_usd: cached.price_usd,
                source: PriceSource::Cache,
            };
        }
        self.refresh().await
    }

    /// Fetch from the feed regardless of cache age
    pub async fn refresh(&self) -> PriceQuote {
        match self.feed.fetch_eth_usd().await {
            Ok(price_usd) => {
                self.cache.store(price_usd, Utc::now());
                tracing::debug!(price_usd, "ETH price refreshed");
                PriceQuote {
                    price_usd,
                    source: PriceSource::Live,
                }
            }
            Err(e) => match self.cache.get() {
                Some(cached) => {
                    tracing::warn!(error = %e, price_usd = cached.price_usd, "Price fetch failed, using cached value");
                    PriceQuote {
                        price_usd: cached.price_usd,
                        source: PriceSource::Stale,
                    }
                }
                None => {
                    tracing::warn!(error = %e, price_usd = self.fallback_usd, "Price fetch failed, using fallback");
                    PriceQuote {
                        price_usd: self.fallback_usd,
                        source: PriceSource::Fallback,
                    }
                }
            },
        }
    }

    /// Start background refresh task
    ///
    /// The returned handle belongs to the application context, which aborts
    /// it on shutdown.
    pub fn start_background_refresh(
        self: Arc<Self>,
        interval_secs: u64,
    ) -> tokio::task::JoinHandle<()> {
        let interval_secs = capped_interval_secs(interval_secs).max(1);
        tracing::info!(interval_secs, "Starting ETH price refresh");

        tokio::spawn(async move {
            let interval = std::time::Duration::from_secs(interval_secs);
            let mut ticker = tokio::time::interval(interval);

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let quote = self.refresh().await;
                tracing::debug!(price_usd = quote.price_usd, source = ?quote.source, "Scheduled price refresh");
            }
        })
    }
}

fn max_age(interval_secs: u64) -> Duration {
    i64::try_from(capped_interval_secs(interval_secs))
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::seconds(MAX_REFRESH_INTERVAL_SECS as i64))
}

/// Errors from the upstream price feed
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("Price feed returned HTTP {0}")]
    Http(u16),

    #[error("Price missing from response")]
    MissingPrice,

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
}
