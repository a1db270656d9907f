//! Batched quote fetching from the Binance public ticker.

use crate::error::FeedError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Symbol -> last price.
pub type PriceMap = HashMap<String, f64>;

/// Anything that can quote a batch of symbols in one request.
#[async_trait]
pub trait PriceSource: Send + Sync + 'static {
    async fn fetch_prices(&self, symbols: &[String]) -> Result<PriceMap, FeedError>;
}

/// Binance `ticker/price` client. Unauthenticated and rate-limited.
#[derive(Debug, Clone)]
pub struct BinanceTicker {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceTicker {
    pub const BASE_URL: &'static str = "https://api.binance.com";

    pub fn new() -> Result<Self, FeedError> {
        Self::with_base_url(Self::BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, symbols: &[String]) -> Result<reqwest::RequestBuilder, FeedError> {
        let symbols_param = serde_json::to_string(symbols)?;
        Ok(self
            .http
            .get(format!("{}/api/v3/ticker/price", self.base_url))
            .query(&[("symbols", symbols_param)]))
    }
}

#[async_trait]
impl PriceSource for BinanceTicker {
    async fn fetch_prices(&self, symbols: &[String]) -> Result<PriceMap, FeedError> {
        if symbols.is_empty() {
            return Ok(PriceMap::new());
        }
        debug!("Binance: Fetching {} prices", symbols.len());

        let response = self.request(symbols)?.send().await?;
        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 418 {
            return Err(FeedError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(FeedError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        parse_ticker_response(&body)
    }
}

/// Parse `[{"symbol":"BTCUSDT","price":"65000.50"}, ...]`.
/// Entries with a missing or unparsable price are skipped.
pub fn parse_ticker_response(body: &str) -> Result<PriceMap, FeedError> {
    let json: serde_json::Value = serde_json::from_str(body)?;
    let tickers = json
        .as_array()
        .ok_or_else(|| FeedError::ParseError("Expected ticker array".to_string()))?;

    let mut prices = PriceMap::with_capacity(tickers.len());
    for ticker in tickers {
        let Some(symbol) = ticker["symbol"].as_str() else {
            continue;
        };
        let price = match &ticker["price"] {
            serde_json::Value::String(s) => s.parse::<f64>().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        };
        if let Some(price) = price {
            prices.insert(symbol.to_string(), price);
        }
    }

    Ok(prices)
}
