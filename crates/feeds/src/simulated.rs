//! Simulated quotes for demo mode.

use crate::error::FeedError;
use crate::ticker::{PriceMap, PriceSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Oscillates around fixed base prices. Symbols without a base are not quoted.
#[derive(Debug, Default)]
pub struct SimulatedPrices {
    bases: HashMap<String, f64>,
    counter: AtomicU64,
}

impl SimulatedPrices {
    pub fn new(bases: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            bases: bases.into_iter().collect(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn demo() -> Self {
        Self::new([
            ("BTCUSDT".to_string(), 64800.0),
            ("ETHUSDT".to_string(), 3150.0),
            ("SOLUSDT".to_string(), 152.0),
            ("PEPEUSDT".to_string(), 0.0000091),
        ])
    }
}

#[async_trait]
impl PriceSource for SimulatedPrices {
    async fn fetch_prices(&self, symbols: &[String]) -> Result<PriceMap, FeedError> {
        let tick = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(symbols
            .iter()
            .enumerate()
            .filter_map(|(i, symbol)| {
                let base = self.bases.get(symbol)?;
                let drift = 1.0 + ((tick as f64 + i as f64) * 0.7).sin() * 0.01;
                Some((symbol.clone(), base * drift))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_known_symbols_are_quoted() {
        let source = SimulatedPrices::demo();
        let symbols = vec!["BTCUSDT".to_string(), "XYZUSDT".to_string()];
        let prices = source.fetch_prices(&symbols).await.unwrap();
        assert_eq!(prices.len(), 1);
        let btc = prices["BTCUSDT"];
        assert!((btc - 64800.0).abs() <= 64800.0 * 0.01 + 1e-6);
    }
}
