//! Interval polling of quotes for a changing symbol set.

use crate::ticker::{PriceMap, PriceSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Polls a `PriceSource` for the current symbol set and publishes the latest map.
///
/// Changing the symbol set aborts the running poll task and starts a new one.
/// A failed tick is logged and the previously published map is kept.
pub struct PricePoller {
    source: Arc<dyn PriceSource>,
    interval: Duration,
    tx: watch::Sender<PriceMap>,
    symbols: Vec<String>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PricePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricePoller")
            .field("interval", &self.interval)
            .field("symbols", &self.symbols)
            .field("running", &self.is_running())
            .finish()
    }
}

impl PricePoller {
    pub fn new(source: Arc<dyn PriceSource>, interval: Duration) -> Self {
        let (tx, _) = watch::channel(PriceMap::new());
        Self {
            source,
            interval,
            tx,
            symbols: Vec::new(),
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PriceMap> {
        self.tx.subscribe()
    }

    /// Snapshot of the latest published prices.
    pub fn prices(&self) -> PriceMap {
        self.tx.borrow().clone()
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.tx.borrow().get(symbol).copied()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Replace the polled symbol set. Returns false when the set is unchanged.
    /// Must be called from within a tokio runtime.
    pub fn set_symbols<I, S>(&mut self, symbols: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next: Vec<String> = symbols.into_iter().map(Into::into).collect();
        next.sort();
        next.dedup();

        if next == self.symbols && (next.is_empty() || self.is_running()) {
            return false;
        }

        self.stop();
        self.symbols = next;

        if self.symbols.is_empty() {
            debug!("No symbols to poll");
            return true;
        }

        debug!(symbols = ?self.symbols, interval = ?self.interval, "Starting price polling");
        self.task = Some(tokio::spawn(run_poll_loop(
            Arc::clone(&self.source),
            self.symbols.clone(),
            self.interval,
            self.tx.clone(),
        )));
        true
    }

    /// Stop polling. Published prices are kept.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PricePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll_loop(
    source: Arc<dyn PriceSource>,
    symbols: Vec<String>,
    period: Duration,
    tx: watch::Sender<PriceMap>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match source.fetch_prices(&symbols).await {
            Ok(prices) => {
                debug!(quoted = prices.len(), requested = symbols.len(), "Prices updated");
                tx.send_replace(prices);
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Failed to fetch prices, keeping previous quotes");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records each request.
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<PriceMap, FeedError>>>,
        requests: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedSource {
        fn push_ok(&self, pairs: &[(&str, f64)]) {
            let map = pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect();
            self.responses.lock().unwrap().push_back(Ok(map));
        }

        fn push_err(&self) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(FeedError::HttpStatus(502)));
        }

        fn requests(&self) -> Vec<Vec<String>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceSource for ScriptedSource {
        async fn fetch_prices(&self, symbols: &[String]) -> Result<PriceMap, FeedError> {
            self.requests.lock().unwrap().push(symbols.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PriceMap::new()))
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_batched_request_populates_map() {
        let source = Arc::new(ScriptedSource::default());
        source.push_ok(&[("BTCUSDT", 65000.5)]);

        let mut poller = PricePoller::new(source.clone(), DEFAULT_POLL_INTERVAL);
        assert!(poller.set_symbols(["BTCUSDT", "ETHUSDT"]));
        settle().await;

        assert_eq!(
            source.requests(),
            vec![vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]]
        );
        assert_eq!(poller.price("BTCUSDT"), Some(65000.5));
        assert_eq!(poller.price("ETHUSDT"), None);

        source.push_ok(&[("BTCUSDT", 65010.0), ("ETHUSDT", 3100.0)]);
        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert_eq!(poller.price("ETHUSDT"), Some(3100.0));
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_previous_prices() {
        let source = Arc::new(ScriptedSource::default());
        source.push_ok(&[("BTCUSDT", 65000.5)]);
        source.push_err();

        let mut poller = PricePoller::new(source.clone(), Duration::from_secs(10));
        poller.set_symbols(["BTCUSDT"]);
        settle().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(source.requests().len(), 2);
        assert_eq!(poller.price("BTCUSDT"), Some(65000.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_symbol_change_restarts_polling() {
        let source = Arc::new(ScriptedSource::default());
        let mut poller = PricePoller::new(source.clone(), Duration::from_secs(10));

        assert!(poller.set_symbols(["BTCUSDT", "BTCUSDT"]));
        settle().await;
        assert!(!poller.set_symbols(["BTCUSDT"]));
        assert_eq!(source.requests().len(), 1);

        assert!(poller.set_symbols(["SOLUSDT"]));
        settle().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        let requests = source.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1..].iter().all(|r| r == &vec!["SOLUSDT".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_set_does_not_poll() {
        let source = Arc::new(ScriptedSource::default());
        let mut poller = PricePoller::new(source.clone(), Duration::from_secs(10));

        assert!(!poller.set_symbols(Vec::<String>::new()));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(source.requests().is_empty());
        assert!(!poller.is_running());
    }
}
