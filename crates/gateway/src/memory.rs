//! In-process backend with the same mutation semantics as the hosted tables.
//!
//! Used by demo mode and as the test double for the client state layer.

use crate::backend::{Backend, EventQuery, SignalFilter};
use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use compact_str::CompactString;
use signaldesk_core::{
    Admin, CachedPrice, Direction, Entry, Event, EventStatus, EventSubscription, EventType,
    Impact, NewSignal, NotifyChannels, RiskLevel, Signal, SignalStatus, SignalSubscription,
    SignalUpdate, Target, WhitelistEntry,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    admins: Vec<Admin>,
    whitelist: Vec<WhitelistEntry>,
    signals: Vec<Signal>,
    events: Vec<Event>,
    signal_subscriptions: HashMap<(String, i64), SignalSubscription>,
    event_subscriptions: HashMap<(String, i64), EventSubscription>,
    prices: HashMap<String, CachedPrice>,
}

/// Backend holding every table in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    failing: AtomicBool,
    latency_ms: AtomicU64,
    requests: AtomicU64,
    next_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a 503 until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay applied to every call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of calls served so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub async fn add_admin(&self, admin: Admin) {
        self.tables.write().await.admins.push(admin);
    }

    pub async fn add_whitelist(&self, telegram_id: i64, is_active: bool) {
        self.tables.write().await.whitelist.push(WhitelistEntry {
            telegram_id,
            is_active,
        });
    }

    pub async fn add_signal(&self, signal: Signal) {
        self.tables.write().await.signals.push(signal);
    }

    pub async fn add_event(&self, event: Event) {
        self.tables.write().await.events.push(event);
    }

    pub async fn set_cached_price(&self, symbol: &str, price: f64) {
        self.tables.write().await.prices.insert(
            symbol.to_string(),
            CachedPrice {
                symbol: Some(symbol.to_string()),
                price,
                updated_at: Utc::now(),
            },
        );
    }

    pub async fn signal(&self, signal_id: &str) -> Option<Signal> {
        self.tables
            .read()
            .await
            .signals
            .iter()
            .find(|s| s.id == signal_id)
            .cloned()
    }

    pub async fn signal_subscription(&self, signal_id: &str, telegram_id: i64) -> Option<SignalSubscription> {
        self.tables
            .read()
            .await
            .signal_subscriptions
            .get(&(signal_id.to_string(), telegram_id))
            .cloned()
    }

    pub async fn signal_subscription_rows(&self) -> usize {
        self.tables.read().await.signal_subscriptions.len()
    }

    async fn begin(&self) -> Result<(), GatewayError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                code: String::new(),
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn allocate_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1000)
    }

    async fn set_signal_status(&self, signal_id: &str, status: SignalStatus) -> Result<(), GatewayError> {
        self.begin().await?;
        let mut tables = self.tables.write().await;
        if let Some(signal) = tables.signals.iter_mut().find(|s| s.id == signal_id) {
            signal.status = status;
            signal.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Seeded dataset for demo mode; `admin_telegram_id` becomes a super admin.
    pub async fn demo(admin_telegram_id: i64) -> Self {
        let backend = Self::new();
        let now = Utc::now();

        backend
            .add_admin(Admin {
                id: "admin-1".to_string(),
                telegram_id: admin_telegram_id,
                username: Some("desk".to_string()),
                display_name: "Desk".to_string(),
                is_super_admin: true,
                is_active: true,
            })
            .await;
        backend
            .add_admin(Admin {
                id: "admin-2".to_string(),
                telegram_id: admin_telegram_id + 1,
                username: Some("swing".to_string()),
                display_name: "Swing".to_string(),
                is_super_admin: false,
                is_active: true,
            })
            .await;

        let setups: [(&str, Direction, RiskLevel, &[f64], &[f64], f64, i64, Option<&str>); 4] = [
            ("BTCUSDT", Direction::Long, RiskLevel::Normal, &[64000.0, 62500.0], &[67000.0, 70000.0], 60500.0, admin_telegram_id, Some("4H")),
            ("ETHUSDT", Direction::Long, RiskLevel::Low, &[3100.0], &[3300.0, 3500.0, 3800.0], 2950.0, admin_telegram_id, None),
            ("SOLUSDT", Direction::Short, RiskLevel::High, &[155.0, 160.0], &[140.0, 130.0], 168.0, admin_telegram_id + 1, Some("1D")),
            ("PEPEUSDT", Direction::Long, RiskLevel::Casino, &[0.0000085], &[0.000012], 0.0000072, admin_telegram_id + 1, None),
        ];

        for (i, (symbol, direction, risk, entries, targets, stop, admin, soft)) in
            setups.into_iter().enumerate()
        {
            let created = now - ChronoDuration::hours(i as i64 * 6);
            let admin_name = if admin == admin_telegram_id { "Desk" } else { "Swing" };
            backend
                .add_signal(Signal {
                    id: format!("signal-{}", i + 1),
                    symbol: CompactString::new(symbol),
                    direction,
                    risk,
                    current_price: None,
                    entries: entries.iter().map(|p| Entry::new(*p)).collect(),
                    targets: targets
                        .iter()
                        .map(|p| Target::new(*p, 100.0 / targets.len() as f64))
                        .collect(),
                    stop_loss: stop,
                    stop_loss_percentage: None,
                    soft_stop_timeframe: soft.map(str::to_string),
                    comment: (i == 0).then(|| "Scale in on the retest".to_string()),
                    status: SignalStatus::Active,
                    admin_name: admin_name.to_string(),
                    admin_telegram_id: Some(admin),
                    created_at: created,
                    updated_at: created,
                })
                .await;
        }

        // Backend price cache, shown until the first live quote arrives.
        backend.set_cached_price("BTCUSDT", 64850.0).await;
        backend.set_cached_price("ETHUSDT", 3150.0).await;

        let calendar = [
            ("FOMC rate decision", EventType::FedRate, Impact::High, 26, None, EventStatus::Upcoming),
            ("US CPI (YoY)", EventType::InflationCpi, Impact::High, 3, None, EventStatus::Upcoming),
            ("Retail sales (MoM)", EventType::RetailSales, Impact::Medium, -20, Some("0.6%"), EventStatus::Completed),
            ("Initial jobless claims", EventType::Employment, Impact::Low, -2, Some("229K"), EventStatus::Completed),
        ];

        for (i, (title, event_type, impact, hours, actual, status)) in calendar.into_iter().enumerate() {
            backend
                .add_event(Event {
                    id: format!("event-{}", i + 1),
                    title: title.to_string(),
                    event_type,
                    impact,
                    event_date: now + ChronoDuration::hours(hours),
                    forecast: Some(if i == 3 { "225K" } else { "0.4%" }.to_string()),
                    previous: Some(if i == 3 { "231K" } else { "0.3%" }.to_string()),
                    actual: actual.map(str::to_string),
                    description: None,
                    result_comment: actual.map(|_| "Released against forecast".to_string()),
                    status,
                    admin_name: Some("Desk".to_string()),
                    admins: None,
                })
                .await;
        }

        backend
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_admins(&self) -> Result<Vec<Admin>, GatewayError> {
        self.begin().await?;
        Ok(self.tables.read().await.admins.clone())
    }

    async fn get_active_signals(&self, filter: &SignalFilter) -> Result<Vec<Signal>, GatewayError> {
        self.begin().await?;
        let tables = self.tables.read().await;
        let mut signals: Vec<Signal> = tables
            .signals
            .iter()
            .filter(|s| s.status == SignalStatus::Active)
            .filter(|s| {
                filter
                    .admin_telegram_id
                    .map_or(true, |admin| s.admin_telegram_id == Some(admin))
            })
            .filter(|s| filter.risk.map_or(true, |risk| s.risk == risk))
            .cloned()
            .collect();
        signals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for signal in &mut signals {
            if let Some(cached) = tables.prices.get(signal.symbol.as_str()) {
                signal.current_price = Some(cached.price);
            }
        }
        Ok(signals)
    }

    async fn check_whitelist(&self, telegram_id: i64) -> Result<bool, GatewayError> {
        self.begin().await?;
        Ok(self
            .tables
            .read()
            .await
            .whitelist
            .iter()
            .any(|w| w.telegram_id == telegram_id && w.is_active))
    }

    async fn check_admin(&self, telegram_id: i64) -> Result<Option<Admin>, GatewayError> {
        self.begin().await?;
        Ok(self
            .tables
            .read()
            .await
            .admins
            .iter()
            .find(|a| a.telegram_id == telegram_id && a.is_active)
            .cloned())
    }

    async fn create_signal(&self, new: &NewSignal) -> Result<Signal, GatewayError> {
        self.begin().await?;
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let admin_name = tables
            .admins
            .iter()
            .find(|a| a.telegram_id == new.admin_telegram_id)
            .map(|a| a.display_name.clone())
            .unwrap_or_default();
        let signal = Signal {
            id: self.allocate_id("signal"),
            symbol: new.symbol.clone(),
            direction: new.direction,
            risk: new.risk,
            current_price: None,
            entries: new.entries.clone(),
            targets: new.targets.clone(),
            stop_loss: new.stop_loss,
            stop_loss_percentage: None,
            soft_stop_timeframe: new.soft_stop_timeframe.clone(),
            comment: new.comment.clone(),
            status: SignalStatus::Active,
            admin_name,
            admin_telegram_id: Some(new.admin_telegram_id),
            created_at: now,
            updated_at: now,
        };
        tables.signals.push(signal.clone());
        Ok(signal)
    }

    async fn update_signal(&self, signal_id: &str, update: &SignalUpdate) -> Result<Signal, GatewayError> {
        self.begin().await?;
        let mut tables = self.tables.write().await;
        let signal = tables
            .signals
            .iter_mut()
            .find(|s| s.id == signal_id)
            .ok_or(GatewayError::NotFound)?;
        update.apply_to(signal);
        signal.updated_at = Utc::now();
        Ok(signal.clone())
    }

    async fn close_signal(&self, signal_id: &str) -> Result<(), GatewayError> {
        self.set_signal_status(signal_id, SignalStatus::Closed).await
    }

    async fn cancel_signal(&self, signal_id: &str) -> Result<(), GatewayError> {
        self.set_signal_status(signal_id, SignalStatus::Cancelled).await
    }

    async fn subscribe_to_signal(
        &self,
        signal_id: &str,
        telegram_id: i64,
        channels: NotifyChannels,
    ) -> Result<SignalSubscription, GatewayError> {
        self.begin().await?;
        let row = SignalSubscription::active(signal_id, telegram_id, channels);
        self.tables
            .write()
            .await
            .signal_subscriptions
            .insert((signal_id.to_string(), telegram_id), row.clone());
        Ok(row)
    }

    async fn unsubscribe_from_signal(&self, signal_id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        self.begin().await?;
        if let Some(row) = self
            .tables
            .write()
            .await
            .signal_subscriptions
            .get_mut(&(signal_id.to_string(), telegram_id))
        {
            row.is_active = false;
        }
        Ok(())
    }

    async fn is_subscribed(&self, signal_id: &str, telegram_id: i64) -> Result<bool, GatewayError> {
        self.begin().await?;
        Ok(self
            .tables
            .read()
            .await
            .signal_subscriptions
            .get(&(signal_id.to_string(), telegram_id))
            .is_some_and(|row| row.is_active))
    }

    async fn get_user_subscriptions(&self, telegram_id: i64) -> Result<Vec<String>, GatewayError> {
        self.begin().await?;
        Ok(self
            .tables
            .read()
            .await
            .signal_subscriptions
            .values()
            .filter(|row| row.telegram_id == telegram_id && row.is_active)
            .map(|row| row.signal_id.clone())
            .collect())
    }

    async fn get_subscription_count(&self, signal_id: &str) -> Result<u64, GatewayError> {
        self.begin().await?;
        Ok(self
            .tables
            .read()
            .await
            .signal_subscriptions
            .values()
            .filter(|row| row.signal_id == signal_id && row.is_active)
            .count() as u64)
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Option<CachedPrice>, GatewayError> {
        self.begin().await?;
        Ok(self.tables.read().await.prices.get(symbol).cloned())
    }

    async fn get_prices(&self, symbols: &[String]) -> Result<Vec<CachedPrice>, GatewayError> {
        self.begin().await?;
        let tables = self.tables.read().await;
        Ok(symbols
            .iter()
            .filter_map(|s| tables.prices.get(s).cloned())
            .collect())
    }

    async fn get_upcoming_events(&self) -> Result<Vec<Event>, GatewayError> {
        self.get_events(&EventQuery::with_status(EventStatus::Upcoming))
            .await
    }

    async fn get_today_events(&self) -> Result<Vec<Event>, GatewayError> {
        let today = Utc::now().date_naive();
        let events = self.get_events(&EventQuery::default()).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.event_date.date_naive() == today)
            .collect())
    }

    async fn get_events(&self, query: &EventQuery) -> Result<Vec<Event>, GatewayError> {
        self.begin().await?;
        let mut events: Vec<Event> = self
            .tables
            .read()
            .await
            .events
            .iter()
            .filter(|e| query.status.map_or(true, |s| e.status == s))
            .filter(|e| query.event_type.map_or(true, |t| e.event_type == t))
            .filter(|e| query.from.map_or(true, |from| e.event_date >= from))
            .filter(|e| query.to.map_or(true, |to| e.event_date <= to))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.event_date.cmp(&b.event_date));
        Ok(events)
    }

    async fn subscribe_to_event(&self, event_id: &str, telegram_id: i64) -> Result<EventSubscription, GatewayError> {
        self.begin().await?;
        let row = EventSubscription::active(event_id, telegram_id);
        self.tables
            .write()
            .await
            .event_subscriptions
            .insert((event_id.to_string(), telegram_id), row.clone());
        Ok(row)
    }

    async fn unsubscribe_from_event(&self, event_id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        self.begin().await?;
        if let Some(row) = self
            .tables
            .write()
            .await
            .event_subscriptions
            .get_mut(&(event_id.to_string(), telegram_id))
        {
            row.is_active = false;
        }
        Ok(())
    }

    async fn get_event_subscriptions(&self, telegram_id: i64) -> Result<Vec<String>, GatewayError> {
        self.begin().await?;
        Ok(self
            .tables
            .read()
            .await
            .event_subscriptions
            .values()
            .filter(|row| row.telegram_id == telegram_id && row.is_active)
            .map(|row| row.event_id.clone())
            .collect())
    }
}
