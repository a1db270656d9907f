//! Gateway operations consumed by the client state layer.

use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use signaldesk_core::{
    Admin, CachedPrice, Event, EventStatus, EventSubscription, EventType, NewSignal,
    NotifyChannels, RiskLevel, Signal, SignalSubscription, SignalUpdate,
};

/// Filters for the active signals list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignalFilter {
    /// Only signals published by this admin (platform user id).
    pub admin_telegram_id: Option<i64>,
    pub risk: Option<RiskLevel>,
}

/// Filters for the events list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventQuery {
    pub status: Option<EventStatus>,
    pub event_type: Option<EventType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn with_status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Typed access to the hosted tables.
///
/// Every call may fail; "no rows" is mapped to absence by the lookups that expect it.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_admins(&self) -> Result<Vec<Admin>, GatewayError>;

    async fn get_active_signals(&self, filter: &SignalFilter) -> Result<Vec<Signal>, GatewayError>;

    async fn check_whitelist(&self, telegram_id: i64) -> Result<bool, GatewayError>;

    /// Active admin row for this user, if any.
    async fn check_admin(&self, telegram_id: i64) -> Result<Option<Admin>, GatewayError>;

    async fn create_signal(&self, signal: &NewSignal) -> Result<Signal, GatewayError>;

    async fn update_signal(&self, signal_id: &str, update: &SignalUpdate) -> Result<Signal, GatewayError>;

    /// Status change to `closed`.
    async fn close_signal(&self, signal_id: &str) -> Result<(), GatewayError>;

    /// Soft delete: status change to `cancelled`.
    async fn cancel_signal(&self, signal_id: &str) -> Result<(), GatewayError>;

    /// Upsert on (signal_id, telegram_id), re-activating a soft-deleted row.
    async fn subscribe_to_signal(
        &self,
        signal_id: &str,
        telegram_id: i64,
        channels: NotifyChannels,
    ) -> Result<SignalSubscription, GatewayError>;

    /// Soft unsubscribe: clears the active flag.
    async fn unsubscribe_from_signal(&self, signal_id: &str, telegram_id: i64) -> Result<(), GatewayError>;

    async fn is_subscribed(&self, signal_id: &str, telegram_id: i64) -> Result<bool, GatewayError>;

    /// Ids of signals with an active subscription for this user.
    async fn get_user_subscriptions(&self, telegram_id: i64) -> Result<Vec<String>, GatewayError>;

    async fn get_subscription_count(&self, signal_id: &str) -> Result<u64, GatewayError>;

    async fn get_current_price(&self, symbol: &str) -> Result<Option<CachedPrice>, GatewayError>;

    async fn get_prices(&self, symbols: &[String]) -> Result<Vec<CachedPrice>, GatewayError>;

    async fn get_upcoming_events(&self) -> Result<Vec<Event>, GatewayError>;

    async fn get_today_events(&self) -> Result<Vec<Event>, GatewayError>;

    async fn get_events(&self, query: &EventQuery) -> Result<Vec<Event>, GatewayError>;

    async fn subscribe_to_event(&self, event_id: &str, telegram_id: i64) -> Result<EventSubscription, GatewayError>;

    async fn unsubscribe_from_event(&self, event_id: &str, telegram_id: i64) -> Result<(), GatewayError>;

    /// Ids of events with an active subscription for this user.
    async fn get_event_subscriptions(&self, telegram_id: i64) -> Result<Vec<String>, GatewayError>;
}
