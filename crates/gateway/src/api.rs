//! Typed API over the hosted tables.

use crate::backend::{Backend, EventQuery, SignalFilter};
use crate::client::{GatewayConfig, RestClient};
use crate::error::GatewayError;
use crate::query::Query;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use signaldesk_core::{
    Admin, CachedPrice, Event, EventSubscription, NewSignal, NotifyChannels, Signal,
    SignalStatus, SignalSubscription, SignalUpdate,
};
use tracing::{debug, instrument};

const ADMINS: &str = "admins";
const WHITELIST: &str = "whitelist";
const SIGNALS: &str = "signals";
const ACTIVE_SIGNALS: &str = "active_signals_view";
const SIGNAL_SUBSCRIPTIONS: &str = "signal_subscriptions";
const EVENT_SUBSCRIPTIONS: &str = "event_subscriptions";
const PRICE_CACHE: &str = "price_cache";
const EVENTS: &str = "events";
const UPCOMING_EVENTS: &str = "upcoming_events";
const TODAY_EVENTS: &str = "today_events";

#[derive(Deserialize)]
struct SignalIdRow {
    signal_id: String,
}

#[derive(Deserialize)]
struct EventIdRow {
    event_id: String,
}

#[derive(Serialize)]
struct ActiveFlag {
    is_active: bool,
}

/// Gateway backed by the hosted REST endpoint.
#[derive(Debug, Clone)]
pub struct Api {
    client: RestClient,
}

impl Api {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: RestClient::new(config)?,
        })
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    async fn set_signal_status(&self, signal_id: &str, status: SignalStatus) -> Result<(), GatewayError> {
        let query = Query::from(SIGNALS).eq("id", signal_id);
        self.client
            .update(&query, &SignalUpdate::status(status))
            .await
    }
}

#[async_trait]
impl Backend for Api {
    #[instrument(skip(self))]
    async fn get_admins(&self) -> Result<Vec<Admin>, GatewayError> {
        let query = Query::from(ADMINS).select("*").order("created_at", true);
        self.client.fetch_all(&query).await
    }

    #[instrument(skip(self))]
    async fn get_active_signals(&self, filter: &SignalFilter) -> Result<Vec<Signal>, GatewayError> {
        let mut query = Query::from(ACTIVE_SIGNALS)
            .select("*")
            .order("created_at", false);
        if let Some(admin) = filter.admin_telegram_id {
            query = query.eq("admin_telegram_id", admin);
        }
        if let Some(risk) = filter.risk {
            query = query.eq("risk", risk.as_str());
        }
        let signals: Vec<Signal> = self.client.fetch_all(&query).await?;
        debug!(count = signals.len(), "Fetched active signals");
        Ok(signals)
    }

    #[instrument(skip(self))]
    async fn check_whitelist(&self, telegram_id: i64) -> Result<bool, GatewayError> {
        let query = Query::from(WHITELIST)
            .select("id")
            .eq("telegram_id", telegram_id)
            .eq("is_active", true);
        match self.client.fetch_single::<serde_json::Value>(&query).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn check_admin(&self, telegram_id: i64) -> Result<Option<Admin>, GatewayError> {
        let query = Query::from(ADMINS)
            .select("*")
            .eq("telegram_id", telegram_id)
            .eq("is_active", true);
        self.client.fetch_maybe_single(&query).await
    }

    #[instrument(skip(self, signal), fields(symbol = %signal.symbol))]
    async fn create_signal(&self, signal: &NewSignal) -> Result<Signal, GatewayError> {
        self.client.insert(SIGNALS, signal).await
    }

    #[instrument(skip(self, update))]
    async fn update_signal(&self, signal_id: &str, update: &SignalUpdate) -> Result<Signal, GatewayError> {
        let query = Query::from(SIGNALS).eq("id", signal_id).select("*");
        self.client.update_single(&query, update).await
    }

    #[instrument(skip(self))]
    async fn close_signal(&self, signal_id: &str) -> Result<(), GatewayError> {
        self.set_signal_status(signal_id, SignalStatus::Closed).await
    }

    #[instrument(skip(self))]
    async fn cancel_signal(&self, signal_id: &str) -> Result<(), GatewayError> {
        self.set_signal_status(signal_id, SignalStatus::Cancelled).await
    }

    #[instrument(skip(self))]
    async fn subscribe_to_signal(
        &self,
        signal_id: &str,
        telegram_id: i64,
        channels: NotifyChannels,
    ) -> Result<SignalSubscription, GatewayError> {
        let query = Query::from(SIGNAL_SUBSCRIPTIONS)
            .on_conflict("signal_id,telegram_id")
            .select("*");
        let row = SignalSubscription::active(signal_id, telegram_id, channels);
        self.client.upsert(&query, &row).await
    }

    #[instrument(skip(self))]
    async fn unsubscribe_from_signal(&self, signal_id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        let query = Query::from(SIGNAL_SUBSCRIPTIONS)
            .eq("signal_id", signal_id)
            .eq("telegram_id", telegram_id);
        self.client
            .update(&query, &ActiveFlag { is_active: false })
            .await
    }

    #[instrument(skip(self))]
    async fn is_subscribed(&self, signal_id: &str, telegram_id: i64) -> Result<bool, GatewayError> {
        let query = Query::from(SIGNAL_SUBSCRIPTIONS)
            .select("id")
            .eq("signal_id", signal_id)
            .eq("telegram_id", telegram_id)
            .eq("is_active", true);
        let row: Option<serde_json::Value> = self.client.fetch_maybe_single(&query).await?;
        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn get_user_subscriptions(&self, telegram_id: i64) -> Result<Vec<String>, GatewayError> {
        let query = Query::from(SIGNAL_SUBSCRIPTIONS)
            .select("signal_id")
            .eq("telegram_id", telegram_id)
            .eq("is_active", true);
        let rows: Vec<SignalIdRow> = self.client.fetch_all(&query).await?;
        Ok(rows.into_iter().map(|r| r.signal_id).collect())
    }

    #[instrument(skip(self))]
    async fn get_subscription_count(&self, signal_id: &str) -> Result<u64, GatewayError> {
        let query = Query::from(SIGNAL_SUBSCRIPTIONS)
            .select("id")
            .eq("signal_id", signal_id)
            .eq("is_active", true);
        self.client.count(&query).await
    }

    #[instrument(skip(self))]
    async fn get_current_price(&self, symbol: &str) -> Result<Option<CachedPrice>, GatewayError> {
        let query = Query::from(PRICE_CACHE)
            .select("price,updated_at")
            .eq("symbol", symbol);
        self.client.fetch_maybe_single(&query).await
    }

    #[instrument(skip(self))]
    async fn get_prices(&self, symbols: &[String]) -> Result<Vec<CachedPrice>, GatewayError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::from(PRICE_CACHE)
            .select("symbol,price,updated_at")
            .in_list("symbol", symbols);
        self.client.fetch_all(&query).await
    }

    #[instrument(skip(self))]
    async fn get_upcoming_events(&self) -> Result<Vec<Event>, GatewayError> {
        let query = Query::from(UPCOMING_EVENTS)
            .select("*")
            .order("event_date", true);
        self.client.fetch_all(&query).await
    }

    #[instrument(skip(self))]
    async fn get_today_events(&self) -> Result<Vec<Event>, GatewayError> {
        let query = Query::from(TODAY_EVENTS)
            .select("*")
            .order("event_date", true);
        self.client.fetch_all(&query).await
    }

    #[instrument(skip(self))]
    async fn get_events(&self, filter: &EventQuery) -> Result<Vec<Event>, GatewayError> {
        let mut query = Query::from(EVENTS)
            .select("*,admins(display_name)")
            .order("event_date", true);
        if let Some(status) = filter.status {
            query = query.eq("status", status.as_str());
        }
        if let Some(event_type) = filter.event_type {
            query = query.eq("event_type", event_type.as_str());
        }
        if let Some(from) = filter.from {
            query = query.gte("event_date", from.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        if let Some(to) = filter.to {
            query = query.lte("event_date", to.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        let events: Vec<Event> = self.client.fetch_all(&query).await?;
        debug!(count = events.len(), "Fetched events");
        Ok(events)
    }

    #[instrument(skip(self))]
    async fn subscribe_to_event(&self, event_id: &str, telegram_id: i64) -> Result<EventSubscription, GatewayError> {
        let query = Query::from(EVENT_SUBSCRIPTIONS)
            .on_conflict("event_id,telegram_id")
            .select("*");
        let row = EventSubscription::active(event_id, telegram_id);
        self.client.upsert(&query, &row).await
    }

    #[instrument(skip(self))]
    async fn unsubscribe_from_event(&self, event_id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        let query = Query::from(EVENT_SUBSCRIPTIONS)
            .eq("event_id", event_id)
            .eq("telegram_id", telegram_id);
        self.client
            .update(&query, &ActiveFlag { is_active: false })
            .await
    }

    #[instrument(skip(self))]
    async fn get_event_subscriptions(&self, telegram_id: i64) -> Result<Vec<String>, GatewayError> {
        let query = Query::from(EVENT_SUBSCRIPTIONS)
            .select("event_id")
            .eq("telegram_id", telegram_id)
            .eq("is_active", true);
        let rows: Vec<EventIdRow> = self.client.fetch_all(&query).await?;
        Ok(rows.into_iter().map(|r| r.event_id).collect())
    }
}
