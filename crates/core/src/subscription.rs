//! Notification subscriptions, whitelist entries and cached prices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channels a signal subscriber wants to be notified on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyChannels {
    pub entries: bool,
    pub targets: bool,
    pub stop_loss: bool,
}

impl Default for NotifyChannels {
    fn default() -> Self {
        Self {
            entries: true,
            targets: true,
            stop_loss: true,
        }
    }
}

/// Row of the signal subscription table, keyed by (signal_id, telegram_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSubscription {
    pub signal_id: String,
    pub telegram_id: i64,
    pub notify_entries: bool,
    pub notify_targets: bool,
    pub notify_stop_loss: bool,
    pub is_active: bool,
}

impl SignalSubscription {
    /// Active row for an upsert.
    pub fn active(signal_id: &str, telegram_id: i64, channels: NotifyChannels) -> Self {
        Self {
            signal_id: signal_id.to_string(),
            telegram_id,
            notify_entries: channels.entries,
            notify_targets: channels.targets,
            notify_stop_loss: channels.stop_loss,
            is_active: true,
        }
    }
}

/// Row of the event subscription table, keyed by (event_id, telegram_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscription {
    pub event_id: String,
    pub telegram_id: i64,
    pub is_active: bool,
}

impl EventSubscription {
    pub fn active(event_id: &str, telegram_id: i64) -> Self {
        Self {
            event_id: event_id.to_string(),
            telegram_id,
            is_active: true,
        }
    }
}

/// Admission list row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub telegram_id: i64,
    pub is_active: bool,
}

/// Backend price cache row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPrice {
    #[serde(default)]
    pub symbol: Option<String>,
    pub price: f64,
    pub updated_at: DateTime<Utc>,
}
