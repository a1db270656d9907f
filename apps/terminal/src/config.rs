//! Application configuration.

use serde::{Deserialize, Serialize};
use signaldesk_client::{ClientError, InitData};
use signaldesk_core::TelegramUser;
use signaldesk_feeds::BinanceTicker;
use signaldesk_gateway::{GatewayConfig, GatewayError};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Platform user id used in demo mode. Seeded as a super admin.
pub const DEMO_USER_ID: i64 = 1;

pub const MIN_PRICE_INTERVAL_SECS: u64 = 10;
pub const MAX_PRICE_INTERVAL_SECS: u64 = 30;

/// Init data older than this is still accepted, with a warning.
const INIT_DATA_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Gateway credentials not found (set SIGNALDESK_GATEWAY_URL and SIGNALDESK_GATEWAY_KEY, or use --demo)")]
    MissingGateway,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Identity(#[from] ClientError),
}

/// Where the user identity comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum IdentitySource {
    #[default]
    None,
    /// Raw init data from the chat host, verified when a bot token is known.
    InitData {
        raw: String,
        bot_token: Option<String>,
    },
    /// Trusted local override.
    UserId(i64),
}

/// Price polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Poll period in seconds, clamped to 10..=30.
    pub interval_secs: u64,
    /// Ticker REST base URL.
    pub ticker_url: String,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_secs: MAX_PRICE_INTERVAL_SECS,
            ticker_url: BinanceTicker::BASE_URL.to_string(),
        }
    }
}

impl PollerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(
            self.interval_secs
                .clamp(MIN_PRICE_INTERVAL_SECS, MAX_PRICE_INTERVAL_SECS),
        )
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hosted backend. Not needed in demo mode.
    pub gateway: Option<GatewayConfig>,
    pub poller: PollerSettings,
    pub identity: IdentitySource,
    /// In-memory backend and simulated prices.
    pub demo: bool,
    /// Logging level.
    pub log_level: String,
    /// Log destination; the terminal itself belongs to the UI.
    pub log_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: None,
            poller: PollerSettings::default(),
            identity: IdentitySource::None,
            demo: false,
            log_level: "info".to_string(),
            log_file: "signaldesk.log".to_string(),
        }
    }
}

impl AppConfig {
    /// Build the gateway section from optional URL and key.
    pub fn gateway_from(url: Option<String>, key: Option<String>) -> Option<GatewayConfig> {
        match (url, key) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Some(GatewayConfig::new(url.trim(), key.trim()))
            }
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.demo {
            return Ok(());
        }
        match &self.gateway {
            Some(gateway) => Ok(gateway.validate()?),
            None => Err(ConfigError::MissingGateway),
        }
    }

    /// Resolve the user identity. `None` keeps the app on its loading screen.
    pub fn resolve_user(&self) -> Result<Option<TelegramUser>, ConfigError> {
        match &self.identity {
            IdentitySource::InitData { raw, bot_token } => {
                let data = match bot_token {
                    Some(token) => InitData::parse_and_verify(raw, token)?,
                    None => {
                        warn!("No bot token configured, init data accepted without verification");
                        InitData::parse_unchecked(raw)?
                    }
                };
                if data.is_expired(chrono::Utc::now(), INIT_DATA_MAX_AGE) {
                    warn!(auth_date = ?data.auth_date, "Init data is older than a day");
                }
                Ok(data.user)
            }
            IdentitySource::UserId(id) => Ok(Some(TelegramUser::new(*id, "User"))),
            IdentitySource::None if self.demo => Ok(Some(TelegramUser::new(DEMO_USER_ID, "Demo"))),
            IdentitySource::None => Ok(None),
        }
    }
}
