//! Trading signal definitions.

use crate::CoreError;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Risk profile of a signal, ordered from safest to most speculative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Normal,
    High,
    Casino,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Normal,
        RiskLevel::High,
        RiskLevel::Casino,
    ];

    /// Wire value used in gateway filters.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Normal => "normal",
            RiskLevel::High => "high",
            RiskLevel::Casino => "casino",
        }
    }

    /// Badge label shown on a signal card.
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Normal => "Normal Risk",
            RiskLevel::High => "HIGH RISK",
            RiskLevel::Casino => "Casino",
        }
    }

    /// Short label used on filter chips.
    pub fn chip_label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Normal => "Normal",
            RiskLevel::High => "High",
            RiskLevel::Casino => "Casino",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "normal" => Ok(RiskLevel::Normal),
            "high" => Ok(RiskLevel::High),
            "casino" => Ok(RiskLevel::Casino),
            other => Err(CoreError::UnknownRisk(other.to_string())),
        }
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    #[inline]
    pub fn is_long(self) -> bool {
        matches!(self, Direction::Long)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" => Ok(Direction::Long),
            "SHORT" => Ok(Direction::Short),
            other => Err(CoreError::UnknownDirection(other.to_string())),
        }
    }
}

/// Lifecycle status of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Active,
    Closed,
    Cancelled,
    TargetHit,
}

impl SignalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalStatus::Active => "active",
            SignalStatus::Closed => "closed",
            SignalStatus::Cancelled => "cancelled",
            SignalStatus::TargetHit => "target_hit",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalStatus::Active => "Active",
            SignalStatus::Closed => "Closed",
            SignalStatus::Cancelled => "Cancelled",
            SignalStatus::TargetHit => "Target hit",
        }
    }
}

impl FromStr for SignalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "active" => Ok(SignalStatus::Active),
            "closed" => Ok(SignalStatus::Closed),
            "cancelled" => Ok(SignalStatus::Cancelled),
            "target_hit" => Ok(SignalStatus::TargetHit),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// Entry level with an optional share of the position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

impl Entry {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            percentage: None,
        }
    }
}

/// Parse a user-entered price. A comma is accepted as decimal separator.
pub fn parse_price(input: &str) -> Result<f64, CoreError> {
    let normalized = input.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(price) if price.is_finite() && price > 0.0 => Ok(price),
        _ => Err(CoreError::InvalidPrice(input.to_string())),
    }
}

/// Profit target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub price: f64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub hit: bool,
}

impl Target {
    pub fn new(price: f64, percentage: f64) -> Self {
        Self {
            price,
            percentage,
            hit: false,
        }
    }
}

/// A published trade setup, as returned by the active signals view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    /// Exchange symbol (e.g., "BTCUSDT")
    pub symbol: CompactString,
    pub direction: Direction,
    pub risk: RiskLevel,
    /// Last price cached by the backend, used until a live quote arrives.
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub targets: Vec<Target>,
    pub stop_loss: f64,
    #[serde(default)]
    pub stop_loss_percentage: Option<f64>,
    /// Timeframe after which the stop is evaluated (e.g., "4H").
    #[serde(default)]
    pub soft_stop_timeframe: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    pub status: SignalStatus,
    #[serde(default)]
    pub admin_name: String,
    #[serde(default)]
    pub admin_telegram_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Signal {
    /// Unweighted mean of entry prices, `None` without entries.
    pub fn average_entry(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: f64 = self.entries.iter().map(|e| e.price).sum();
        Some(sum / self.entries.len() as f64)
    }

    /// Live price if known, otherwise the backend's cached price.
    pub fn display_price(&self, live: Option<f64>) -> Option<f64> {
        live.filter(|p| *p > 0.0)
            .or(self.current_price.filter(|p| *p > 0.0))
    }

    /// Percent distance of `price` from the average entry.
    pub fn price_change_pct(&self, price: Option<f64>) -> Option<f64> {
        let price = price?;
        let avg = self.average_entry()?;
        if avg == 0.0 {
            return None;
        }
        Some((price - avg) / avg * 100.0)
    }

    /// An active signal needs at least one entry and one target.
    pub fn is_valid_active(&self) -> bool {
        !self.entries.is_empty() && !self.targets.is_empty()
    }

    /// Symbol without the USDT quote suffix.
    pub fn base_symbol(&self) -> &str {
        self.symbol
            .strip_suffix("USDT")
            .filter(|base| !base.is_empty())
            .unwrap_or(self.symbol.as_str())
    }

    pub fn hit_targets(&self) -> usize {
        self.targets.iter().filter(|t| t.hit).count()
    }

    /// Case-insensitive substring match on the symbol. Only an empty query matches everything.
    pub fn matches_search(&self, query: &str) -> bool {
        query.is_empty() || self.symbol.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Signals whose symbol contains `query`, ignoring case. Order is preserved.
pub fn filter_by_symbol<'a>(signals: &'a [Signal], query: &str) -> Vec<&'a Signal> {
    signals.iter().filter(|s| s.matches_search(query)).collect()
}

/// Distinct symbols in first-seen order.
pub fn distinct_symbols(signals: &[Signal]) -> Vec<String> {
    let mut seen = HashSet::new();
    signals
        .iter()
        .filter(|s| seen.insert(s.symbol.as_str()))
        .map(|s| s.symbol.to_string())
        .collect()
}

/// Replacement payload for an admin edit. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<Entry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<Target>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SignalStatus>,
}

impl SignalUpdate {
    pub fn status(status: SignalStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Apply the set fields to `signal`.
    pub fn apply_to(&self, signal: &mut Signal) {
        if let Some(entries) = &self.entries {
            signal.entries = entries.clone();
        }
        if let Some(targets) = &self.targets {
            signal.targets = targets.clone();
        }
        if let Some(stop_loss) = self.stop_loss {
            signal.stop_loss = stop_loss;
        }
        if let Some(comment) = &self.comment {
            signal.comment = if comment.is_empty() {
                None
            } else {
                Some(comment.clone())
            };
        }
        if let Some(status) = self.status {
            signal.status = status;
        }
    }
}

/// New signal payload for the insert mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignal {
    pub symbol: CompactString,
    pub direction: Direction,
    pub risk: RiskLevel,
    pub entries: Vec<Entry>,
    pub targets: Vec<Target>,
    pub stop_loss: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_stop_timeframe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub admin_telegram_id: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn signal(id: &str, symbol: &str, risk: RiskLevel, entries: &[f64]) -> Signal {
        let now = Utc::now();
        Signal {
            id: id.to_string(),
            symbol: CompactString::new(symbol),
            direction: Direction::Long,
            risk,
            current_price: None,
            entries: entries.iter().map(|p| Entry::new(*p)).collect(),
            targets: vec![Target::new(entries.first().copied().unwrap_or(1.0) * 1.1, 50.0)],
            stop_loss: 1.0,
            stop_loss_percentage: None,
            soft_stop_timeframe: None,
            comment: None,
            status: SignalStatus::Active,
            admin_name: "Desk".to_string(),
            admin_telegram_id: Some(1),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::signal;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(" 64000.5 "), Ok(64000.5));
        assert_eq!(parse_price("0,0000091"), Ok(0.0000091));
        assert!(parse_price("0").is_err());
        assert!(parse_price("-5").is_err());
        assert!(parse_price("abc").is_err());
    }

    #[test]
    fn test_average_entry() {
        let s = signal("1", "BTCUSDT", RiskLevel::High, &[100.0, 110.0, 90.0]);
        assert_eq!(s.average_entry(), Some(100.0));

        let empty = signal("2", "BTCUSDT", RiskLevel::High, &[]);
        assert_eq!(empty.average_entry(), None);
        assert!(!empty.is_valid_active());
    }

    #[test]
    fn test_price_change_pct() {
        let s = signal("1", "ETHUSDT", RiskLevel::Low, &[100.0]);
        let change = s.price_change_pct(Some(105.0)).unwrap();
        assert!((change - 5.0).abs() < 1e-9);
        assert_eq!(s.price_change_pct(None), None);

        let empty = signal("2", "ETHUSDT", RiskLevel::Low, &[]);
        assert_eq!(empty.price_change_pct(Some(105.0)), None);
    }

    #[test]
    fn test_display_price_prefers_live() {
        let mut s = signal("1", "ETHUSDT", RiskLevel::Low, &[100.0]);
        s.current_price = Some(99.0);
        assert_eq!(s.display_price(Some(101.0)), Some(101.0));
        assert_eq!(s.display_price(None), Some(99.0));
        s.current_price = None;
        assert_eq!(s.display_price(None), None);
    }

    #[test]
    fn test_filter_by_symbol_case_insensitive() {
        let signals = vec![
            signal("1", "BTCUSDT", RiskLevel::High, &[1.0]),
            signal("2", "ETHUSDT", RiskLevel::Low, &[1.0]),
            signal("3", "ETHBTC", RiskLevel::Normal, &[1.0]),
        ];

        let ids: Vec<&str> = filter_by_symbol(&signals, "btc")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);

        assert_eq!(filter_by_symbol(&signals, "").len(), 3);
        assert!(filter_by_symbol(&signals, "sol").is_empty());
    }

    #[test]
    fn test_filter_by_symbol_keeps_whitespace() {
        let signals = vec![signal("1", "BTCUSDT", RiskLevel::High, &[1.0])];
        assert!(filter_by_symbol(&signals, " btc").is_empty());
        assert!(filter_by_symbol(&signals, "   ").is_empty());
        assert_eq!(filter_by_symbol(&signals, "tcu").len(), 1);
    }

    #[test]
    fn test_distinct_symbols_keeps_first_seen_order() {
        let signals = vec![
            signal("1", "BTCUSDT", RiskLevel::High, &[1.0]),
            signal("2", "ETHUSDT", RiskLevel::Low, &[1.0]),
            signal("3", "BTCUSDT", RiskLevel::Normal, &[1.0]),
        ];
        assert_eq!(distinct_symbols(&signals), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_base_symbol() {
        let s = signal("1", "SOLUSDT", RiskLevel::High, &[1.0]);
        assert_eq!(s.base_symbol(), "SOL");
        let s = signal("1", "ETHBTC", RiskLevel::High, &[1.0]);
        assert_eq!(s.base_symbol(), "ETHBTC");
    }

    #[test]
    fn test_risk_ordering_and_parse() {
        assert!(RiskLevel::Low < RiskLevel::Normal);
        assert!(RiskLevel::High < RiskLevel::Casino);
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_signal_wire_format() {
        let json = r#"{
            "id": "a1",
            "symbol": "BTCUSDT",
            "direction": "SHORT",
            "risk": "casino",
            "entries": [{"price": 65000.0, "percentage": 50}, {"price": 66000.0}],
            "targets": [{"price": 60000.0, "percentage": 100, "hit": true}],
            "stop_loss": 68000.0,
            "soft_stop_timeframe": null,
            "status": "target_hit",
            "admin_name": "Desk",
            "admin_telegram_id": 42,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }"#;

        let s: Signal = serde_json::from_str(json).unwrap();
        assert_eq!(s.direction, Direction::Short);
        assert_eq!(s.risk, RiskLevel::Casino);
        assert_eq!(s.status, SignalStatus::TargetHit);
        assert_eq!(s.entries[0].percentage, Some(50.0));
        assert_eq!(s.hit_targets(), 1);
        assert_eq!(s.average_entry(), Some(65500.0));
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = SignalUpdate::status(SignalStatus::Closed);
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"status":"closed"}"#);
    }

    #[test]
    fn test_update_apply() {
        let mut s = signal("1", "BTCUSDT", RiskLevel::High, &[1.0]);
        let update = SignalUpdate {
            entries: Some(vec![Entry::new(2.0), Entry::new(4.0)]),
            stop_loss: Some(0.5),
            comment: Some("tighten".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut s);
        assert_eq!(s.average_entry(), Some(3.0));
        assert_eq!(s.stop_loss, 0.5);
        assert_eq!(s.comment.as_deref(), Some("tighten"));
    }
}
