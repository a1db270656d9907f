//! Economic calendar events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a scheduled release. Unrecognised values map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    FedRate,
    FedMeeting,
    InflationCpi,
    InflationPpi,
    Employment,
    Gdp,
    RetailSales,
    Other,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::FedRate => "fed_rate",
            EventType::FedMeeting => "fed_meeting",
            EventType::InflationCpi => "inflation_cpi",
            EventType::InflationPpi => "inflation_ppi",
            EventType::Employment => "employment",
            EventType::Gdp => "gdp",
            EventType::RetailSales => "retail_sales",
            EventType::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventType::FedRate => "Fed rate",
            EventType::FedMeeting => "Fed meeting",
            EventType::InflationCpi => "CPI inflation",
            EventType::InflationPpi => "PPI inflation",
            EventType::Employment => "Employment",
            EventType::Gdp => "GDP",
            EventType::RetailSales => "Retail sales",
            EventType::Other => "Event",
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "fed_rate" => EventType::FedRate,
            "fed_meeting" => EventType::FedMeeting,
            "inflation_cpi" => EventType::InflationCpi,
            "inflation_ppi" => EventType::InflationPpi,
            "employment" => EventType::Employment,
            "gdp" => EventType::Gdp,
            "retail_sales" => EventType::RetailSales,
            _ => EventType::Other,
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        EventType::from(s.as_str())
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        t.as_str().to_string()
    }
}

/// Expected market impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Impact {
    High,
    Medium,
    Low,
    Unknown,
}

impl Impact {
    pub fn as_str(self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
            Impact::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Impact::High => "High",
            Impact::Medium => "Medium",
            Impact::Low => "Low",
            Impact::Unknown => "Unknown",
        }
    }
}

impl From<String> for Impact {
    fn from(s: String) -> Self {
        match s.as_str() {
            "high" => Impact::High,
            "medium" => Impact::Medium,
            "low" => Impact::Low,
            _ => Impact::Unknown,
        }
    }
}

impl From<Impact> for String {
    fn from(i: Impact) -> Self {
        i.as_str().to_string()
    }
}

/// Lifecycle of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventStatus {
    Upcoming,
    InProgress,
    Completed,
    Unknown,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventStatus::Upcoming => "Scheduled",
            EventStatus::InProgress => "Now",
            EventStatus::Completed => "Done",
            EventStatus::Unknown => "Unknown",
        }
    }
}

impl From<String> for EventStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "upcoming" => EventStatus::Upcoming,
            "in_progress" => EventStatus::InProgress,
            "completed" => EventStatus::Completed,
            _ => EventStatus::Unknown,
        }
    }
}

impl From<EventStatus> for String {
    fn from(s: EventStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embedded admin reference from the `admins(display_name)` join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAuthor {
    pub display_name: String,
}

/// A scheduled macroeconomic release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub event_type: EventType,
    pub impact: Impact,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub forecast: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub actual: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub result_comment: Option<String>,
    pub status: EventStatus,
    #[serde(default)]
    pub admin_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<EventAuthor>,
}

impl Event {
    pub fn comparison(&self) -> Option<Comparison> {
        compare_values(
            self.actual.as_deref(),
            self.forecast.as_deref(),
            self.previous.as_deref(),
        )
    }

    /// Author name from the view column or the joined admin row.
    pub fn author(&self) -> Option<&str> {
        self.admin_name
            .as_deref()
            .or_else(|| self.admins.as_ref().map(|a| a.display_name.as_str()))
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.status == EventStatus::InProgress
    }

    /// Result commentary is only shown once the release is out.
    pub fn shows_result(&self) -> bool {
        self.status == EventStatus::Completed && self.result_comment.is_some()
    }
}

/// Outcome of an actual value against its forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Better,
    Worse,
    Neutral,
}

/// Compare `actual` against `forecast`, or `previous` when there is no forecast.
pub fn compare_values(
    actual: Option<&str>,
    forecast: Option<&str>,
    previous: Option<&str>,
) -> Option<Comparison> {
    let actual = parse_release_value(actual.filter(|a| !a.is_empty())?)?;
    let reference = forecast
        .filter(|f| !f.is_empty())
        .or(previous)
        .and_then(parse_release_value)?;

    if actual > reference {
        Some(Comparison::Better)
    } else if actual < reference {
        Some(Comparison::Worse)
    } else {
        Some(Comparison::Neutral)
    }
}

/// Parse a release value such as "3.2%" or "250K", keeping only digits, dots and minus signs
/// and reading the leading number.
fn parse_release_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            d if d.is_ascii_digit() => seen_digit = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    cleaned[..end].trim_end_matches('.').parse().ok()
}

/// Human relative time until `event_date`.
pub fn relative_time(event_date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = event_date - now;
    if diff.num_milliseconds() <= 0 {
        return "completed".to_string();
    }

    let hours = diff.num_hours();
    let days = hours / 24;
    if days > 0 {
        format!("in {}d", days)
    } else if hours > 0 {
        format!("in {}h", hours)
    } else {
        format!("in {}m", diff.num_minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compare_values() {
        assert_eq!(
            compare_values(Some("3.2"), Some("3.0"), None),
            Some(Comparison::Better)
        );
        assert_eq!(
            compare_values(Some("2.8"), Some("3.0"), None),
            Some(Comparison::Worse)
        );
        assert_eq!(
            compare_values(Some("3.0"), Some("3.0"), None),
            Some(Comparison::Neutral)
        );
        assert_eq!(compare_values(None, Some("3.0"), None), None);
    }

    #[test]
    fn test_compare_falls_back_to_previous() {
        assert_eq!(
            compare_values(Some("250K"), None, Some("200K")),
            Some(Comparison::Better)
        );
        assert_eq!(compare_values(Some("1.0"), None, None), None);
    }

    #[test]
    fn test_compare_strips_units() {
        assert_eq!(
            compare_values(Some("-0.1%"), Some("0.2%"), None),
            Some(Comparison::Worse)
        );
        assert_eq!(compare_values(Some("n/a"), Some("0.2%"), None), None);
    }

    #[test]
    fn test_relative_time() {
        let now = Utc::now();
        assert_eq!(relative_time(now + Duration::hours(50), now), "in 2d");
        assert_eq!(relative_time(now + Duration::minutes(185), now), "in 3h");
        assert_eq!(relative_time(now + Duration::minutes(42), now), "in 42m");
        assert_eq!(relative_time(now - Duration::minutes(1), now), "completed");
    }

    #[test]
    fn test_unknown_wire_values_fall_back() {
        let json = r#"{
            "id": "e1",
            "title": "Non-farm payrolls",
            "event_type": "jobless_claims",
            "impact": "extreme",
            "event_date": "2024-06-07T12:30:00Z",
            "forecast": "190K",
            "actual": "272K",
            "status": "completed",
            "result_comment": "Strong print",
            "admins": {"display_name": "Desk"}
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, EventType::Other);
        assert_eq!(event.impact, Impact::Unknown);
        assert_eq!(event.status, EventStatus::Completed);
        assert_eq!(event.author(), Some("Desk"));
        assert!(event.shows_result());
        assert_eq!(event.comparison(), Some(Comparison::Better));
    }
}
