//! Table query building with PostgREST filter syntax.

use std::fmt::Display;

/// A table query: selected columns, filter predicates and ordering.
///
/// Renders to query pairs such as `risk=eq.high`, `symbol=in.("BTCUSDT","ETHUSDT")`
/// and `order=created_at.desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            params: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns.to_string())
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{}", value))
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("gte.{}", value))
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("lte.{}", value))
    }

    /// Membership filter. Values are double-quoted so commas and parentheses survive.
    pub fn in_list<V: Display>(self, column: &str, values: &[V]) -> Self {
        let quoted: Vec<String> = values
            .iter()
            .map(|v| format!("\"{}\"", v.to_string().replace('"', "\\\"")))
            .collect();
        self.param(column, format!("in.({})", quoted.join(",")))
    }

    pub fn order(self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.param("order", format!("{}.{}", column, direction))
    }

    /// Conflict target for upserts (e.g., `signal_id,telegram_id`).
    pub fn on_conflict(self, columns: &str) -> Self {
        self.param("on_conflict", columns.to_string())
    }

    fn param(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(query: &Query) -> Vec<(&str, &str)> {
        query
            .params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_filters_render_in_order() {
        let query = Query::from("active_signals_view")
            .select("*")
            .order("created_at", false)
            .eq("risk", "high");

        assert_eq!(query.table(), "active_signals_view");
        assert_eq!(
            pairs(&query),
            vec![
                ("select", "*"),
                ("order", "created_at.desc"),
                ("risk", "eq.high"),
            ]
        );
    }

    #[test]
    fn test_range_and_in_filters() {
        let query = Query::from("price_cache")
            .in_list("symbol", &["BTCUSDT", "ETHUSDT"])
            .gte("event_date", "2024-01-01")
            .lte("event_date", "2024-02-01");

        assert_eq!(
            pairs(&query),
            vec![
                ("symbol", r#"in.("BTCUSDT","ETHUSDT")"#),
                ("event_date", "gte.2024-01-01"),
                ("event_date", "lte.2024-02-01"),
            ]
        );
    }

    #[test]
    fn test_on_conflict() {
        let query = Query::from("signal_subscriptions").on_conflict("signal_id,telegram_id");
        assert_eq!(
            pairs(&query),
            vec![("on_conflict", "signal_id,telegram_id")]
        );
    }
}
