//! View model: navigation, filters, search and derived lists.

use signaldesk_client::Loadable;
use signaldesk_core::{admin_telegram_id, filter_by_symbol, Admin, Event, EventStatus, RiskLevel, Signal};
use signaldesk_gateway::{EventQuery, SignalFilter};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Signals,
    Events,
    Notifications,
    Settings,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Signals,
        Section::Events,
        Section::Notifications,
        Section::Settings,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Signals => "Setups",
            Section::Events => "Events",
            Section::Notifications => "Alerts",
            Section::Settings => "Settings",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Section::Signals => 0,
            Section::Events => 1,
            Section::Notifications => 2,
            Section::Settings => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

/// Event list tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventFilter {
    #[default]
    Upcoming,
    Completed,
    All,
}

impl EventFilter {
    pub const ALL: [EventFilter; 3] = [EventFilter::Upcoming, EventFilter::Completed, EventFilter::All];

    pub fn label(self) -> &'static str {
        match self {
            EventFilter::Upcoming => "Upcoming",
            EventFilter::Completed => "Completed",
            EventFilter::All => "All",
        }
    }

    pub fn next(self) -> Self {
        match self {
            EventFilter::Upcoming => EventFilter::Completed,
            EventFilter::Completed => EventFilter::All,
            EventFilter::All => EventFilter::Upcoming,
        }
    }

    pub fn query(self) -> EventQuery {
        match self {
            EventFilter::Upcoming => EventQuery::with_status(EventStatus::Upcoming),
            EventFilter::Completed => EventQuery::with_status(EventStatus::Completed),
            EventFilter::All => EventQuery::default(),
        }
    }
}

/// What a list area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    Error(String),
    Empty {
        title: &'static str,
        description: &'static str,
    },
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleKind {
    Signal,
    Event,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
    Edit,
}

#[derive(Debug)]
pub struct ViewModel {
    pub section: Section,
    pub search: String,
    pub risk: Option<RiskLevel>,
    /// Selected admin row id.
    pub admin_id: Option<String>,
    pub event_filter: EventFilter,
    pub mode: InputMode,
    pub selected_signal: usize,
    pub selected_event: usize,
    toggling_signals: HashSet<String>,
    toggling_events: HashSet<String>,
    /// Signal id and index of the next level to copy.
    copy_cursor: Option<(String, usize)>,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self {
            section: Section::Signals,
            search: String::new(),
            risk: None,
            admin_id: None,
            event_filter: EventFilter::default(),
            mode: InputMode::Normal,
            selected_signal: 0,
            selected_event: 0,
            toggling_signals: HashSet::new(),
            toggling_events: HashSet::new(),
            copy_cursor: None,
        }
    }
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the section changed.
    pub fn select_section(&mut self, section: Section) -> bool {
        if self.section == section {
            return false;
        }
        self.section = section;
        true
    }

    /// All -> Low -> Normal -> High -> Casino -> All.
    pub fn cycle_risk(&mut self) -> Option<RiskLevel> {
        self.risk = match self.risk {
            None => Some(RiskLevel::ALL[0]),
            Some(current) => RiskLevel::ALL
                .iter()
                .position(|r| *r == current)
                .and_then(|i| RiskLevel::ALL.get(i + 1).copied()),
        };
        self.selected_signal = 0;
        self.risk
    }

    /// All -> each admin in list order -> All.
    pub fn cycle_admin(&mut self, admins: &[Admin]) -> Option<&str> {
        self.admin_id = match &self.admin_id {
            None => admins.first().map(|a| a.id.clone()),
            Some(current) => admins
                .iter()
                .position(|a| &a.id == current)
                .and_then(|i| admins.get(i + 1))
                .map(|a| a.id.clone()),
        };
        self.selected_signal = 0;
        self.admin_id.as_deref()
    }

    pub fn cycle_event_filter(&mut self) -> EventFilter {
        self.event_filter = self.event_filter.next();
        self.selected_event = 0;
        self.event_filter
    }

    /// Backend filter for the current chips. An unknown admin id means no admin filter.
    pub fn signal_filter(&self, admins: &[Admin]) -> SignalFilter {
        SignalFilter {
            admin_telegram_id: self
                .admin_id
                .as_deref()
                .and_then(|id| admin_telegram_id(admins, id)),
            risk: self.risk,
        }
    }

    pub fn event_query(&self) -> EventQuery {
        self.event_filter.query()
    }

    pub fn visible_signals<'a>(&self, signals: &'a [Signal]) -> Vec<&'a Signal> {
        filter_by_symbol(signals, &self.search)
    }

    /// Spinner only while nothing is loaded yet; stale items stay visible during a refetch.
    pub fn signal_placeholder(&self, state: &Loadable<Vec<Signal>>) -> Placeholder {
        if state.is_loading && state.data.is_empty() {
            return Placeholder::Loading;
        }
        if let Some(error) = &state.error {
            return Placeholder::Error(error.clone());
        }
        if self.visible_signals(&state.data).is_empty() {
            let description = if self.search.is_empty() {
                "No signals have been published yet"
            } else {
                "Try another search"
            };
            return Placeholder::Empty {
                title: "No signals",
                description,
            };
        }
        Placeholder::List
    }

    pub fn event_placeholder(&self, state: &Loadable<Vec<Event>>) -> Placeholder {
        if state.is_loading {
            return Placeholder::Loading;
        }
        if let Some(error) = &state.error {
            return Placeholder::Error(error.clone());
        }
        if state.data.is_empty() {
            return Placeholder::Empty {
                title: "No events",
                description: "No events have been scheduled yet",
            };
        }
        Placeholder::List
    }

    pub fn notifications_placeholder(&self) -> Placeholder {
        Placeholder::Empty {
            title: "No alerts",
            description: "Entry and target notifications will appear here",
        }
    }

    /// Mark `id` as toggling. False if a toggle is already shown for it.
    pub fn begin_toggle(&mut self, kind: ToggleKind, id: &str) -> bool {
        self.toggling_mut(kind).insert(id.to_string())
    }

    pub fn end_toggle(&mut self, kind: ToggleKind, id: &str) {
        self.toggling_mut(kind).remove(id);
    }

    pub fn is_toggling(&self, kind: ToggleKind, id: &str) -> bool {
        match kind {
            ToggleKind::Signal => self.toggling_signals.contains(id),
            ToggleKind::Event => self.toggling_events.contains(id),
        }
    }

    fn toggling_mut(&mut self, kind: ToggleKind) -> &mut HashSet<String> {
        match kind {
            ToggleKind::Signal => &mut self.toggling_signals,
            ToggleKind::Event => &mut self.toggling_events,
        }
    }

    pub fn move_selection(&mut self, delta: isize, visible_signals: usize, events: usize) {
        let (selected, len) = match self.section {
            Section::Signals => (&mut self.selected_signal, visible_signals),
            Section::Events => (&mut self.selected_event, events),
            _ => return,
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        let next = (*selected as isize + delta).clamp(0, len as isize - 1);
        *selected = next as usize;
    }

    /// Keep selections inside lists that may have shrunk.
    pub fn clamp_selection(&mut self, visible_signals: usize, events: usize) {
        self.selected_signal = self.selected_signal.min(visible_signals.saturating_sub(1));
        self.selected_event = self.selected_event.min(events.saturating_sub(1));
    }

    /// Level to copy for `signal`. Repeated calls for the same card walk
    /// through entries, targets and the stop loss, then wrap around.
    pub fn next_copy_level(&mut self, signal: &Signal) -> Option<(String, f64)> {
        let levels = copy_levels(signal);
        let index = match &self.copy_cursor {
            Some((id, index)) if *id == signal.id => *index % levels.len().max(1),
            _ => 0,
        };
        let level = levels.get(index).cloned()?;
        self.copy_cursor = Some((signal.id.clone(), index + 1));
        Some(level)
    }

    pub fn push_search(&mut self, c: char) {
        self.search.push(c);
        self.selected_signal = 0;
    }

    pub fn pop_search(&mut self) {
        self.search.pop();
        self.selected_signal = 0;
    }
}

/// Price levels of a card in display order, labelled for the copy notice.
pub fn copy_levels(signal: &Signal) -> Vec<(String, f64)> {
    let entries = signal
        .entries
        .iter()
        .enumerate()
        .map(|(i, e)| (format!("Entry {}", i + 1), e.price));
    let targets = signal
        .targets
        .iter()
        .enumerate()
        .map(|(i, t)| (format!("Target {}", i + 1), t.price));
    entries
        .chain(targets)
        .chain(std::iter::once(("Stop loss".to_string(), signal.stop_loss)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fixtures::signal;
    use pretty_assertions::assert_eq;

    mod fixtures {
        use super::*;
        use signaldesk_core::{Direction, Entry, SignalStatus, Target};

        pub fn signal(id: &str, symbol: &str) -> Signal {
            let now = Utc::now();
            Signal {
                id: id.to_string(),
                symbol: symbol.into(),
                direction: Direction::Long,
                risk: RiskLevel::Normal,
                current_price: None,
                entries: vec![Entry::new(100.0)],
                targets: vec![Target::new(110.0, 100.0)],
                stop_loss: 90.0,
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

    fn admins() -> Vec<Admin> {
        ["a", "b"]
            .iter()
            .enumerate()
            .map(|(i, id)| Admin {
                id: id.to_string(),
                telegram_id: 100 + i as i64,
                username: None,
                display_name: id.to_uppercase(),
                is_super_admin: false,
                is_active: true,
            })
            .collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let signals = vec![signal("1", "BTCUSDT"), signal("2", "ETHUSDT"), signal("3", "WBTCUSDT")];
        let mut view = ViewModel::new();
        for c in "btc".chars() {
            view.push_search(c);
        }
        let ids: Vec<&str> = view.visible_signals(&signals).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        view.search.clear();
        assert_eq!(view.visible_signals(&signals).len(), 3);
    }

    #[test]
    fn test_risk_cycle() {
        let mut view = ViewModel::new();
        let seen: Vec<Option<RiskLevel>> = (0..5).map(|_| view.cycle_risk()).collect();
        assert_eq!(
            seen,
            vec![
                Some(RiskLevel::Low),
                Some(RiskLevel::Normal),
                Some(RiskLevel::High),
                Some(RiskLevel::Casino),
                None,
            ]
        );
    }

    #[test]
    fn test_admin_cycle_maps_to_telegram_id() {
        let admins = admins();
        let mut view = ViewModel::new();
        assert_eq!(view.signal_filter(&admins).admin_telegram_id, None);

        assert_eq!(view.cycle_admin(&admins), Some("a"));
        assert_eq!(view.signal_filter(&admins).admin_telegram_id, Some(100));
        assert_eq!(view.cycle_admin(&admins), Some("b"));
        assert_eq!(view.cycle_admin(&admins), None);
        assert_eq!(view.signal_filter(&admins), SignalFilter::default());
    }

    #[test]
    fn test_signal_placeholders() {
        let mut view = ViewModel::new();
        let mut state: Loadable<Vec<Signal>> = Loadable::default();
        assert_eq!(view.signal_placeholder(&state), Placeholder::Loading);

        state.finish_ok(vec![signal("1", "BTCUSDT")]);
        assert_eq!(view.signal_placeholder(&state), Placeholder::List);

        // Refetching keeps the list on screen.
        state.begin();
        assert_eq!(view.signal_placeholder(&state), Placeholder::List);

        view.search = "doge".to_string();
        state.finish_ok(vec![signal("1", "BTCUSDT")]);
        assert!(matches!(
            view.signal_placeholder(&state),
            Placeholder::Empty { description: "Try another search", .. }
        ));

        state.finish_err(&signaldesk_client::ClientError::MissingIdentity);
        assert!(matches!(view.signal_placeholder(&state), Placeholder::Error(_)));
    }

    #[test]
    fn test_event_filter_queries() {
        let mut view = ViewModel::new();
        assert_eq!(view.event_query().status, Some(EventStatus::Upcoming));
        assert_eq!(view.cycle_event_filter(), EventFilter::Completed);
        assert_eq!(view.event_query().status, Some(EventStatus::Completed));
        assert_eq!(view.cycle_event_filter(), EventFilter::All);
        assert_eq!(view.event_query(), EventQuery::default());
    }

    #[test]
    fn test_toggling_sets_are_per_kind() {
        let mut view = ViewModel::new();
        assert!(view.begin_toggle(ToggleKind::Signal, "x"));
        assert!(!view.begin_toggle(ToggleKind::Signal, "x"));
        assert!(!view.is_toggling(ToggleKind::Event, "x"));
        view.end_toggle(ToggleKind::Signal, "x");
        assert!(!view.is_toggling(ToggleKind::Signal, "x"));
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut view = ViewModel::new();
        view.move_selection(5, 3, 0);
        assert_eq!(view.selected_signal, 2);
        view.move_selection(-10, 3, 0);
        assert_eq!(view.selected_signal, 0);

        view.selected_signal = 2;
        view.clamp_selection(1, 0);
        assert_eq!(view.selected_signal, 0);
    }

    #[test]
    fn test_section_navigation() {
        assert_eq!(Section::Settings.next(), Section::Signals);
        assert_eq!(Section::from_index(1), Some(Section::Events));
        assert_eq!(Section::from_index(4), None);

        let mut view = ViewModel::new();
        assert!(!view.select_section(Section::Signals));
        assert!(view.select_section(Section::Events));
    }

    #[test]
    fn test_copy_levels_cycle_per_card() {
        let btc = signal("1", "BTCUSDT");
        let eth = signal("2", "ETHUSDT");
        let mut view = ViewModel::new();

        let labels: Vec<String> = (0..4)
            .filter_map(|_| view.next_copy_level(&btc))
            .map(|(label, _)| label)
            .collect();
        assert_eq!(labels, vec!["Entry 1", "Target 1", "Stop loss", "Entry 1"]);

        // Another card starts from its first entry.
        assert_eq!(view.next_copy_level(&eth), Some(("Entry 1".to_string(), 100.0)));
        assert_eq!(view.next_copy_level(&eth), Some(("Target 1".to_string(), 110.0)));
    }
}
