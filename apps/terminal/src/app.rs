//! Application controller: owns the stores and turns keys into actions.

use crate::clipboard::{Clipboard, SystemClipboard};
use crate::form::EditForm;
use crate::platform::PlatformRequest;
use crate::view::{InputMode, Section, ToggleKind, ViewModel};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use signaldesk_client::{
    AccessGate, AccessState, AdminsStore, Collection, CollectionStore, EventSubscriptions,
    EventsStore, ImpactStyle, Loadable, NotificationKind, Session, SignalEditor,
    SignalSubscriptions, SignalsStore,
};
use signaldesk_core::{distinct_symbols, Admin, Event, Signal};
use signaldesk_feeds::{PriceMap, PricePoller, PriceSource};
use signaldesk_gateway::{Backend, SignalFilter};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// How long an outcome notification stays in the header.
const FLASH_DURATION: Duration = Duration::from_secs(3);

/// Results reported back to the UI loop by spawned work.
#[derive(Debug)]
pub enum AppEvent {
    AccessResolved(AccessState),
    ToggleFinished {
        kind: ToggleKind,
        id: String,
        error: Option<String>,
    },
    SaveFinished {
        form: Box<EditForm>,
        error: Option<String>,
    },
}

/// Outcome notice shown in the header for a few seconds.
#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: NotificationKind,
    pub message: String,
    at: Instant,
}

impl Flash {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.at.elapsed() >= FLASH_DURATION
    }
}

impl From<NotificationKind> for Flash {
    fn from(kind: NotificationKind) -> Self {
        let message = match kind {
            NotificationKind::Success => "Done",
            NotificationKind::Warning => "Check",
            NotificationKind::Error => "Failed",
        };
        Self::new(kind, message)
    }
}

pub enum Modal {
    Alert(String),
    Confirm {
        message: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Everything a frame needs from the async stores.
pub struct Screen {
    pub signals: Loadable<Vec<Signal>>,
    pub events: Loadable<Vec<Event>>,
    pub admins: Vec<Admin>,
    pub prices: PriceMap,
}

pub struct App {
    pub session: Session,
    pub access: AccessState,
    pub view: ViewModel,
    pub signals: Arc<SignalsStore>,
    pub events: Arc<EventsStore>,
    pub admins: Arc<AdminsStore>,
    pub signal_subs: Arc<SignalSubscriptions>,
    pub event_subs: Arc<EventSubscriptions>,
    pub form: Option<EditForm>,
    pub saving: bool,
    pub modals: VecDeque<Modal>,
    pub flash: Option<Flash>,
    pub backend_label: String,
    pub should_quit: bool,
    poller: PricePoller,
    clipboard: Box<dyn Clipboard>,
    data_started: bool,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    platform_rx: mpsc::UnboundedReceiver<PlatformRequest>,
}

impl App {
    /// Starts the access check right away. Data is fetched only once access is granted.
    pub fn new(
        session: Session,
        backend: Arc<dyn Backend>,
        prices: Arc<dyn PriceSource>,
        poll_interval: Duration,
        platform_rx: mpsc::UnboundedReceiver<PlatformRequest>,
        backend_label: impl Into<String>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let view = ViewModel::new();
        let user_id = session.user_id();

        let gate = AccessGate::new(backend.clone());
        let tx = events_tx.clone();
        tokio::spawn(async move {
            let state = gate.check(user_id).await;
            let _ = tx.send(AppEvent::AccessResolved(state));
        });

        Self {
            signals: Arc::new(SignalsStore::new(backend.clone(), SignalFilter::default())),
            events: Arc::new(EventsStore::new(backend.clone(), view.event_query())),
            admins: Arc::new(AdminsStore::new(backend.clone(), ())),
            signal_subs: Arc::new(SignalSubscriptions::new(backend.clone(), user_id)),
            event_subs: Arc::new(EventSubscriptions::new(backend, user_id)),
            session,
            access: AccessState::Loading,
            view,
            form: None,
            saving: false,
            modals: VecDeque::new(),
            flash: None,
            backend_label: backend_label.into(),
            should_quit: false,
            poller: PricePoller::new(prices, poll_interval),
            clipboard: Box::new(SystemClipboard::new()),
            data_started: false,
            events_tx,
            events_rx,
            platform_rx,
        }
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poller.interval()
    }

    /// Full-screen loader until the session is ready and access has resolved.
    pub fn is_gated(&self) -> bool {
        !self.session.is_ready() || self.access.is_loading()
    }

    pub async fn screen(&self) -> Screen {
        Screen {
            signals: self.signals.snapshot().await,
            events: self.events.snapshot().await,
            admins: self.admins.items().await,
            prices: self.poller.prices(),
        }
    }

    /// Apply results from spawned work and host dialogs, then keep the
    /// price poller pointed at the symbols on screen.
    pub fn update(&mut self, screen: &Screen) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
        while let Ok(request) = self.platform_rx.try_recv() {
            self.apply_platform_request(request);
        }
        if self.flash.as_ref().is_some_and(Flash::is_expired) {
            self.flash = None;
        }

        if self.access.is_allowed() {
            self.poller.set_symbols(distinct_symbols(&screen.signals.data));
        }
        let visible = self.view.visible_signals(&screen.signals.data).len();
        self.view.clamp_selection(visible, screen.events.data.len());
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AccessResolved(state) => {
                info!(
                    allowed = state.is_allowed(),
                    admin = state.is_admin(),
                    "Access resolved"
                );
                self.access = state;
                if self.access.is_allowed() && !self.data_started {
                    self.start_data();
                }
            }
            AppEvent::ToggleFinished { kind, id, error } => {
                self.view.end_toggle(kind, &id);
                match error {
                    Some(error) => {
                        warn!(id, error, "Subscription toggle failed");
                        self.session.platform().notify(NotificationKind::Error);
                    }
                    None => self.session.platform().notify(NotificationKind::Success),
                }
            }
            AppEvent::SaveFinished { mut form, error } => {
                self.saving = false;
                match error {
                    None => {
                        self.form = None;
                        self.view.mode = InputMode::Normal;
                    }
                    Some(error) => {
                        form.message = Some(error);
                        self.form = Some(*form);
                    }
                }
            }
        }
    }

    fn apply_platform_request(&mut self, request: PlatformRequest) {
        match request {
            PlatformRequest::Alert(message) => self.modals.push_back(Modal::Alert(message)),
            PlatformRequest::Confirm { message, reply } => {
                self.modals.push_back(Modal::Confirm { message, reply })
            }
            PlatformRequest::Notify(kind) => self.flash = Some(kind.into()),
        }
    }

    fn start_data(&mut self) {
        debug!("Loading collections");
        self.data_started = true;
        spawn_refetch(self.admins.clone());
        spawn_refetch(self.signals.clone());
        spawn_refetch(self.events.clone());

        let signal_subs = self.signal_subs.clone();
        tokio::spawn(async move {
            let _ = signal_subs.load().await;
        });
        let event_subs = self.event_subs.clone();
        tokio::spawn(async move {
            let _ = event_subs.load().await;
        });
    }

    pub fn handle_key(&mut self, key: KeyEvent, screen: &Screen) {
        if let Some(modal) = self.modals.pop_front() {
            self.handle_modal_key(modal, key);
            return;
        }

        if !self.access.is_allowed() {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                self.should_quit = true;
            }
            return;
        }

        match self.view.mode {
            InputMode::Search => self.handle_search_key(key),
            InputMode::Edit => self.handle_edit_key(key),
            InputMode::Normal => self.handle_normal_key(key, screen),
        }
    }

    fn handle_modal_key(&mut self, modal: Modal, key: KeyEvent) {
        match modal {
            Modal::Alert(_) => {}
            Modal::Confirm { message, reply } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let _ = reply.send(true);
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    let _ = reply.send(false);
                }
                _ => self.modals.push_front(Modal::Confirm { message, reply }),
            },
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.view.mode = InputMode::Normal,
            KeyCode::Backspace => self.view.pop_search(),
            KeyCode::Char(c) => self.view.push_search(c),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        if self.saving {
            return;
        }
        let Some(form) = self.form.as_mut() else {
            self.view.mode = InputMode::Normal;
            return;
        };

        match key.code {
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => self.save_form(),
            KeyCode::Esc => {
                form.editor.discard();
                self.form = None;
                self.view.mode = InputMode::Normal;
            }
            KeyCode::Up => form.move_selection(-1),
            KeyCode::Down | KeyCode::Tab => form.move_selection(1),
            KeyCode::Enter => {
                let _ = form.apply_input();
            }
            KeyCode::Backspace => {
                form.input.pop();
            }
            KeyCode::Char(c) => form.input.push(c),
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, screen: &Screen) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => {
                let next = self.view.section.next();
                self.select_section(next);
            }
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                if let Some(section) = Section::from_index(index) {
                    self.select_section(section);
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1, screen),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1, screen),
            KeyCode::Char('/') if self.view.section == Section::Signals => {
                self.view.mode = InputMode::Search;
            }
            KeyCode::Char('r') if self.view.section == Section::Signals => {
                self.view.cycle_risk();
                self.session.platform().selection_changed();
                self.apply_signal_filter(&screen.admins);
            }
            KeyCode::Char('a') if self.view.section == Section::Signals => {
                self.view.cycle_admin(&screen.admins);
                self.session.platform().selection_changed();
                self.apply_signal_filter(&screen.admins);
            }
            KeyCode::Char('f') if self.view.section == Section::Events => {
                self.view.cycle_event_filter();
                self.session.haptic(ImpactStyle::Light);
                if self.events.set_query(self.view.event_query()) {
                    spawn_refetch(self.events.clone());
                }
            }
            KeyCode::Char('s') => self.toggle_selected(screen),
            KeyCode::Char('y') if self.view.section == Section::Signals => {
                self.copy_selected(screen)
            }
            KeyCode::Char('e') if self.access.is_admin() => self.edit_selected(screen),
            KeyCode::Char('c') if self.access.is_admin() => self.close_selected(screen),
            KeyCode::Char('R') => self.retry(),
            _ => {}
        }
    }

    fn select_section(&mut self, section: Section) {
        if self.view.select_section(section) {
            self.session.platform().selection_changed();
        }
    }

    fn move_selection(&mut self, delta: isize, screen: &Screen) {
        let visible = self.view.visible_signals(&screen.signals.data).len();
        self.view
            .move_selection(delta, visible, screen.events.data.len());
    }

    fn apply_signal_filter(&mut self, admins: &[Admin]) {
        if self.signals.set_query(self.view.signal_filter(admins)) {
            spawn_refetch(self.signals.clone());
        }
    }

    fn retry(&mut self) {
        match self.view.section {
            Section::Signals => spawn_refetch(self.signals.clone()),
            Section::Events => spawn_refetch(self.events.clone()),
            _ => {}
        }
    }

    fn selected_signal<'a>(&self, screen: &'a Screen) -> Option<&'a Signal> {
        self.view
            .visible_signals(&screen.signals.data)
            .get(self.view.selected_signal)
            .copied()
    }

    fn toggle_selected(&mut self, screen: &Screen) {
        let (kind, id) = match self.view.section {
            Section::Signals => match self.selected_signal(screen) {
                Some(signal) => (ToggleKind::Signal, signal.id.clone()),
                None => return,
            },
            Section::Events => match screen.events.data.get(self.view.selected_event) {
                Some(event) => (ToggleKind::Event, event.id.clone()),
                None => return,
            },
            _ => return,
        };

        if !self.view.begin_toggle(kind, &id) {
            return;
        }
        self.session.haptic(ImpactStyle::Medium);

        let tx = self.events_tx.clone();
        match kind {
            ToggleKind::Signal => {
                let store = self.signal_subs.clone();
                tokio::spawn(async move {
                    let error = store.toggle(&id).await.err().map(|e| e.to_string());
                    let _ = tx.send(AppEvent::ToggleFinished { kind, id, error });
                });
            }
            ToggleKind::Event => {
                let store = self.event_subs.clone();
                tokio::spawn(async move {
                    let error = store.toggle(&id).await.err().map(|e| e.to_string());
                    let _ = tx.send(AppEvent::ToggleFinished { kind, id, error });
                });
            }
        }
    }

    /// Copy the next price level of the selected card to the clipboard.
    fn copy_selected(&mut self, screen: &Screen) {
        let Some(signal) = self.selected_signal(screen) else {
            return;
        };
        let Some((label, price)) = self.view.next_copy_level(signal) else {
            return;
        };
        let text = price.to_string();
        match self.clipboard.set_text(&text) {
            Ok(()) => {
                debug!(symbol = %signal.symbol, level = %label, "Copied level");
                self.session.haptic(ImpactStyle::Light);
                self.flash = Some(Flash::new(
                    NotificationKind::Success,
                    format!("Copied {}: {}", label, text),
                ));
            }
            Err(e) => {
                warn!("Copy failed: {}", e);
                self.flash = Some(Flash::new(NotificationKind::Error, "Copy failed"));
            }
        }
    }

    fn edit_selected(&mut self, screen: &Screen) {
        if self.view.section != Section::Signals {
            return;
        }
        if let Some(signal) = self.selected_signal(screen) {
            self.form = Some(EditForm::new(signal));
            self.view.mode = InputMode::Edit;
        }
    }

    fn save_form(&mut self) {
        let Some(mut form) = self.form.take() else {
            return;
        };
        self.saving = true;
        let signals = self.signals.clone();
        let platform = self.session.platform().clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let error = form
                .editor
                .save(&signals, platform.as_ref())
                .await
                .err()
                .map(|e| e.to_string());
            let _ = tx.send(AppEvent::SaveFinished {
                form: Box::new(form),
                error,
            });
        });
    }

    fn close_selected(&mut self, screen: &Screen) {
        if self.view.section != Section::Signals {
            return;
        }
        let Some(signal) = self.selected_signal(screen) else {
            return;
        };
        let editor = SignalEditor::new(signal);
        let signals = self.signals.clone();
        let platform = self.session.platform().clone();
        tokio::spawn(async move {
            // Outcome is reported to the user by the editor through the platform.
            let _ = editor.close(&signals, platform.as_ref()).await;
        });
    }

    pub fn is_subscribed(&self, kind: ToggleKind, id: &str) -> bool {
        match kind {
            ToggleKind::Signal => self.signal_subs.is_subscribed(id),
            ToggleKind::Event => self.event_subs.is_subscribed(id),
        }
    }
}

fn spawn_refetch<C: Collection>(store: Arc<CollectionStore<C>>) {
    tokio::spawn(async move {
        let _ = store.refetch().await;
    });
}
