//! Rendering.

use crate::app::{App, Modal, Screen};
use crate::form::EditForm;
use crate::view::{EventFilter, InputMode, Placeholder, Section, ToggleKind};
use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction as LayoutDirection, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use signaldesk_client::NotificationKind;
use signaldesk_core::{relative_time, Comparison, Event, Impact, RiskLevel, Signal, SignalStatus};

const BG: Color = Color::Rgb(10, 10, 15);
const PANEL: Color = Color::Rgb(18, 18, 28);
const SELECTED: Color = Color::Rgb(30, 30, 45);
const ACCENT: Color = Color::Rgb(138, 43, 226);
const GOLD: Color = Color::Rgb(255, 215, 0);
const GREEN: Color = Color::Rgb(0, 255, 127);
const RED: Color = Color::Rgb(255, 69, 58);
const BLUE: Color = Color::Rgb(100, 149, 237);
const MUTED: Color = Color::Rgb(128, 128, 150);
const TEXT: Color = Color::Rgb(200, 200, 220);

/// Format a price with precision that fits its magnitude, trailing zeros trimmed.
pub fn format_price(price: f64) -> String {
    let decimals = if price.abs() >= 1000.0 {
        2
    } else if price.abs() >= 1.0 {
        4
    } else {
        8
    };
    let formatted = format!("{:.*}", decimals, price);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Signed percentage with two decimals.
pub fn format_change(pct: f64) -> String {
    if pct > 0.0 {
        format!("+{:.2}%", pct)
    } else {
        format!("{:.2}%", pct)
    }
}

fn risk_color(risk: RiskLevel) -> Color {
    match risk {
        RiskLevel::Low => GREEN,
        RiskLevel::Normal => BLUE,
        RiskLevel::High => Color::Rgb(255, 159, 10),
        RiskLevel::Casino => Color::Rgb(255, 105, 180),
    }
}

fn impact_color(impact: Impact) -> Color {
    match impact {
        Impact::High => RED,
        Impact::Medium => Color::Rgb(255, 159, 10),
        Impact::Low => GREEN,
        Impact::Unknown => MUTED,
    }
}

fn panel(title: Line<'_>) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL))
}

fn chip(label: &str, active: bool) -> Span<'static> {
    let style = if active {
        Style::default()
            .fg(BG)
            .bg(GOLD)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED)
    };
    Span::styled(format!(" {} ", label), style)
}

pub fn ui(f: &mut Frame, app: &App, screen: &Screen) {
    let size = f.area();
    f.render_widget(Block::default().style(Style::default().bg(BG)), size);

    if app.is_gated() {
        render_loader(f, size);
        return;
    }
    if !app.access.is_allowed() {
        render_denied(f, size, app.session.user_id());
        return;
    }

    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(size);

    render_header(f, chunks[0], app);
    match app.view.section {
        Section::Signals => render_signals(f, chunks[1], app, screen),
        Section::Events => render_events(f, chunks[1], app, screen),
        Section::Notifications => {
            let block = panel(Line::from(" 🔔 ALERTS "));
            render_placeholder(f, chunks[1], block, &app.view.notifications_placeholder());
        }
        Section::Settings => render_settings(f, chunks[1], app),
    }
    render_nav(f, chunks[2], app);

    if let Some(form) = &app.form {
        render_form(f, size, form, app.saving);
    }
    if let Some(modal) = app.modals.front() {
        render_modal(f, size, modal);
    }
}

fn render_loader(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "◆ SIGNAL DESK ◆",
            Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Loading…", Style::default().fg(MUTED))),
    ];
    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    f.render_widget(paragraph, centered_rect(60, 5, area));
}

pub fn render_denied(f: &mut Frame, area: Rect, user_id: Option<i64>) {
    let id = user_id.map_or_else(|| "unknown".to_string(), |id| id.to_string());
    let text = vec![
        Line::from(Span::styled(
            "Access denied",
            Style::default().fg(RED).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "This desk is available to subscribers only.",
            Style::default().fg(TEXT),
        )),
        Line::from(Span::styled(
            "Ask an admin to add your id to the whitelist.",
            Style::default().fg(TEXT),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Your ID: ", Style::default().fg(MUTED)),
            Span::styled(id, Style::default().fg(GOLD).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from(Span::styled("[Q] Quit", Style::default().fg(MUTED))),
    ];
    let block = panel(Line::from(" 🔒 "));
    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);
    f.render_widget(paragraph, centered_rect(60, 11, area));
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " ◆ SIGNAL DESK ◆ ",
        Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
    )];

    if let Some(user) = app.session.user() {
        spans.push(Span::styled(
            format!(" {} ", user.display_name()),
            Style::default().fg(TEXT),
        ));
    }
    if app.access.is_admin() {
        spans.push(Span::styled(
            " ADMIN ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ));
    }
    spans.push(Span::styled(
        format!(" ⏱  {} ", Utc::now().format("%H:%M:%S")),
        Style::default().fg(BLUE),
    ));

    if let Some(flash) = &app.flash {
        let (mark, color) = match flash.kind {
            NotificationKind::Success => ("✓", GREEN),
            NotificationKind::Warning => ("!", GOLD),
            NotificationKind::Error => ("✗", RED),
        };
        spans.push(Span::styled(
            format!(" {} {} ", mark, flash.message),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

fn render_placeholder(f: &mut Frame, area: Rect, block: Block<'_>, placeholder: &Placeholder) {
    let lines = match placeholder {
        Placeholder::Loading => vec![Line::from(Span::styled(
            "Loading…",
            Style::default().fg(MUTED),
        ))],
        Placeholder::Error(error) => vec![
            Line::from(Span::styled(
                "Failed to load",
                Style::default().fg(RED).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(error.clone(), Style::default().fg(TEXT))),
            Line::from(""),
            Line::from(Span::styled("[R] Retry", Style::default().fg(MUTED))),
        ],
        Placeholder::Empty { title, description } => vec![
            Line::from(Span::styled(
                *title,
                Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(*description, Style::default().fg(MUTED))),
        ],
        Placeholder::List => Vec::new(),
    };
    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_signals(f: &mut Frame, area: Rect, app: &App, screen: &Screen) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    // Search, admin chips and risk chips share one bar.
    let search_style = if app.view.mode == InputMode::Search {
        Style::default().fg(GOLD)
    } else {
        Style::default().fg(TEXT)
    };
    let mut spans = vec![
        Span::styled(" 🔍 ", Style::default().fg(MUTED)),
        Span::styled(
            if app.view.search.is_empty() && app.view.mode != InputMode::Search {
                "search symbol".to_string()
            } else {
                format!("{}▏", app.view.search)
            },
            search_style,
        ),
        Span::raw("  "),
        chip("All", app.view.admin_id.is_none()),
    ];
    for admin in &screen.admins {
        spans.push(chip(
            &admin.display_name,
            app.view.admin_id.as_deref() == Some(admin.id.as_str()),
        ));
    }
    spans.push(Span::raw("  "));
    spans.push(chip("All", app.view.risk.is_none()));
    for risk in RiskLevel::ALL {
        spans.push(chip(risk.chip_label(), app.view.risk == Some(risk)));
    }
    let filters = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(MUTED))
            .style(Style::default().bg(PANEL)),
    );
    f.render_widget(filters, chunks[0]);

    let visible = app.view.visible_signals(&screen.signals.data);
    let title = Line::from(vec![
        Span::styled(" 📈 ", Style::default().fg(GOLD)),
        Span::styled(
            "SIGNALS",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" ({}) ", visible.len()), Style::default().fg(MUTED)),
        Span::styled(
            if screen.signals.is_loading { "↻ " } else { "" },
            Style::default().fg(BLUE),
        ),
    ]);

    let placeholder = app.view.signal_placeholder(&screen.signals);
    if placeholder != Placeholder::List {
        render_placeholder(f, chunks[1], panel(title), &placeholder);
        return;
    }

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(i, signal)| {
            let live = screen.prices.get(signal.symbol.as_str()).copied();
            let subscribed = app.is_subscribed(ToggleKind::Signal, &signal.id);
            let toggling = app.view.is_toggling(ToggleKind::Signal, &signal.id);
            let bg = if i == app.view.selected_signal {
                SELECTED
            } else {
                PANEL
            };
            ListItem::new(signal_lines(signal, live, subscribed, toggling))
                .style(Style::default().bg(bg))
        })
        .collect();
    f.render_widget(List::new(items).block(panel(title)), chunks[1]);
}

fn signal_lines(
    signal: &Signal,
    live: Option<f64>,
    subscribed: bool,
    toggling: bool,
) -> Vec<Line<'static>> {
    let direction_color = if signal.direction.is_long() { GREEN } else { RED };
    let mut header = vec![
        Span::styled(
            signal.base_symbol().to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled("USDT ", Style::default().fg(MUTED)),
        Span::styled(
            format!(
                "{} {} ",
                if signal.direction.is_long() { "▲" } else { "▼" },
                signal.direction.as_str()
            ),
            Style::default()
                .fg(direction_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("[{}] ", signal.risk.label()),
            Style::default().fg(risk_color(signal.risk)),
        ),
    ];

    let price = signal.display_price(live);
    if let Some(price) = price {
        header.push(Span::styled(
            format!("{} ", format_price(price)),
            Style::default().fg(TEXT),
        ));
        if let Some(change) = signal.price_change_pct(Some(price)) {
            header.push(Span::styled(
                format!("{} ", format_change(change)),
                Style::default().fg(if change > 0.0 { GREEN } else { RED }),
            ));
        }
    }
    if signal.status != SignalStatus::Active {
        header.push(Span::styled(
            format!("{} ", signal.status.label()),
            Style::default().fg(MUTED),
        ));
    }
    header.push(if toggling {
        Span::styled("… ", Style::default().fg(MUTED))
    } else if subscribed {
        Span::styled("🔔 ", Style::default().fg(BLUE))
    } else {
        Span::styled("🔕 ", Style::default().fg(MUTED))
    });

    let entries = if signal.entries.is_empty() {
        "-".to_string()
    } else {
        signal
            .entries
            .iter()
            .map(|e| format_price(e.price))
            .collect::<Vec<_>>()
            .join(" / ")
    };
    let average = signal
        .average_entry()
        .map(format_price)
        .unwrap_or_else(|| "-".to_string());
    let mut stop = format!("SL {}", format_price(signal.stop_loss));
    if let Some(pct) = signal.stop_loss_percentage {
        stop.push_str(&format!(" ({:.1}%)", pct));
    }
    if let Some(timeframe) = &signal.soft_stop_timeframe {
        stop.push_str(&format!(" soft {}", timeframe));
    }

    let mut targets = vec![Span::styled("   TP ", Style::default().fg(MUTED))];
    for (i, target) in signal.targets.iter().enumerate() {
        let style = if target.hit {
            Style::default().fg(GREEN).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT)
        };
        targets.push(Span::styled(
            format!(
                "{}{}: {}{} ",
                if target.hit { "✓" } else { "" },
                i + 1,
                format_price(target.price),
                if target.percentage > 0.0 {
                    format!(" ({:.0}%)", target.percentage)
                } else {
                    String::new()
                }
            ),
            style,
        ));
    }

    let mut lines = vec![
        Line::from(header),
        Line::from(vec![
            Span::styled("   Entry ", Style::default().fg(MUTED)),
            Span::styled(entries, Style::default().fg(TEXT)),
            Span::styled("   Avg ", Style::default().fg(MUTED)),
            Span::styled(average, Style::default().fg(GOLD)),
            Span::styled(format!("   {}", stop), Style::default().fg(RED)),
        ]),
        Line::from(targets),
    ];
    if let Some(comment) = signal.comment.as_deref().filter(|c| !c.is_empty()) {
        lines.push(Line::from(Span::styled(
            format!("   💬 {}", comment),
            Style::default().fg(TEXT).add_modifier(Modifier::ITALIC),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!(
            "   by {} · {}",
            signal.admin_name,
            signal.created_at.format("%d.%m %H:%M")
        ),
        Style::default().fg(MUTED),
    )));
    lines.push(Line::from(""));
    lines
}

fn render_events(f: &mut Frame, area: Rect, app: &App, screen: &Screen) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let tabs: Vec<Span> = EventFilter::ALL
        .iter()
        .map(|filter| chip(filter.label(), *filter == app.view.event_filter))
        .collect();
    let tabs = Paragraph::new(Line::from(tabs))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(MUTED))
                .style(Style::default().bg(PANEL)),
        );
    f.render_widget(tabs, chunks[0]);

    let title = Line::from(vec![
        Span::styled(" 📅 ", Style::default().fg(GOLD)),
        Span::styled(
            "EVENTS",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" ({}) ", screen.events.data.len()),
            Style::default().fg(MUTED),
        ),
    ]);

    let placeholder = app.view.event_placeholder(&screen.events);
    if placeholder != Placeholder::List {
        render_placeholder(f, chunks[1], panel(title), &placeholder);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = screen
        .events
        .data
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let subscribed = app.is_subscribed(ToggleKind::Event, &event.id);
            let toggling = app.view.is_toggling(ToggleKind::Event, &event.id);
            let bg = if i == app.view.selected_event {
                SELECTED
            } else {
                PANEL
            };
            ListItem::new(event_lines(event, now, subscribed, toggling))
                .style(Style::default().bg(bg))
        })
        .collect();
    f.render_widget(List::new(items).block(panel(title)), chunks[1]);
}

fn event_lines(
    event: &Event,
    now: chrono::DateTime<Utc>,
    subscribed: bool,
    toggling: bool,
) -> Vec<Line<'static>> {
    let mut header = vec![
        Span::styled(
            format!("● {} ", event.impact.label()),
            Style::default()
                .fg(impact_color(event.impact))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{} ", event.event_type.label()),
            Style::default().fg(MUTED),
        ),
        Span::styled(
            format!("{} ", event.title),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ];
    if event.is_live() {
        header.push(Span::styled(
            "LIVE ",
            Style::default().fg(RED).add_modifier(Modifier::BOLD),
        ));
    } else {
        header.push(Span::styled(
            format!("{} ", relative_time(event.event_date, now)),
            Style::default().fg(BLUE),
        ));
    }
    header.push(if toggling {
        Span::styled("… ", Style::default().fg(MUTED))
    } else if subscribed {
        Span::styled("🔔 ", Style::default().fg(BLUE))
    } else {
        Span::styled("🔕 ", Style::default().fg(MUTED))
    });

    let actual_color = match event.comparison() {
        Some(Comparison::Better) => GREEN,
        Some(Comparison::Worse) => RED,
        _ => TEXT,
    };
    let dash = || "-".to_string();
    let mut lines = vec![
        Line::from(header),
        Line::from(vec![
            Span::styled(
                format!("   {}", event.event_date.format("%d.%m %H:%M UTC")),
                Style::default().fg(MUTED),
            ),
            Span::styled("   Forecast ", Style::default().fg(MUTED)),
            Span::styled(
                event.forecast.clone().unwrap_or_else(dash),
                Style::default().fg(TEXT),
            ),
            Span::styled("  Previous ", Style::default().fg(MUTED)),
            Span::styled(
                event.previous.clone().unwrap_or_else(dash),
                Style::default().fg(TEXT),
            ),
            Span::styled("  Actual ", Style::default().fg(MUTED)),
            Span::styled(
                event.actual.clone().unwrap_or_else(dash),
                Style::default().fg(actual_color).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    if event.shows_result() {
        if let Some(result) = &event.result_comment {
            lines.push(Line::from(Span::styled(
                format!("   💬 {}", result),
                Style::default().fg(TEXT).add_modifier(Modifier::ITALIC),
            )));
        }
    } else if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(Line::from(Span::styled(
            format!("   {}", description),
            Style::default().fg(TEXT),
        )));
    }
    if let Some(author) = event.author() {
        lines.push(Line::from(Span::styled(
            format!("   by {}", author),
            Style::default().fg(MUTED),
        )));
    }
    lines.push(Line::from(""));
    lines
}

fn render_settings(f: &mut Frame, area: Rect, app: &App) {
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<16}", label), Style::default().fg(MUTED)),
            Span::styled(value, Style::default().fg(TEXT)),
        ])
    };
    let user = app.session.user();
    let role = match app.access.admin() {
        Some(admin) if admin.is_super_admin => "Super admin",
        Some(_) => "Admin",
        None => "Subscriber",
    };
    let lines = vec![
        Line::from(""),
        row(
            "Name",
            user.map(|u| u.display_name()).unwrap_or_else(|| "-".to_string()),
        ),
        row(
            "Username",
            user.and_then(|u| u.username.clone())
                .map(|u| format!("@{}", u))
                .unwrap_or_else(|| "-".to_string()),
        ),
        row(
            "ID",
            user.map(|u| u.id.to_string()).unwrap_or_else(|| "-".to_string()),
        ),
        row("Role", role.to_string()),
        row("Backend", app.backend_label.clone()),
        row(
            "Price refresh",
            format!("every {}s", app.poll_interval().as_secs()),
        ),
    ];
    let paragraph = Paragraph::new(lines).block(panel(Line::from(" ⚙ SETTINGS ")));
    f.render_widget(paragraph, area);
}

fn render_nav(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    for (i, section) in Section::ALL.iter().enumerate() {
        spans.push(chip(
            &format!("{} {}", i + 1, section.title()),
            *section == app.view.section,
        ));
        spans.push(Span::raw(" "));
    }

    let help = match (app.view.section, app.view.mode) {
        (_, InputMode::Search) => "type to search · [Enter] done",
        (_, InputMode::Edit) => "[↑↓] field · [Enter] apply · [Ctrl+S] save · [Esc] cancel",
        (Section::Signals, _) if app.access.is_admin() => {
            "[/] search [a] admin [r] risk [s] notify [y] copy [e] edit [c] close [Q] quit"
        }
        (Section::Signals, _) => "[/] search [a] admin [r] risk [s] notify [y] copy [Q] quit",
        (Section::Events, _) => "[f] filter [s] notify [R] reload [Q] quit",
        _ => "[Tab] next [Q] quit",
    };
    spans.push(Span::styled(format!("  {}", help), Style::default().fg(MUTED)));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_form(f: &mut Frame, area: Rect, form: &EditForm, saving: bool) {
    let fields = form.fields();
    let height = fields.len() as u16 + 6;
    let rect = centered_rect(60, height, area);

    let mut lines: Vec<Line> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let selected = i == form.selected;
            let value = if selected {
                format!("{}▏", form.input)
            } else {
                form.value(*field)
            };
            Line::from(vec![
                Span::styled(
                    format!(" {} {:<10}", if selected { "›" } else { " " }, field.label()),
                    Style::default().fg(if selected { GOLD } else { MUTED }),
                ),
                Span::styled(value, Style::default().fg(TEXT)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    if saving {
        lines.push(Line::from(Span::styled(" Saving…", Style::default().fg(BLUE))));
    } else if let Some(message) = &form.message {
        lines.push(Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(RED),
        )));
    } else if form.editor.is_dirty() {
        lines.push(Line::from(Span::styled(
            " Unsaved changes",
            Style::default().fg(GOLD),
        )));
    }

    let block = panel(Line::from(Span::styled(
        format!(" ✎ Edit {} ", form.symbol),
        Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(Clear, rect);
    f.render_widget(Paragraph::new(lines).block(block), rect);
}

fn render_modal(f: &mut Frame, area: Rect, modal: &Modal) {
    let (message, help) = match modal {
        Modal::Alert(message) => (message.as_str(), "[any key] OK"),
        Modal::Confirm { message, .. } => (message.as_str(), "[Y] Yes  [N] No"),
    };
    let rect = centered_rect(50, 7, area);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(help, Style::default().fg(MUTED))),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(GOLD))
        .style(Style::default().bg(PANEL));
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rect,
    );
}

/// A rectangle `percent_x` wide and `height` rows tall, centered in `area`.
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(row);
    rect
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};
    use signaldesk_core::{Direction, Entry, EventStatus, EventType, Target};

    fn render_text(lines: Vec<Line<'static>>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 8)).unwrap();
        terminal
            .draw(|f| f.render_widget(List::new(vec![ListItem::new(lines)]), f.area()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn signal(entries: &[f64]) -> Signal {
        let now = Utc::now();
        Signal {
            id: "s1".to_string(),
            symbol: "BTCUSDT".into(),
            direction: Direction::Long,
            risk: RiskLevel::Normal,
            current_price: None,
            entries: entries.iter().map(|p| Entry::new(*p)).collect(),
            targets: vec![Target::new(70000.0, 100.0)],
            stop_loss: 60000.0,
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

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(64000.0), "64000");
        assert_eq!(format_price(64123.456), "64123.46");
        assert_eq!(format_price(155.5), "155.5");
        assert_eq!(format_price(1.23456), "1.2346");
        assert_eq!(format_price(0.0000085), "0.0000085");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(3.226), "+3.23%");
        assert_eq!(format_change(-1.5), "-1.50%");
        assert_eq!(format_change(0.0), "0.00%");
    }

    #[test]
    fn test_denied_screen_shows_user_id() {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| render_denied(f, f.area(), Some(424242)))
            .unwrap();
        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Access denied"));
        assert!(rendered.contains("424242"));
    }

    #[test]
    fn test_signal_card_shows_average_entry() {
        let rendered = render_text(signal_lines(&signal(&[64000.0, 62000.0]), None, false, false));
        assert!(rendered.contains("Entry 64000 / 62000"));
        assert!(rendered.contains("Avg 63000"));
    }

    #[test]
    fn test_signal_card_without_entries_shows_dash() {
        let rendered = render_text(signal_lines(&signal(&[]), None, false, false));
        assert!(rendered.contains("Entry -"));
        assert!(rendered.contains("Avg -"));
        assert!(rendered.contains("SL 60000"));
    }

    #[test]
    fn test_event_card_with_unknown_impact() {
        let event = Event {
            id: "e1".to_string(),
            title: "Surprise decision".to_string(),
            event_type: EventType::Other,
            impact: Impact::from("extreme".to_string()),
            event_date: Utc::now() + chrono::Duration::hours(2),
            forecast: None,
            previous: None,
            actual: None,
            description: None,
            result_comment: None,
            status: EventStatus::Upcoming,
            admin_name: None,
            admins: None,
        };
        assert_eq!(event.impact, Impact::Unknown);
        assert_eq!(impact_color(event.impact), MUTED);

        let rendered = render_text(event_lines(&event, Utc::now(), false, false));
        assert!(rendered.contains("Unknown"));
        assert!(rendered.contains("Surprise decision"));
    }

    #[test]
    fn test_centered_rect_fits_area() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(60, 10, area);
        assert_eq!(rect.height, 10);
        assert_eq!(rect.width, 60);
        assert_eq!(rect.y, 15);

        let small = centered_rect(60, 50, Rect::new(0, 0, 100, 8));
        assert_eq!(small.height, 8);
    }
}
