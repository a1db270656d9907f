//! Signal Desk - Terminal client
//!
//! Browse trading signals and the economic calendar, manage notification
//! subscriptions and, for admins, edit or close signals.

mod app;
mod clipboard;
mod config;
mod form;
mod platform;
mod ui;
mod view;

use app::App;
use clap::Parser;
use config::{AppConfig, IdentitySource, PollerSettings, DEMO_USER_ID};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use platform::TerminalPlatform;
use ratatui::{backend::CrosstermBackend, Terminal};
use signaldesk_client::Session;
use signaldesk_feeds::{BinanceTicker, PriceSource, SimulatedPrices};
use signaldesk_gateway::{Api, Backend, MemoryBackend};
use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Signal Desk CLI
#[derive(Parser, Debug)]
#[command(name = "signaldesk")]
#[command(about = "Terminal client for the signal desk", long_about = None)]
struct Args {
    /// Hosted backend URL
    #[arg(long, env = "SIGNALDESK_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Public API key for the hosted backend
    #[arg(long, env = "SIGNALDESK_GATEWAY_KEY", hide_env_values = true)]
    gateway_key: Option<String>,

    /// Signed init data from the chat host
    #[arg(long, env = "SIGNALDESK_INIT_DATA", hide_env_values = true)]
    init_data: Option<String>,

    /// Bot token used to verify init data
    #[arg(long, env = "SIGNALDESK_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Trusted user id, used when no init data is given
    #[arg(long)]
    user_id: Option<i64>,

    /// Price refresh period in seconds (10-30)
    #[arg(long, default_value_t = 30)]
    price_interval_secs: u64,

    /// Ticker REST base URL
    #[arg(long, default_value = BinanceTicker::BASE_URL)]
    ticker_url: String,

    /// Use the in-memory backend and simulated prices
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log file; the terminal is owned by the UI
    #[arg(long, default_value = "signaldesk.log")]
    log_file: String,
}

impl Args {
    fn into_config(self) -> AppConfig {
        let identity = match (self.init_data, self.user_id) {
            (Some(raw), _) => IdentitySource::InitData {
                raw,
                bot_token: self.bot_token,
            },
            (None, Some(id)) => IdentitySource::UserId(id),
            (None, None) => IdentitySource::None,
        };
        AppConfig {
            gateway: AppConfig::gateway_from(self.gateway_url, self.gateway_key),
            poller: PollerSettings {
                interval_secs: self.price_interval_secs,
                ticker_url: self.ticker_url,
            },
            identity,
            demo: self.demo,
            log_level: self.log_level,
            log_file: self.log_file,
        }
    }
}

fn init_logging(level: &str, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let file = File::options().create(true).append(true).open(path)?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Args::parse().into_config();
    init_logging(&config.log_level, &config.log_file)?;

    info!("Starting Signal Desk");
    config.validate()?;
    let user = config.resolve_user()?;

    let (backend, backend_label): (Arc<dyn Backend>, String) = match &config.gateway {
        Some(gateway) if !config.demo => (Arc::new(Api::new(gateway)?), gateway.url.clone()),
        _ => {
            info!("Demo mode: in-memory backend");
            (
                Arc::new(MemoryBackend::demo(DEMO_USER_ID).await),
                "demo (in-memory)".to_string(),
            )
        }
    };
    let prices: Arc<dyn PriceSource> = if config.demo {
        Arc::new(SimulatedPrices::demo())
    } else {
        Arc::new(BinanceTicker::with_base_url(config.poller.ticker_url.clone())?)
    };

    let (platform, platform_rx) = TerminalPlatform::new(user);
    let session = Session::start(Arc::new(platform));
    let mut app = App::new(
        session,
        backend,
        prices,
        config.poller.interval(),
        platform_rx,
        backend_label,
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        error!("Terminal loop failed: {}", e);
    }
    info!("Signal Desk stopped");
    Ok(res?)
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        let screen = app.screen().await;
        app.update(&screen);

        let view: &App = app;
        terminal.draw(|f| ui::ui(f, view, &screen))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key, &screen);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
