mod app;
mod host;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use host::{ChannelHost, HostRequest, TerminalServices};
use mar_core::commands::{CommandLayer, Inbound};
use mar_core::executor::MockExecutor;
use mar_core::panel::PanelController;
use mar_core::probe::{ShellProbe, StaticProbe, SystemProbe};
use mar_core::store::{self, ConfigKey, ConfigStore, MemoryStore, TomlStore};
use mar_core::AgentService;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::OpenOptions, io, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const INBOUND_CAPACITY: usize = 64;
const TICK_MS: u64 = 120;

#[derive(Parser, Debug)]
#[command(name = "mar-panel", version, about = "Multi-agent runner task panel")]
struct Args {
    /// Settings file (defaults to the per-user config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Keep settings in memory for this session only
    #[arg(long)]
    ephemeral: bool,
    /// Agent service to store before starting (copilot | claude-code)
    #[arg(long)]
    service: Option<AgentService>,
    /// Simulated agent run time
    #[arg(long, default_value_t = 2000)]
    delay_ms: u64,
    /// Where the file picker starts
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Treat every agent command as installed without probing PATH
    #[arg(long)]
    offline: bool,
    /// Render the stored state once as text and exit
    #[arg(long)]
    print: bool,
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let store = open_store(&args);
    if let Some(service) = args.service {
        store
            .set(ConfigKey::AgentService, service.as_str())
            .context("saving agent service")?;
    }
    let probe: Arc<dyn ShellProbe> = if args.offline {
        Arc::new(StaticProbe::new(true))
    } else {
        Arc::new(SystemProbe)
    };

    if args.print {
        return print_once(store, probe).await;
    }

    let start_dir = match args.dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving working directory")?,
    };
    info!(
        service = %store.agent_service(),
        dir = %start_dir.display(),
        "starting panel"
    );

    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let panel = PanelController::new(
        Box::new(ChannelHost::new(request_tx.clone())),
        probe,
        Arc::clone(&store),
    );
    let layer = CommandLayer::new(
        panel,
        Box::new(TerminalServices::new(request_tx)),
        Arc::new(MockExecutor::new(Duration::from_millis(args.delay_ms))),
    );
    let serving = tokio::spawn(layer.serve(inbound_rx));

    let mut app = app::App::new(store, start_dir);
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, request_rx, inbound_tx).await;
    restore_terminal(&mut terminal)?;

    app.dismiss_dialogs();
    if let Err(err) = serving.await {
        warn!(error = %err, "serving loop ended abnormally");
    }

    if let Err(err) = result {
        eprintln!("mar-panel: {err}");
    }

    Ok(())
}

fn open_store(args: &Args) -> Arc<dyn ConfigStore> {
    if args.ephemeral {
        return Arc::new(MemoryStore::default());
    }
    let path = args.config.clone().unwrap_or_else(store::config_path);
    let store = TomlStore::open(path);
    info!(path = %store.path().display(), "settings file");
    Arc::new(store)
}

async fn print_once(store: Arc<dyn ConfigStore>, probe: Arc<dyn ShellProbe>) -> Result<()> {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut panel = PanelController::new(Box::new(ChannelHost::new(tx)), probe, store);
    let view = panel.render().await;
    print!("{view}");
    Ok(())
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Tui,
    app: &mut app::App,
    mut requests: mpsc::UnboundedReceiver<HostRequest>,
    inbound: mpsc::Sender<Inbound>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MS));

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        tokio::select! {
            _ = ticker.tick() => {
                if app.is_processing() {
                    app.on_tick();
                }
            }
            maybe_request = requests.recv() => match maybe_request {
                Some(request) => app.apply_request(request),
                None => break,
            },
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(event) = app.handle_key(key) {
                        if inbound.try_send(event).is_err() {
                            app.notice = Some("Panel busy, try again".to_string());
                        }
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_file = std::env::var("MAR_LOG_FILE")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());
    match log_file {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}
