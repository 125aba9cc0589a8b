mod client;
mod dashboard;
mod dispatcher;
mod fake;
mod input;
mod logging;
mod poller;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

use k6ctl_core::api::ControllerApi;
use k6ctl_core::config::{Config, ConfigError, ConfigLayer};

use client::HttpController;
use dashboard::Dashboard;
use fake::FakeController;
use input::TerminalInput;

/// How long one loop iteration waits for a key press
const INPUT_POLL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "k6ctl")]
#[command(about = "Live terminal dashboard for a running k6 load test", long_about = None)]
struct Cli {
    /// Base URL of the k6 REST API
    #[arg(short, long)]
    url: Option<String>,

    /// Seconds between polls
    #[arg(short, long)]
    interval: Option<f64>,

    /// VUs added or removed per key press
    #[arg(short, long)]
    step: Option<i64>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Hide the debug strip at the bottom of the screen
    #[arg(long)]
    no_debug: bool,

    /// YAML config file (otherwise $K6CTL_CONFIG, then k6ctl.yml discovery)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file (default: k6ctl.log in the temp directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Drive the dashboard from a simulated test instead of k6
    #[arg(long)]
    demo: bool,
}

impl Cli {
    /// Command-line flags as the top configuration layer
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            url: self.url.clone(),
            refresh_interval: self.interval,
            vu_step: self.step,
            request_timeout: self.timeout,
            debug_panel: self.no_debug.then_some(false),
        }
    }
}

/// defaults <- config file <- flags
fn load_config(cli: &Cli) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let (file_layer, source) = match &cli.config {
        Some(path) => (ConfigLayer::load(path)?, Some(path.clone())),
        None => {
            let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
                path: PathBuf::from("."),
                source,
            })?;
            match ConfigLayer::discover(&cwd)? {
                Some((path, layer)) => (layer, Some(path)),
                None => (ConfigLayer::default(), None),
            }
        }
    };

    let config = Config::resolve(file_layer.merge(cli.layer()))?;
    Ok((config, source))
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let (config, source) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    if let Err(e) = logging::init(&log_path) {
        eprintln!("Error: cannot log to {}: {}", log_path.display(), e);
        std::process::exit(1);
    }
    info!(
        config_file = ?source,
        url = %config.base_url,
        interval = ?config.refresh_interval,
        vu_step = config.vu_step,
        demo = cli.demo,
        "k6ctl starting"
    );

    let api: Arc<dyn ControllerApi> = if cli.demo {
        Arc::new(FakeController::demo())
    } else {
        match HttpController::new(&config.base_url, config.request_timeout) {
            Ok(http) => Arc::new(http),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    };

    let mut terminal = setup_terminal()?;
    let size = terminal.size()?;
    let mut dashboard = Dashboard::new(&config, api, size.width, size.height);
    let mut input = TerminalInput::new(INPUT_POLL);

    let result = dashboard.run(&mut terminal, &mut input).await;
    restore_terminal(terminal)?;

    if let Err(e) = &result {
        error!(error = %e, "terminal failure");
    }
    result
}
