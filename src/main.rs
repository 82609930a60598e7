//! getafix CLI
//!
//! Refreshes every governed descriptor file under a directory from the
//! remote API its `.getafix` markers point at.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use getafix::settings::{LogSettings, SettingsOverrides, DEFAULT_SETTINGS_FILE};
use getafix::{
    Event, Getafix, LogFormat, LogNotifier, Notifier, ReqwestClient, RunOptions, RunSummary,
    Settings,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "getafix")]
#[command(about = "Refresh local API fixtures from .getafix-scoped endpoint files", version)]
struct Cli {
    /// Directory to scan (default: current directory)
    root: Option<PathBuf>,

    /// Only fetch descriptor files that are still empty
    #[arg(long)]
    only_new: bool,

    /// Root-relative glob restricting which files are fetched (repeatable)
    #[arg(long, value_name = "GLOB")]
    include: Vec<String>,

    /// Marker file name (default: .getafix)
    #[arg(long)]
    marker: Option<String>,

    /// Settings file (default: ./getafix.toml if present)
    #[arg(long, short = 's', env = "GETAFIX_SETTINGS")]
    settings: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print progress events as JSON lines
    #[arg(long, conflicts_with = "quiet")]
    json: bool,

    /// Report progress through the log only
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = load_settings(&cli, &settings_path)?;
    init_tracing(&settings.log)?;

    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut options = RunOptions::from(&settings);
    if let Ok(path) = settings_path.canonicalize() {
        options.exclude.push(path);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    let client = ReqwestClient::new(&settings.http).context("failed to build HTTP client")?;
    let getafix = Getafix::builder()
        .with_client(client)
        .with_notifier(ConsoleNotifier::new(&cli))
        .with_cancel(cancel)
        .build()?;

    let summary = getafix
        .run(&root, &options)
        .with_context(|| format!("failed to refresh '{}'", root.display()))?;

    if !cli.json && !cli.quiet {
        print_summary(&summary);
    }

    Ok(if summary.cancelled {
        ExitCode::from(130)
    } else if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Defaults, then the settings file, then `GETAFIX__*` variables, then flags.
fn load_settings(cli: &Cli, settings_path: &Path) -> Result<Settings> {
    let mut settings = Settings::loader()
        .with_file(settings_path, cli.settings.is_some())
        .with_env("GETAFIX", "__")
        .load()
        .context("failed to load settings")?;

    settings.apply_overrides(SettingsOverrides {
        only_new: cli.only_new,
        include: cli.include.clone(),
        marker: cli.marker.clone(),
        timeout_secs: cli.timeout,
        log_format: cli.log_format,
    });
    Ok(settings)
}

/// Logs go to stderr so `--json` events on stdout stay machine-readable.
fn init_tracing(log: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .with_context(|| format!("invalid log level '{}'", log.level))?;

    let layer = match log.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .flatten_event(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("failed to initialize logging")
}

enum ConsoleNotifier {
    Human,
    Json,
    Log,
}

impl ConsoleNotifier {
    fn new(cli: &Cli) -> Self {
        if cli.quiet {
            ConsoleNotifier::Log
        } else if cli.json {
            ConsoleNotifier::Json
        } else {
            ConsoleNotifier::Human
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, event: &Event<'_>) {
        match self {
            ConsoleNotifier::Human => print_event(event),
            ConsoleNotifier::Json => match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("error: failed to serialize event: {e}"),
            },
            ConsoleNotifier::Log => LogNotifier.notify(event),
        }
    }
}

fn print_event(event: &Event<'_>) {
    match event {
        Event::Before { size } => println!("Fetching {size} file(s)"),
        Event::Requesting { url, .. } => println!("GET {url}"),
        Event::Success { file } => println!("  updated {}", file.display()),
        Event::Warning { file, url, code } => {
            println!("  warning: {code} from {url}, left {} untouched", file.display())
        }
        Event::Failed { file, error, .. } => println!("  failed: {}: {error}", file.display()),
    }
}

fn print_summary(summary: &RunSummary) {
    let mut line = format!(
        "Done: {} updated, {} warning(s), {} failed, {} not governed",
        summary.succeeded.len(),
        summary.warnings.len(),
        summary.failures.len(),
        summary.not_governed,
    );
    if summary.cancelled {
        line.push_str(" (cancelled)");
    }
    println!("{line}");
}
