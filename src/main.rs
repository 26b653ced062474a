mod chart;
mod commands;
mod config;
mod error;
mod preferences;
mod progress;
mod ranking;
mod schema;
mod sheets;
mod snapshot;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::Parser;
use commands::{Bot, SnapshotProvider};
use config::Config;
use error::{AppError, render_error_message};
use preferences::FilePreferenceStore;
use sheets::{GoogleSheetsClient, SheetSource, StaticSource};

static TRACING_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
static TRACING_INIT: OnceLock<()> = OnceLock::new();

fn init_logging() {
    TRACING_INIT.get_or_init(|| {
        let log_dir = crate::config::log_dir();
        if let Err(err) = std::fs::create_dir_all(&log_dir) {
            eprintln!(
                "failed to create log directory {}: {err}",
                log_dir.display()
            );
            return;
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, "kvkbot.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = TRACING_GUARD.set(guard);

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .with_ansi(false)
            .init();
    });
}

#[derive(Debug, Parser)]
#[command(name = "kvkbot")]
#[command(about = "Answers KvK stat and top commands from the kingdom spreadsheet")]
struct Args {
    /// Answer from a saved JSON grid instead of the live sheet
    #[arg(long, value_name = "FILE")]
    grid: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    dotenv::dotenv().ok();
    init_logging();

    if let Err(err) = run(args) {
        tracing::error!(error = %render_error_message(&err), "kvkbot stopped");
        eprintln!("{}", render_error_message(&err));
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let cfg = Config::from_env()?;
    let preferences = FilePreferenceStore::new(cfg.preferences_path.clone());

    match args.grid {
        Some(path) => {
            let source = StaticSource::from_json_file(&path)
                .map_err(|err| AppError::runtime("load grid file", err))?;
            tracing::info!(path = %path.display(), "answering from saved grid");
            serve(source, preferences, &cfg)
        }
        None => {
            let source = GoogleSheetsClient::new(&cfg.sheets)
                .map_err(|err| AppError::runtime("create sheets client", err))?;
            serve(source, preferences, &cfg)
        }
    }
}

/// Reads `<author_id> <message>` lines from stdin and prints the replies.
fn serve<S: SheetSource>(
    source: S,
    preferences: FilePreferenceStore,
    cfg: &Config,
) -> Result<(), AppError> {
    let provider = SnapshotProvider::new(
        source,
        cfg.sheets.range.clone(),
        cfg.fields.clone(),
        cfg.snapshot_ttl,
    );
    let mut bot = Bot::new(provider, preferences, cfg.top_limit);
    tracing::info!(range = %cfg.sheets.range, "kvkbot ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.map_err(AppError::Console)?;
        let Some((author, message)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        if let Some(reply) = bot.handle(author, message.trim()) {
            writeln!(stdout, "{}", reply.render()).map_err(AppError::Console)?;
            stdout.flush().map_err(AppError::Console)?;
        }
    }
    Ok(())
}
