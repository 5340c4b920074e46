use anyhow::{Context, Result};
use clap::Parser;
use forumtree::api::HttpForumClient;
use forumtree::config::{Config, TOKEN_ENV_VAR};
use forumtree::sync::SyncCoordinator;
use forumtree::util::strip_control_chars;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod app;
mod ui;

use app::{App, AppEvent};

/// Get the config directory path (~/.config/forumtree/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("forumtree");
    Ok(config_dir)
}

/// Create the config directory with user-only permissions.
fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(config_dir)
            .context("Failed to read config directory metadata")?
            .permissions();
        perms.set_mode(0o700);
        if let Err(e) = std::fs::set_permissions(config_dir, perms) {
            eprintln!(
                "Warning: could not restrict permissions on {}: {}",
                config_dir.display(),
                e
            );
        }
    }
    Ok(())
}

/// Route `tracing` output. The TUI owns the terminal, so it logs to a file.
fn init_tracing(config_dir: &Path, to_file: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env();
    if to_file {
        ensure_config_dir(config_dir)?;
        let log_path = config_dir.join("forumtree.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file '{}'", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "forumtree",
    about = "Browse and edit a forum server's group/forum hierarchy"
)]
struct Args {
    /// Config file (default: ~/.config/forumtree/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server API base URL, overriding api_base_url
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Print the hierarchy to stdout instead of starting the UI
    #[arg(long)]
    print: bool,

    /// Levels to expand below the root, overriding initial_expand_depth
    #[arg(long, value_name = "N")]
    depth: Option<usize>,
}

/// Load once and write the visible rows as plain text.
async fn print_hierarchy(mut sync: SyncCoordinator) -> Result<()> {
    sync.load_root()
        .await
        .context("Failed to load the forum hierarchy")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for row in sync.display_rows() {
        writeln!(out, "{}", strip_control_chars(&row.to_plain_line()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    init_tracing(&config_dir, !args.print)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;
    tracing::debug!(?config, "Effective configuration");

    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.api_base_url.clone())
        .context("No server configured: set api_base_url in config.toml or pass --base-url")?;
    let token = config.resolve_token(std::env::var(TOKEN_ENV_VAR).ok());

    let http_client =
        HttpForumClient::default_http_client().context("Failed to create HTTP client")?;
    let client = HttpForumClient::new(http_client, &base_url, token, config.request_timeout())
        .with_context(|| format!("Cannot use server URL '{}'", base_url))?;

    let depth = args.depth.unwrap_or(config.initial_expand_depth);
    let sync = SyncCoordinator::new(Arc::new(client), depth);

    if args.print {
        return print_hierarchy(sync).await;
    }

    let mut app = App::new(sync);
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
