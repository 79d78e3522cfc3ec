//! Command line interface for operating the alert server. Supports one-shot
//! feed generation, config inspection, and the HTTP serving loop with its
//! periodic aggregation job.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use capstan::aggregate;
use capstan::config::{self, Config};
use capstan::server::{self, AppState};
use capstan::store::Store;
use capstan::types::TimeStr;

/// Command line interface entry point.
#[derive(Parser)]
#[command(
    name = "capstan",
    author,
    version,
    about = "File-backed server for CAP alerts and an aggregated Atom alert feed"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,
    /// Override the configured storage root.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Override the configured logging level.
    #[arg(short, long)]
    log_level: Option<String>,
    /// Override the configured maximum upload size, in bytes.
    #[arg(short, long)]
    max_upload_size: Option<u64>,
    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Launch the HTTP service with the periodic feed generation job.
    Serve,
    /// Run one aggregation pass and publish the feed.
    Generate,
    /// Print the effective configuration as TOML.
    Config,
}

/// Execute the selected CLI subcommand.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = Config::load(&cli.config)?;
    apply_flags(&cli, &mut cfg);
    init_tracing(&cfg.log_level);

    match cli.command {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
        Commands::Generate => {
            let store = Store::new(cfg.root.clone())?;
            store.init()?;
            let feed = aggregate::build_feed(&store, &cfg, TimeStr::now())?;
            let entries = feed.entries.len();
            let written = store.publish_feed(&feed)?;
            info!(entries, bytes = written, "feed generated");
        }
        Commands::Serve => {
            let store = Store::new(cfg.root.clone())?;
            store.init()?;
            let addr: SocketAddr = cfg.bind.parse().context("parsing bind address")?;
            let state = Arc::new(AppState {
                store,
                config: cfg.clone(),
            });

            // Publish once at startup, then on a fixed interval in the
            // background while requests are served.
            regenerate(&state);
            let ticker = state.clone();
            tokio::spawn(async move {
                let period = Duration::from_secs(ticker.config.feed_interval_secs.max(1));
                let mut interval = tokio::time::interval(period);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    regenerate(&ticker);
                }
            });

            info!(version = env!("CARGO_PKG_VERSION"), %addr, "capstan ready");
            info!("  use '/cap/' to pull the alert feed");
            info!("  use '/cap/{{reference}}' to pull one alert file");
            info!("  use '/upload' to upload alert files (multipart field uploadFile)");
            info!("  use '/feeds/{{file}}' and '/alerts/{{file}}' to download stored files");
            server::serve(addr, state, shutdown_signal()).await?;
        }
    }
    Ok(())
}

/// Regenerate and publish the feed, logging instead of propagating
/// failures; the next tick starts over from a clean directory scan.
fn regenerate(state: &AppState) {
    match aggregate::build_feed(&state.store, &state.config, TimeStr::now())
        .and_then(|feed| state.store.publish_feed(&feed))
    {
        Ok(bytes) => info!(bytes, "feed published"),
        Err(err) => error!(%err, "feed generation failed"),
    }
}

/// Resolves when the process receives an interrupt.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to install interrupt handler");
    }
}

/// Flags override config file values.
fn apply_flags(cli: &Cli, cfg: &mut Config) {
    if let Some(root) = &cli.root {
        cfg.root = root.clone();
    }
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }
    if let Some(size) = cli.max_upload_size {
        cfg.max_upload_size = size;
    }
    if let Some(bind) = &cli.bind {
        cfg.bind = bind.clone();
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config::DEFAULT_LOG_LEVEL));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan::atom;
    use capstan::store::{self, Kind};
    use std::{fs, time::Duration};
    use tempfile::TempDir;
    use tokio::{net::TcpListener, task};

    const AMBER_ALERT: &str = include_str!("../tests/data/cap_amber_alert.xml");

    fn write_config(dir: &TempDir, extra: &str) -> String {
        let path = dir.path().join("config.toml");
        let content = format!(
            "root = {:?}\nhost_name = \"http://alerts.example.com/\"\n{}",
            dir.path().join("data").to_string_lossy(),
            extra
        );
        fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn cli(config: &str, command: Commands) -> Cli {
        Cli {
            config: config.to_string(),
            root: None,
            log_level: None,
            max_upload_size: None,
            bind: None,
            command,
        }
    }

    #[tokio::test]
    async fn run_generate_publishes_a_feed() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "");
        let store = Store::new(dir.path().join("data")).unwrap();
        store.init().unwrap();
        store
            .store(Kind::Alerts, "KAR0-0306112239-SW.xml", AMBER_ALERT.as_bytes())
            .unwrap();

        run(cli(&config, Commands::Generate)).await.unwrap();

        let published = store.retrieve(Kind::Feeds, store::FEED_FILE).unwrap();
        let feed = atom::parse_feed(&published).unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].id, "KAR0-0306112239-SW");
    }

    #[tokio::test]
    async fn run_generate_fails_on_a_malformed_alert() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "");
        let store = Store::new(dir.path().join("data")).unwrap();
        store.init().unwrap();
        store
            .store(Kind::Alerts, "bad.xml", b"not an alert")
            .unwrap();

        assert!(run(cli(&config, Commands::Generate)).await.is_err());
        assert!(store.retrieve(Kind::Feeds, store::FEED_FILE).is_err());
    }

    #[tokio::test]
    async fn flags_override_config_values() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "max_upload_size = 1024\n");
        let mut cfg = Config::load(&config).unwrap();
        let cli = Cli {
            config,
            root: Some(dir.path().join("elsewhere")),
            log_level: Some("debug".into()),
            max_upload_size: Some(4096),
            bind: Some("127.0.0.1:9999".into()),
            command: Commands::Config,
        };
        apply_flags(&cli, &mut cfg);
        assert_eq!(cfg.root, dir.path().join("elsewhere"));
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.max_upload_size, 4096);
        assert_eq!(cfg.bind, "127.0.0.1:9999");
    }

    #[tokio::test]
    async fn run_serve_starts_http_and_publishes_at_startup() {
        let dir = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let config = write_config(&dir, &format!("bind = \"127.0.0.1:{port}\"\n"));

        let store = Store::new(dir.path().join("data")).unwrap();
        store.init().unwrap();
        store
            .store(Kind::Alerts, "KAR0-0306112239-SW.xml", AMBER_ALERT.as_bytes())
            .unwrap();

        let handle = task::spawn(run(cli(&config, Commands::Serve)));

        let url = format!("http://127.0.0.1:{port}/cap/");
        let mut body = None;
        for _ in 0..50 {
            if let Ok(resp) = reqwest::get(&url).await {
                if resp.status().is_success() {
                    body = Some(resp.text().await.unwrap());
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let body = body.expect("feed endpoint never became ready");
        assert!(body.contains("KAR0-0306112239-SW"));
        handle.abort();
    }
}
