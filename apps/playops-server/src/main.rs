mod shutdown;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use time_engine::clock::{
    format_hms, BalanceSource, ClockDriver, LocalBalanceSource, NoticeVariant, NotificationBus,
};
use time_engine::infra::remote::HttpBalanceClient;
use time_engine::module::MODULE_NAME;
use time_engine::{TimeEngine, TimeEngineConfig};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// PlayOps Server - time-balance engine for the PlayOps game
#[derive(Parser)]
#[command(name = "playops-server")]
#[command(about = "PlayOps Server - time-balance engine for the PlayOps game")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run on the in-memory store instead of the configured database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Run a single reconciliation pass and exit
    Reconcile,
    /// Render a user's balance clock in the terminal
    Watch {
        /// Profile to watch
        #[arg(long)]
        user: Uuid,
        /// Base URL of a running server; the local store is used when omitted
        #[arg(long)]
        server: Option<Url>,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    if let Some(path) = cli.config.as_deref() {
        if !path.exists() {
            return Err(anyhow!("config file not found: {}", path.display()));
        }
    }

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("PlayOps Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config).await,
        Commands::Reconcile => reconcile_once(config).await,
        Commands::Watch {
            user,
            server,
            seconds,
        } => watch_clock(config, user, server, seconds).await,
    }
}

/// Build the engine and wire its store: the configured database, or the
/// in-memory store when there is none (`--mock` clears it).
async fn init_engine(config: &AppConfig) -> Result<TimeEngine> {
    let engine = TimeEngine::from_app_config(config)?;
    match &config.database {
        Some(db) => {
            engine
                .init_with_database(db, Path::new(&config.server.home_dir))
                .await?
        }
        None => {
            tracing::warn!("No database configuration found, running on the in-memory store");
            engine.init_in_memory();
        }
    }
    Ok(engine)
}

fn request_timeout(config: &AppConfig) -> Duration {
    match config.server.timeout_sec {
        0 => Duration::from_secs(30),
        secs => Duration::from_secs(secs),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing time engine...");
    let engine = init_engine(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let router = engine.router(request_timeout(&config))?;

    let cancel = CancellationToken::new();
    let scheduler = tokio::spawn(engine.scheduler()?.run(cancel.clone()));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    let stop = cancel.clone();
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = shutdown::wait_for_shutdown().await {
                tracing::error!(error = %e, "signal handler failed; shutting down");
            }
            tracing::info!("shutdown requested");
            stop.cancel();
        })
        .await;

    cancel.cancel();
    if let Err(e) = scheduler.await {
        tracing::warn!(error = %e, "reconcile scheduler task failed");
    }
    served.context("HTTP server failed")?;
    tracing::info!("PlayOps Server stopped");
    Ok(())
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let engine = TimeEngine::from_app_config(&config)?;
    tracing::debug!(config = ?engine.config(), "time_engine configuration");

    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn reconcile_once(config: AppConfig) -> Result<()> {
    let engine = init_engine(&config).await?;
    let summary = engine.service()?.reconcile().await?;
    println!(
        "reconcile finished at {}: {} updated, {} failed, streaks {}",
        summary.timestamp.to_rfc3339(),
        summary.profiles_updated,
        summary.profiles_failed,
        summary
            .streaks_updated
            .map(|n| n.to_string())
            .unwrap_or_else(|| "skipped".to_string()),
    );
    Ok(())
}

async fn watch_clock(
    config: AppConfig,
    user: Uuid,
    server: Option<Url>,
    seconds: Option<u64>,
) -> Result<()> {
    let tc: TimeEngineConfig = config.module_config(MODULE_NAME)?;
    // The local engine must outlive the driver.
    let (source, _engine): (Arc<dyn BalanceSource>, Option<TimeEngine>) = match server {
        Some(base) => {
            tracing::info!(%base, "watching remote balance");
            let client = reqwest::Client::builder()
                .timeout(request_timeout(&config))
                .build()?;
            let remote: Arc<dyn BalanceSource> = Arc::new(HttpBalanceClient::new(client, base));
            (remote, None)
        }
        None => {
            let engine = init_engine(&config).await?;
            let api = engine.api()?;
            let local: Arc<dyn BalanceSource> = Arc::new(LocalBalanceSource::new(api));
            (local, Some(engine))
        }
    };
    let bus = NotificationBus::new(4);
    let _notices = bus.subscribe(|notice| {
        let marker = match notice.variant {
            NoticeVariant::Default => "info",
            NoticeVariant::Destructive => "error",
        };
        eprintln!("[{marker}] {}", notice.title);
    })?;

    let driver = Arc::new(ClockDriver::new(
        source,
        user,
        bus,
        tc.tick_interval(),
        tc.resync_interval(),
    ));
    let mut display = driver.subscribe();

    let cancel = CancellationToken::new();
    let runner = tokio::spawn(driver.clone().run(cancel.clone()));
    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let stop = shutdown::wait_for_shutdown();
    tokio::pin!(stop);

    let mut out = std::io::stdout();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            res = &mut stop => {
                res?;
                break;
            }
            changed = display.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(hours) = *display.borrow_and_update() {
                    write!(out, "\r{}", format_hms(hours))?;
                    out.flush()?;
                }
            }
        }
    }
    writeln!(out)?;

    cancel.cancel();
    runner.await??;
    Ok(())
}
