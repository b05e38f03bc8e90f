//! ScriptHost - multi-tenant script sandbox host.
//!
//! Main entry point for the ScriptHost CLI and server.

mod scripts;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scripthost_api::{ApiServer, AppState, ScriptRegistry};
use scripthost_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use scripthost_event::EventBus;
use scripthost_kv::{KvStore, ListLimits, MemoryKvStore, spawn_sweeper};
use scripthost_runtime::{CoordinatorOptions, HttpFetcher, InvocationCoordinator};

/// ScriptHost CLI.
#[derive(Parser)]
#[command(name = "scripthost")]
#[command(about = "Multi-tenant script sandbox host")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server in foreground (default)
    Run {
        /// Override server host
        #[arg(long)]
        host: Option<String>,

        /// Override server port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration file and exit
    CheckConfig,
}

/// Initialize tracing with a console layer and, when a log directory is
/// configured, a daily rolling file layer.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.log_dir {
        Some(dir) => {
            let dir = PathBuf::from(ConfigLoader::expand_path(&dir.to_string_lossy()));
            std::fs::create_dir_all(&dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("scripthost")
                .filename_suffix("log")
                .max_log_files(14)
                .build(&dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the whole process.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(ConfigLoader::load_or_default(path)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    init_tracing(&config.logging)?;

    match cli.command {
        Some(Commands::CheckConfig) => check_config(&cli.config, &config),
        Some(Commands::Run { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await
        }
        None => run_server(config).await,
    }
}

fn check_config(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    for err in &result.errors {
        error!("{}: {}", err.path, err.message);
    }
    if result.is_valid() {
        info!("Configuration {} is valid", path.display());
        Ok(())
    } else {
        Err(format!("configuration has {} error(s)", result.errors.len()).into())
    }
}

/// Run the server in foreground.
async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting ScriptHost v{}", env!("CARGO_PKG_VERSION"));

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!("{}: {}", err.path, err.message);
        }
        return Err("invalid configuration".into());
    }

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::with_limits(ListLimits {
        default: config.kv.default_list_limit,
        max: config.kv.max_list_limit,
    }));
    let background = CancellationToken::new();
    let sweeper = config
        .kv
        .sweep_interval()
        .map(|interval| spawn_sweeper(kv.clone(), interval, background.clone()));

    let bus = EventBus::new(config.event.clone());
    let coordinator = InvocationCoordinator::new(
        kv,
        bus,
        Arc::new(HttpFetcher::new()),
        CoordinatorOptions::from(&config),
    );

    let registry = Arc::new(ScriptRegistry::new());
    scripts::register_builtin(&registry)?;
    info!("Registered scripts: {}", registry.names().join(", "));

    let state = Arc::new(AppState::new(coordinator.clone(), registry, &config));
    let server = ApiServer::new(config.server.clone(), state);
    info!("Serving on http://{}", server.addr());

    let shutdown = {
        let coordinator = coordinator.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Shutdown signal received");
            coordinator.shutdown();
        }
    };
    let result = server.run(shutdown).await;

    background.cancel();
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    let stats = coordinator.stats();
    info!(
        "ScriptHost stopped: {} invocations ({} completed, {} cancelled, {} failed)",
        stats.started, stats.completed, stats.cancelled, stats.failed
    );

    result.map_err(Into::into)
}
