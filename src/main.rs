use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clan_tracker::api::routes::players::PlayerResponse;
use clan_tracker::api::state::AppState;
use clan_tracker::config::AppConfig;
use clan_tracker::models::Shard;
use clan_tracker::parse_duration;
use clan_tracker::provider::PubgClient;
use clan_tracker::resolve::SourceSelector;
use clan_tracker::storage::{CacheStore, JsonlCacheStore, StorageConfig};
use clan_tracker::sync::BackgroundTasks;

#[derive(Parser)]
#[command(name = "clan-tracker")]
#[command(about = "Clan and player stats tracker with a local cache over the live stats feed")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Provider request timeout (e.g., "10s", "1m")
    #[arg(long)]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,

        /// Log all HTTP requests
        #[arg(long)]
        access_log: bool,
    },

    /// Look up a player, preferring cached data merged with the live feed
    Lookup {
        /// Platform shard (steam, kakao, psn, xbox, console)
        shard: String,

        /// In-game nickname
        nickname: String,
    },

    /// Force a live fetch for a player
    Refresh {
        shard: String,
        nickname: String,
    },
}

fn init_tracing(cli: &Cli, config: &AppConfig) -> Result<()> {
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let mut filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if matches!(cli.command, Commands::Serve { access_log: true, .. }) {
        filter = filter.add_directive("tower_http=debug".parse()?);
    }

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

fn build_selector(cli: &Cli, config: &AppConfig) -> Result<SourceSelector> {
    let storage = StorageConfig::new(config.data_dir.clone());
    let store: Arc<dyn CacheStore> = Arc::new(
        JsonlCacheStore::open(storage)
            .with_context(|| format!("opening cache in {:?}", config.data_dir))?,
    );

    let api_key = config.provider.api_key();
    if api_key.is_none() {
        tracing::warn!(
            "{} is not set; live lookups will be rejected upstream",
            config.provider.api_key_env
        );
    }

    let mut client_config = config.provider.to_client_config(api_key);
    if let Some(raw) = &cli.timeout {
        client_config.timeout = parse_duration(raw)
            .with_context(|| format!("invalid --timeout: {}", raw))?;
    }
    let provider = Arc::new(PubgClient::new(client_config)?);

    let tasks = BackgroundTasks::new(store.clone(), config.background.max_concurrent_tasks);
    Ok(SourceSelector::new(store, provider, tasks))
}

fn print_player(response: &PlayerResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&PathBuf::from(&cli.config))?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(dir);
    }

    init_tracing(&cli, &config)?;
    tracing::info!("Starting clan-tracker v{}", env!("CARGO_PKG_VERSION"));

    let selector = build_selector(&cli, &config)?;
    let tasks = selector.tasks().clone();

    match cli.command {
        Commands::Serve { host, port, .. } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = AppState::new(selector, config.server.cors_origin.clone());
            let app = clan_tracker::api::build_router(state);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("Draining {} background tasks", tasks.pending());
        }
        Commands::Lookup { shard, nickname } => {
            let shard: Shard = shard.parse()?;
            let resolved = selector.resolve(shard, &nickname).await?;
            print_player(&PlayerResponse::from_resolved(resolved))?;
        }
        Commands::Refresh { shard, nickname } => {
            let shard: Shard = shard.parse()?;
            let resolved = selector.refresh(shard, &nickname).await?;
            print_player(&PlayerResponse::from_resolved(resolved))?;
        }
    }

    tasks.wait_idle().await;
    Ok(())
}
