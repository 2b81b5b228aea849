use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use news_dashboard::api::{build_router, ApiState};
use news_dashboard::config::AppConfig;
use news_dashboard::db::Database;
use news_dashboard::logging::{init_logging, OperationTimer};
use news_dashboard::metrics::RefreshMetrics;
use news_dashboard::nlp::{EntityTagger, RuleBasedTagger};
use news_dashboard::refresh::{load_snapshot, RefreshLoop, TickOutcome};
use news_dashboard::repository::{NewsStore, SqliteStore};
use news_dashboard::snapshot::snapshot_channel;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API and keep entities refreshed in the background
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a single refresh tick and exit
    Refresh,
    /// Create the database schema if it does not exist
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(std::path::Path::new),
        config.logging.format == "json",
    )?;
    RefreshMetrics::describe();

    info!("Starting news-dashboard");

    match cli.command {
        Commands::Serve { host, port } => serve(&config, host, port).await,
        Commands::Refresh => refresh_once(&config).await,
        Commands::InitDb => init_db(&config),
    }
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let mut database_config = config.database.clone();
    database_config.url = config.get_database_url();
    Database::with_config(&database_config)
        .with_context(|| format!("Failed to open database at {}", database_config.url))
}

fn build_components(config: &AppConfig) -> Result<(Arc<dyn NewsStore>, Arc<dyn EntityTagger>)> {
    let store: Arc<dyn NewsStore> = Arc::new(SqliteStore::new(open_database(config)?));
    let tagger: Arc<dyn EntityTagger> = Arc::new(
        RuleBasedTagger::new(config.nlp.max_text_length).context("Failed to create entity tagger")?,
    );
    Ok((store, tagger))
}

/// Serve the API until Ctrl-C, refreshing in the background
async fn serve(config: &AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let (store, tagger) = build_components(config)?;

    let timer = OperationTimer::new("initial_snapshot");
    let initial = load_snapshot(store.as_ref())
        .await
        .context("Failed to load initial snapshot")?;
    let (posts, groups, entities) = initial.counts();
    info!(posts, groups, entities, duration_ms = timer.finish(), "Initial snapshot loaded");
    RefreshMetrics.record_snapshot(posts, groups, entities);

    let (publisher, reader) = snapshot_channel(initial);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresh = RefreshLoop::new(store, tagger, publisher, &config.refresh);
    let refresh_task = tokio::spawn(refresh.run(shutdown_rx));

    let app = build_router(ApiState::new(reader, config.display.clone()));

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("News dashboard API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down refresh loop");
    shutdown_tx.send_replace(true);
    refresh_task.await.context("Refresh loop task failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
    }
}

/// Run one tick against the configured store
async fn refresh_once(config: &AppConfig) -> Result<()> {
    let (store, tagger) = build_components(config)?;

    let initial = load_snapshot(store.as_ref()).await?;
    let (publisher, _reader) = snapshot_channel(initial);

    let refresh = RefreshLoop::new(store, tagger, publisher, &config.refresh);
    match refresh.tick().await {
        TickOutcome::Refreshed(report) => {
            info!(
                posts_processed = report.posts_processed,
                entities_inserted = report.entities_inserted,
                "Refresh complete"
            );
            Ok(())
        }
        TickOutcome::Failed { stage, error } => {
            Err(anyhow::anyhow!("Refresh failed during {}: {}", stage, error))
        }
        TickOutcome::TimedOut(secs) => Err(anyhow::anyhow!("Refresh timed out after {}s", secs)),
    }
}

/// Create the schema and report table sizes
fn init_db(config: &AppConfig) -> Result<()> {
    let database = open_database(config)?;
    let stats = database.get_table_stats()?;
    info!(
        groups = stats.groups,
        posts = stats.posts,
        entities = stats.entities,
        "Database ready"
    );
    Ok(())
}
