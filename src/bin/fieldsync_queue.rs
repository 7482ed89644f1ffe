use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldsync_lib::application::ports::MutationQueue;
use fieldsync_lib::infrastructure::evidence::HttpEvidenceGateway;
use fieldsync_lib::{
    AppConfig, ConnectivityMonitor, DrainTrigger, EvidenceReconciler, SqliteMutationQueue,
    SyncEngine,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fieldsync-queue")]
#[command(about = "Inspect and flush the fieldsync evidence queue", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Queue database URL (defaults to the app's data directory)
    #[arg(long, env = "FIELDSYNC_DATABASE_URL")]
    database_url: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List queued mutations in upload order
    List,
    /// Pending counts per task and stage
    Stats,
    /// Upload everything queued now, treating the device as online
    Drain {
        /// Evidence service base URL
        #[arg(long, env = "FIELDSYNC_EVIDENCE_URL")]
        evidence_url: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueEntry {
    id: i64,
    client_ref: String,
    task_id: String,
    stage: String,
    bytes: usize,
    enqueued_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueStats<T: Serialize> {
    pending: u64,
    by_task: Vec<T>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fieldsync_lib::init_logging();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url.clone() {
        config.database.url = url;
    }
    if let Commands::Drain {
        evidence_url: Some(url),
    } = &cli.command
    {
        config.evidence_service.base_url = url.trim_end_matches('/').to_string();
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    let queue = Arc::new(
        SqliteMutationQueue::open(&config.database)
            .await
            .with_context(|| format!("failed to open queue at {}", config.database.url))?,
    );

    let result = match cli.command {
        Commands::List => list(&queue, cli.pretty).await,
        Commands::Stats => stats(&queue, cli.pretty).await,
        Commands::Drain { .. } => drain(&config, queue.clone(), cli.pretty).await,
    };

    queue.close().await;
    result
}

async fn list(queue: &SqliteMutationQueue, pretty: bool) -> Result<()> {
    let entries: Vec<QueueEntry> = queue
        .list_all()
        .await?
        .into_iter()
        .map(|mutation| QueueEntry {
            id: mutation.id.value(),
            client_ref: mutation.client_ref.to_string(),
            task_id: mutation.task_id.to_string(),
            stage: mutation.stage.to_string(),
            bytes: mutation.payload.len(),
            enqueued_at: mutation.enqueued_at.to_rfc3339(),
        })
        .collect();
    print_json(&entries, pretty)
}

async fn stats(queue: &SqliteMutationQueue, pretty: bool) -> Result<()> {
    let stats = QueueStats {
        pending: queue.pending_count().await?,
        by_task: queue.pending_summary().await?,
    };
    print_json(&stats, pretty)
}

async fn drain(config: &AppConfig, queue: Arc<SqliteMutationQueue>, pretty: bool) -> Result<()> {
    let gateway = HttpEvidenceGateway::new(&config.evidence_service, config.sync.upload_timeout())?;
    let connectivity = Arc::new(ConnectivityMonitor::new(true, Duration::ZERO));
    let reconciler = Arc::new(EvidenceReconciler::new(None));
    reconciler.restore_pending(&queue.list_all().await?).await;

    let engine = SyncEngine::new(queue, Arc::new(gateway), connectivity, reconciler)
        .with_upload_timeout(config.sync.upload_timeout())
        .with_rejection_policy(config.sync.rejection_policy);

    let report = engine
        .request_drain(DrainTrigger::Manual)
        .await
        .context("drain failed")?;
    print_json(&report, pretty)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
