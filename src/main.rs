use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sms_health::{
    config::AppConfig,
    engine::{EvaluatorSettings, EventIngestor, IngestOutcome, Recorder, WindowEvaluator},
    persistence::RedisWindowStore,
    sink::{FanoutSink, JsonSink, LogSink, ReportSink},
    supervisor::Supervisor,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `app.yaml`.
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the evaluation scheduler and the ingestion server.
    Run(RunArgs),
    /// Evaluates a single window and prints the report.
    Evaluate(EvaluateArgs),
    /// Records newline-delimited event envelopes read from stdin.
    Ingest,
}

#[derive(Args)]
struct RunArgs {
    /// Also print every report as a JSON line on stdout.
    #[arg(long)]
    json_reports: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Evaluation time in epoch milliseconds; defaults to now.
    #[arg(long)]
    now_ms: Option<i64>,
    /// Print the report as a JSON line instead of log lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(cli.config_dir.as_deref())?;
    tracing::debug!(
        redis_url = %config.redis_url(),
        ttl_minutes = config.ttl_minutes,
        lag_minutes = config.processing_interval_minutes,
        threshold_percent = config.error_threshold_percent,
        "Configuration loaded."
    );

    let store = Arc::new(RedisWindowStore::connect(&config.redis_url(), config.store_timeout_ms).await?);

    match cli.command {
        Commands::Run(args) => {
            let sink: Arc<dyn ReportSink> = if args.json_reports {
                Arc::new(FanoutSink::new(vec![Arc::new(LogSink), Arc::new(JsonSink::stdout())]))
            } else {
                Arc::new(LogSink)
            };
            let supervisor = Supervisor::new(config, store, sink)?;
            tracing::info!("Supervisor initialized, starting monitoring...");
            supervisor.run().await?;
        }
        Commands::Evaluate(args) => {
            let sink: Arc<dyn ReportSink> =
                if args.json { Arc::new(JsonSink::stdout()) } else { Arc::new(LogSink) };
            let evaluator = WindowEvaluator::new(
                store,
                sink,
                EvaluatorSettings {
                    lag_minutes: config.processing_interval_minutes,
                    threshold_percent: config.error_threshold_percent,
                },
            );
            let now_ms = args.now_ms.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
            evaluator.evaluate(now_ms).await?;
        }
        Commands::Ingest => ingest_stdin(store, &config).await?,
    }

    Ok(())
}

/// Handles every stdin line as an independent invocation and summarizes the
/// outcomes.
async fn ingest_stdin(
    store: Arc<RedisWindowStore>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let ingestor = Arc::new(EventIngestor::new(Recorder::new(store, config.ttl())));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = tokio::task::JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let ingestor = Arc::clone(&ingestor);
        tasks.spawn(async move { ingestor.handle_raw(&line).await });
    }

    let (mut recorded, mut ignored, mut malformed, mut failed) = (0u64, 0u64, 0u64, 0u64);
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(IngestOutcome::Recorded) => recorded += 1,
            Ok(IngestOutcome::Ignored) => ignored += 1,
            Ok(IngestOutcome::Malformed) => malformed += 1,
            Ok(IngestOutcome::StoreFailed) => failed += 1,
            Err(e) => {
                tracing::error!(error = %e, "Ingestion task panicked.");
                failed += 1;
            }
        }
    }
    tracing::info!(recorded, ignored, malformed, failed, "Ingestion finished.");
    Ok(())
}
