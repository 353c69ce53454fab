use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use databasing::config::{self, Config};
use databasing::logging::init_logging;
use databasing::{
    postgresql, sqlexecutor, ChannelObserver, Connector, LogLevel, MessageLogger,
    PostgresqlExecutor, SqlExecutor, SqlExecutorImpl,
};

#[derive(Parser)]
#[command(name = "databasing")]
#[command(about = "Run SQL statement files and inspect database watermarks")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "PostgreSQL DSN, sqlite: URL, or SQLite file path")]
    target: Option<String>,

    #[arg(long, global = true, help = "TRACE, DEBUG, INFO, WARN, ERROR, FATAL or PANIC")]
    log_level: Option<LogLevel>,

    #[arg(long, global = true, help = "Print observer notifications after the command")]
    watch: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Report the relation with the oldest frozen transaction id")]
    Watermark,

    #[command(about = "Execute each statement line of a SQL file")]
    Exec {
        #[arg(long, help = "File with one SQL statement per line")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(target) = &cli.target {
        config.database.target = target.clone();
    }
    if let Some(level) = cli.log_level {
        config.database.log_level = level;
    }

    init_logging(&Some(config.effective_logging()))?;

    let connector = Connector::new(&config.database.target)
        .context("a database target is required (--target or [database].target)")?;
    let ctx = config.database.context();
    let level = config.database.log_level;

    let (observer, mut notifications) = ChannelObserver::new("databasing-cli");
    let observer = Arc::new(observer);

    match cli.command {
        Commands::Watermark => {
            let mut executor = PostgresqlExecutor::new(
                connector,
                MessageLogger::new(postgresql::PRODUCT_ID, level),
            );
            if cli.watch {
                executor.register_observer(&ctx, observer.clone()).await?;
            }
            let result = executor.get_current_watermark(&ctx).await;
            if cli.watch {
                executor.unregister_observer(&ctx, &*observer).await?;
            }

            let watermark = result.context("failed to read the current watermark")?;
            println!("{}", serde_json::to_string_pretty(&watermark)?);
        }
        Commands::Exec { file } => {
            let mut executor = SqlExecutorImpl::new(
                connector,
                MessageLogger::new(sqlexecutor::PRODUCT_ID, level),
            );
            if cli.watch {
                executor.register_observer(&ctx, observer.clone()).await?;
            }
            let result = executor.process_file(&ctx, &file).await;
            if cli.watch {
                executor.unregister_observer(&ctx, &*observer).await?;
            }

            let summary =
                result.with_context(|| format!("failed to process {}", file.display()))?;
            println!(
                "{}: {} statements, {} failures",
                file.display(),
                summary.lines,
                summary.failures
            );
        }
    }

    // Deliveries still in flight hold the last references to the observer.
    drop(observer);
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(message) = notifications.recv().await {
            println!("{}", message);
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Timed out waiting for observer notifications");
    }

    Ok(())
}
