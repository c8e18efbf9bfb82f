//! `tenor`: the enrichment worker binary.
//!
//! Reads `tenor.toml` (or the path given with `--config`) plus `TENOR_*`
//! environment variables, opens the SQLite store and either listens on the
//! queue or works through a batch of ids.
//!
//! ```text
//! tenor run
//! tenor enrich --item-id 7301234567890
//! tenor backfill --limit 50
//! tenor requeue --status failed
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tenor_core::{enrichment::EnrichmentStatus, store::ResultStore};
use tenor_store_sqlite::SqliteStore;
use tenor_worker::{
  WorkerConfig, build_pipeline,
  config::expand_tilde,
  queue::{RedisPublisher, RedisSubscription},
  worker,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tenor video alignment enrichment worker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tenor.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Subscribe to the queue and process items until interrupted.
  Run,
  /// Process a single item without going through the queue.
  Enrich {
    #[arg(long)]
    item_id: String,
  },
  /// Process catalogued items that have never been enriched, newest first.
  Backfill {
    #[arg(long, default_value_t = 100)]
    limit: usize,
  },
  /// Print the ids with a given status, most recently enriched first.
  List {
    #[arg(long)]
    status: EnrichmentStatus,
  },
  /// Publish every id with a given status to the queue again.
  Requeue {
    #[arg(long)]
    status: EnrichmentStatus,
  },
  /// Publish ids to the queue.
  Enqueue {
    #[arg(required = true)]
    item_ids: Vec<String>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = WorkerConfig::load(&cli.config).with_context(|| {
    format!("failed to load configuration from {:?}", cli.config)
  })?;

  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  match cli.command {
    Command::Run => {
      let pipeline = pipeline(&config, &store)?;
      let mut subscription =
        RedisSubscription::connect(&config.queue.url, &config.queue.channel)
          .await
          .with_context(|| {
            format!("failed to subscribe to {:?}", config.queue.channel)
          })?;

      let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
          tracing::error!(error = %e, "failed to listen for ctrl-c");
          std::future::pending::<()>().await;
        }
      };
      worker::run(&mut subscription, &pipeline, shutdown)
        .await
        .context("subscription failed")?;
    }

    Command::Enrich { item_id } => {
      let pipeline = pipeline(&config, &store)?;
      let report = pipeline.process(&item_id).await;
      match &report.error {
        None => println!("{}: {}", report.item_id, report.stage),
        Some(e) => println!("{}: {} ({e})", report.item_id, report.stage),
      }
    }

    Command::Backfill { limit } => {
      let pipeline = pipeline(&config, &store)?;
      let item_ids = store
        .unprocessed_items(limit)
        .await
        .context("failed to list unprocessed items")?;
      tracing::info!(count = item_ids.len(), "backfilling");
      let tally = worker::process_all(&pipeline, &item_ids).await;
      println!(
        "completed {}, failed {}, deleted {}",
        tally.completed, tally.failed, tally.deleted
      );
    }

    Command::List { status } => {
      for item_id in store
        .items_with_status(status)
        .await
        .context("failed to list items")?
      {
        println!("{item_id}");
      }
    }

    Command::Requeue { status } => {
      let item_ids = store
        .items_with_status(status)
        .await
        .context("failed to list items")?;
      publish(&config, &item_ids).await?;
    }

    Command::Enqueue { item_ids } => {
      publish(&config, &item_ids).await?;
    }
  }

  Ok(())
}

fn pipeline(
  config: &WorkerConfig,
  store: &Arc<SqliteStore>,
) -> anyhow::Result<tenor_worker::WorkerPipeline> {
  let knowledge = config.knowledge().context("failed to load knowledge base")?;
  tracing::info!(
    subjects = knowledge.knowledge().len(),
    "knowledge base loaded"
  );
  build_pipeline(config, Arc::new(knowledge), Arc::clone(store))
    .context("failed to set up collaborators")
}

async fn publish(
  config: &WorkerConfig,
  item_ids: &[String],
) -> anyhow::Result<()> {
  let mut publisher =
    RedisPublisher::connect(&config.queue.url, &config.queue.channel)
      .await
      .with_context(|| format!("failed to connect to {}", config.queue.url))?;
  for item_id in item_ids {
    let receivers = publisher
      .publish(item_id)
      .await
      .with_context(|| format!("failed to publish {item_id}"))?;
    if receivers == 0 {
      tracing::warn!(item_id = %item_id, "no worker is listening");
    }
  }
  println!("published {} item(s) to {}", item_ids.len(), config.queue.channel);
  Ok(())
}
