pub mod worker;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nv_service::NvService;
use nv_storage::{db::Db, qdrant::QdrantIndex};

#[derive(Debug, Parser)]
#[command(
	version = nv_cli::VERSION,
	rename_all = "kebab",
	styles = nv_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = nv_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let index = QdrantIndex::new(&config.storage.index)?;
	let poll_interval = Duration::from_millis(config.sync.poll_interval_ms);
	let max_ticks = config.sync.max_ticks;
	let (trigger, requests) = worker::channel();

	worker::spawn_listener(&db.pool, &config.sync.notify_channel, trigger.clone()).await?;
	worker::spawn_poller(trigger, poll_interval);

	tracing::info!(
		poll_interval_ms = poll_interval.as_millis() as u64,
		max_ticks,
		notify_channel = %config.sync.notify_channel,
		"Worker started."
	);

	let service = Arc::new(NvService::new(config, db, index));

	worker::drive(service, requests, max_ticks).await;

	Ok(())
}

fn init_tracing(config: &nv_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
