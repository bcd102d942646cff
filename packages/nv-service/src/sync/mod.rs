//! Record store to vector index synchronization.
//!
//! One tick claims a batch, uploads it, and writes the outcome back. The driver repeats ticks
//! until a tick claims nothing or the tick limit is reached.

pub mod driver;
pub mod reconciler;
pub mod selector;
pub mod uploader;

use serde::{Deserialize, Serialize};
use time::Duration;

use nv_config::Config;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
	/// Records selected by each tick that ran, in order.
	pub processed_per_tick: Vec<usize>,
}
impl SyncReport {
	pub fn total(&self) -> usize {
		self.processed_per_tick.iter().sum()
	}
}

/// The slice of configuration the sync pipeline reads.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
	pub batch_size: u32,
	pub max_attempts: u32,
	pub lease: Duration,
	pub namespace: String,
	pub doc_type: String,
	pub source: String,
}
impl SyncSettings {
	pub fn from_config(cfg: &Config) -> Self {
		Self {
			batch_size: cfg.sync.batch_size,
			max_attempts: cfg.sync.max_attempts,
			lease: Duration::seconds(cfg.sync.claim_lease_seconds),
			namespace: cfg.storage.index.namespace.clone(),
			doc_type: cfg.storage.index.doc_type.clone(),
			source: cfg.storage.index.source.clone(),
		}
	}
}
