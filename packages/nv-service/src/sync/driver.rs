use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	NvService, Result,
	sync::{SyncReport, SyncSettings, reconciler, selector, uploader},
};

impl NvService {
	/// Runs up to `max_ticks` select, upload, reconcile cycles and stops early on an empty batch.
	///
	/// Each invocation claims records under a fresh owner id, so concurrent runs never reconcile
	/// each other's records. Store failures abort the run.
	pub async fn run_sync_ticks(&self, max_ticks: u32) -> Result<SyncReport> {
		let settings = SyncSettings::from_config(&self.cfg);
		let owner = Uuid::new_v4();
		let store = self.backends.store.as_ref();
		let index = self.backends.index.as_ref();
		let mut report = SyncReport::default();

		for tick in 0..max_ticks {
			let batch = selector::select_batch(store, &settings, owner, OffsetDateTime::now_utc())
				.await?;

			if batch.is_empty() {
				tracing::debug!(tick, "No eligible records. Sync run finished.");

				break;
			}

			let outcome = uploader::upload_batch(store, index, &settings, &batch, owner).await?;

			reconciler::reconcile(store, &outcome, owner, OffsetDateTime::now_utc()).await?;

			tracing::info!(
				tick,
				processed = batch.len(),
				uploaded = outcome.attempted.len(),
				empty = outcome.empty.len(),
				failed = matches!(outcome.status, uploader::UploadStatus::Failed { .. }),
				"Sync tick completed."
			);

			report.processed_per_tick.push(batch.len());
		}

		Ok(report)
	}
}
