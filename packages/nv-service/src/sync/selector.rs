use time::OffsetDateTime;
use uuid::Uuid;

use nv_domain::record::MemoryRecord;
use nv_storage::records::ClaimRequest;

use crate::{RecordStore, Result, sync::SyncSettings};

/// Claims the next batch for `owner`. An empty batch means there is nothing left to do.
pub async fn select_batch(
	store: &dyn RecordStore,
	settings: &SyncSettings,
	owner: Uuid,
	now: OffsetDateTime,
) -> Result<Vec<MemoryRecord>> {
	let req = ClaimRequest {
		owner,
		limit: settings.batch_size,
		max_attempts: settings.max_attempts,
		now,
		lease: settings.lease,
	};
	let mut batch = store.select(&req).await?;

	if batch.len() > settings.batch_size as usize {
		tracing::warn!(
			selected = batch.len(),
			batch_size = settings.batch_size,
			"Record store returned more records than requested. Truncating batch."
		);

		batch.truncate(settings.batch_size as usize);
	}

	Ok(batch)
}
