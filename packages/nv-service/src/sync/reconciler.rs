use time::OffsetDateTime;
use uuid::Uuid;

use nv_domain::record::RecordUpdate;

use crate::{
	RecordStore, Result,
	sync::uploader::{BatchOutcome, UploadStatus},
};

/// Writes a batch outcome back to the store as one bulk mutation. Returns the rows changed.
pub async fn reconcile(
	store: &dyn RecordStore,
	outcome: &BatchOutcome,
	owner: Uuid,
	now: OffsetDateTime,
) -> Result<u64> {
	let update = match outcome.status {
		UploadStatus::Uploaded => RecordUpdate::indexed(now),
		UploadStatus::Failed { .. } => RecordUpdate::failed(),
		UploadStatus::Nothing => return Ok(0),
	};
	let changed = store.apply_bulk(&outcome.attempted, &update, owner).await?;

	if changed != outcome.attempted.len() as u64 {
		tracing::warn!(
			attempted = outcome.attempted.len(),
			changed,
			"Some records were no longer held by this run and were left unchanged."
		);
	}

	Ok(changed)
}
