use time::OffsetDateTime;
use uuid::Uuid;

use nv_domain::record::{MemoryRecord, MemoryStatus};

use crate::Error;

#[derive(Debug, sqlx::FromRow)]
pub struct MemoryRecordRow {
	pub id: Uuid,
	pub text: String,
	pub author: Option<String>,
	pub patient_id: String,
	pub image_url: Option<String>,
	pub created_at: OffsetDateTime,
	pub status: String,
	pub attempts: i32,
	pub indexed_at: Option<OffsetDateTime>,
	pub claim_token: Option<Uuid>,
	pub claimed_until: Option<OffsetDateTime>,
}
impl TryFrom<MemoryRecordRow> for MemoryRecord {
	type Error = Error;

	fn try_from(row: MemoryRecordRow) -> Result<Self, Self::Error> {
		let status = row
			.status
			.parse::<MemoryStatus>()
			.map_err(|err| Error::InvalidRow(format!("Record {}: {err}", row.id)))?;
		let attempts = u32::try_from(row.attempts).map_err(|_| {
			Error::InvalidRow(format!("Record {} has negative attempts {}.", row.id, row.attempts))
		})?;

		Ok(Self {
			id: row.id,
			text: row.text,
			author: row.author,
			patient_id: row.patient_id,
			image_url: row.image_url,
			created_at: row.created_at,
			status,
			attempts,
			indexed_at: row.indexed_at,
		})
	}
}
