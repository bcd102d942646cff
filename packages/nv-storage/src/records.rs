use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use nv_domain::record::{MemoryRecord, RecordUpdate};

use crate::{Error, Result, db::Db, models::MemoryRecordRow};

const RECORD_COLUMNS: &str = "\
id,
	text,
	author,
	patient_id,
	image_url,
	created_at,
	status,
	attempts,
	indexed_at,
	claim_token,
	claimed_until";

/// Parameters of one claiming selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequest {
	pub owner: Uuid,
	pub limit: u32,
	pub max_attempts: u32,
	pub now: OffsetDateTime,
	pub lease: Duration,
}
impl ClaimRequest {
	pub fn lease_until(&self) -> OffsetDateTime {
		self.now + self.lease
	}
}

/// Selects up to `limit` eligible records, oldest first, and stamps them with the caller's lease.
///
/// Rows held by another unexpired lease are skipped, as are rows locked by a concurrent claim.
pub async fn claim_eligible(db: &Db, req: &ClaimRequest) -> Result<Vec<MemoryRecord>> {
	if req.limit == 0 {
		return Err(Error::InvalidArgument("Claim limit must be greater than zero.".to_string()));
	}

	let max_attempts = i32::try_from(req.max_attempts).unwrap_or(i32::MAX);
	let limit = i64::from(req.limit);
	let mut tx = db.pool.begin().await?;
	let sql = format!(
		"\
SELECT
	{RECORD_COLUMNS}
FROM memory_records
WHERE (status = 'pending' OR (status = 'failed' AND attempts < $1))
	AND (claimed_until IS NULL OR claimed_until <= $2)
ORDER BY created_at ASC, id ASC
LIMIT $3
FOR UPDATE SKIP LOCKED"
	);
	let rows: Vec<MemoryRecordRow> = sqlx::query_as(&sql)
		.bind(max_attempts)
		.bind(req.now)
		.bind(limit)
		.fetch_all(&mut *tx)
		.await?;

	if rows.is_empty() {
		tx.commit().await?;

		return Ok(Vec::new());
	}

	let ids = rows.iter().map(|row| row.id).collect::<Vec<_>>();

	sqlx::query(
		"\
UPDATE memory_records
SET claim_token = $1,
	claimed_until = $2
WHERE id = ANY($3)",
	)
	.bind(req.owner)
	.bind(req.lease_until())
	.bind(&ids)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	rows.into_iter().map(MemoryRecord::try_from).collect()
}

/// Applies one update to every record in `ids` still claimed by `owner`, releasing the claim.
///
/// Returns the number of rows changed. Rows whose lease was taken over by another owner are left
/// alone.
pub async fn apply_bulk(db: &Db, ids: &[Uuid], update: &RecordUpdate, owner: Uuid) -> Result<u64> {
	if ids.is_empty() {
		return Ok(0);
	}

	let increment: i32 = if update.increment_attempts { 1 } else { 0 };
	let result = sqlx::query(
		"\
UPDATE memory_records
SET status = $1,
	indexed_at = COALESCE($2, indexed_at),
	attempts = attempts + $3,
	claim_token = NULL,
	claimed_until = NULL
WHERE id = ANY($4)
	AND claim_token = $5",
	)
	.bind(update.status.as_str())
	.bind(update.indexed_at)
	.bind(increment)
	.bind(ids)
	.bind(owner)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn insert_record(db: &Db, record: &MemoryRecord) -> Result<()> {
	let attempts = i32::try_from(record.attempts).map_err(|_| {
		Error::InvalidArgument("Record attempts exceed supported range.".to_string())
	})?;

	sqlx::query(
		"\
INSERT INTO memory_records (
	id,
	text,
	author,
	patient_id,
	image_url,
	created_at,
	status,
	attempts,
	indexed_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
	)
	.bind(record.id)
	.bind(record.text.as_str())
	.bind(record.author.as_deref())
	.bind(record.patient_id.as_str())
	.bind(record.image_url.as_deref())
	.bind(record.created_at)
	.bind(record.status.as_str())
	.bind(attempts)
	.bind(record.indexed_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn fetch_record(db: &Db, id: Uuid) -> Result<Option<MemoryRecord>> {
	let sql = format!("SELECT {RECORD_COLUMNS} FROM memory_records WHERE id = $1");
	let row: Option<MemoryRecordRow> =
		sqlx::query_as(&sql).bind(id).fetch_optional(&db.pool).await?;

	row.map(MemoryRecord::try_from).transpose()
}
