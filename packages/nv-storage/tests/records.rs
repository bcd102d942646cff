use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use nv_domain::record::{MemoryRecord, MemoryStatus, RecordUpdate};
use nv_storage::{
	db::Db,
	records::{self, ClaimRequest},
};

fn record(
	text: &str,
	created_at: OffsetDateTime,
	status: MemoryStatus,
	attempts: u32,
) -> MemoryRecord {
	MemoryRecord {
		id: Uuid::new_v4(),
		text: text.to_string(),
		author: Some("Caregiver".to_string()),
		patient_id: "default".to_string(),
		image_url: None,
		created_at,
		status,
		attempts,
		indexed_at: None,
	}
}

fn claim(owner: Uuid, limit: u32, now: OffsetDateTime) -> ClaimRequest {
	ClaimRequest { owner, limit, max_attempts: 5, now, lease: Duration::seconds(300) }
}

async fn setup(test_db: &nv_testkit::TestDatabase) -> Db {
	let cfg = nv_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NV_PG_DSN to run."]
async fn claims_eligible_records_oldest_first() {
	let Some(base_dsn) = nv_testkit::env_dsn() else {
		eprintln!("Skipping claims_eligible_records_oldest_first; set NV_PG_DSN to run this test.");

		return;
	};
	let test_db =
		nv_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = setup(&test_db).await;
	let base = OffsetDateTime::now_utc() - Duration::hours(1);
	let newest = record("newest", base + Duration::minutes(3), MemoryStatus::Pending, 0);
	let oldest = record("oldest", base, MemoryStatus::Pending, 0);
	let retry = record("retry", base + Duration::minutes(1), MemoryStatus::Failed, 4);
	let dead = record("dead", base + Duration::minutes(2), MemoryStatus::Failed, 5);
	let done = record("done", base, MemoryStatus::Indexed, 0);

	for rec in [&newest, &oldest, &retry, &dead, &done] {
		records::insert_record(&db, rec).await.expect("Failed to insert record.");
	}

	let owner = Uuid::new_v4();
	let claimed = records::claim_eligible(&db, &claim(owner, 10, OffsetDateTime::now_utc()))
		.await
		.expect("Failed to claim records.");
	let ids = claimed.iter().map(|rec| rec.id).collect::<Vec<_>>();

	assert_eq!(ids, vec![oldest.id, retry.id, newest.id]);

	// Leased rows are not handed to a second owner.
	let again = records::claim_eligible(&db, &claim(Uuid::new_v4(), 10, OffsetDateTime::now_utc()))
		.await
		.expect("Failed to claim records.");

	assert!(again.is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NV_PG_DSN to run."]
async fn claim_respects_limit_and_expired_leases() {
	let Some(base_dsn) = nv_testkit::env_dsn() else {
		eprintln!("Skipping claim_respects_limit_and_expired_leases; set NV_PG_DSN to run this test.");

		return;
	};
	let test_db =
		nv_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = setup(&test_db).await;
	let base = OffsetDateTime::now_utc() - Duration::hours(1);

	for idx in 0..4 {
		let rec = record("memory", base + Duration::minutes(idx), MemoryStatus::Pending, 0);

		records::insert_record(&db, &rec).await.expect("Failed to insert record.");
	}

	let now = OffsetDateTime::now_utc();
	let first = records::claim_eligible(&db, &claim(Uuid::new_v4(), 3, now))
		.await
		.expect("Failed to claim records.");

	assert_eq!(first.len(), 3);

	// After the lease runs out the abandoned rows are eligible again.
	let later = now + Duration::seconds(301);
	let second = records::claim_eligible(&db, &claim(Uuid::new_v4(), 10, later))
		.await
		.expect("Failed to claim records.");

	assert_eq!(second.len(), 4);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NV_PG_DSN to run."]
async fn apply_bulk_updates_only_owned_rows() {
	let Some(base_dsn) = nv_testkit::env_dsn() else {
		eprintln!("Skipping apply_bulk_updates_only_owned_rows; set NV_PG_DSN to run this test.");

		return;
	};
	let test_db =
		nv_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = setup(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let first = record("first", now - Duration::minutes(2), MemoryStatus::Pending, 0);
	let second = record("second", now - Duration::minutes(1), MemoryStatus::Failed, 1);

	records::insert_record(&db, &first).await.expect("Failed to insert record.");
	records::insert_record(&db, &second).await.expect("Failed to insert record.");

	let owner = Uuid::new_v4();
	let claimed = records::claim_eligible(&db, &claim(owner, 10, now))
		.await
		.expect("Failed to claim records.");

	assert_eq!(claimed.len(), 2);

	let stranger = records::apply_bulk(&db, &[first.id], &RecordUpdate::failed(), Uuid::new_v4())
		.await
		.expect("Failed to apply update.");

	assert_eq!(stranger, 0);

	let changed = records::apply_bulk(&db, &[first.id, second.id], &RecordUpdate::failed(), owner)
		.await
		.expect("Failed to apply update.");

	assert_eq!(changed, 2);

	let first_after = records::fetch_record(&db, first.id)
		.await
		.expect("Failed to fetch.")
		.expect("Missing row.");
	let second_after = records::fetch_record(&db, second.id)
		.await
		.expect("Failed to fetch.")
		.expect("Missing row.");

	assert_eq!(first_after.status, MemoryStatus::Failed);
	assert_eq!(first_after.attempts, 1);
	assert_eq!(second_after.attempts, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NV_PG_DSN to run."]
async fn indexed_update_sets_timestamp_and_keeps_attempts() {
	let Some(base_dsn) = nv_testkit::env_dsn() else {
		eprintln!(
			"Skipping indexed_update_sets_timestamp_and_keeps_attempts; set NV_PG_DSN to run this test."
		);

		return;
	};
	let test_db =
		nv_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = setup(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let rec = record("Tim is your grandson", now - Duration::minutes(1), MemoryStatus::Failed, 3);

	records::insert_record(&db, &rec).await.expect("Failed to insert record.");

	let owner = Uuid::new_v4();

	records::claim_eligible(&db, &claim(owner, 1, now)).await.expect("Failed to claim records.");
	records::apply_bulk(&db, &[rec.id], &RecordUpdate::indexed(now), owner)
		.await
		.expect("Failed to apply update.");

	let after = records::fetch_record(&db, rec.id)
		.await
		.expect("Failed to fetch.")
		.expect("Missing row.");

	assert_eq!(after.status, MemoryStatus::Indexed);
	assert_eq!(after.attempts, 3);
	assert!(after.indexed_at.is_some());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
