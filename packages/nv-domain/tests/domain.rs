use std::path::PathBuf;

use time::OffsetDateTime;
use uuid::Uuid;

use nv_config::{Vision, VisionMode};
use nv_domain::{
	catalog::{ReferenceCatalog, ReferenceItem},
	feature::{Feature, HashCode},
	matcher::{self, MatchPolicy},
	record::{MemoryRecord, MemoryStatus, RecordUpdate},
};

fn vision(mode: VisionMode) -> Vision {
	Vision {
		mode,
		images_dir: PathBuf::from("images"),
		labels_path: PathBuf::from("labels.json"),
		snapshot_path: None,
		unknown_threshold: None,
		confidence_scale: None,
	}
}

fn item(filename: &str, memory_id: &str, feature: Feature) -> ReferenceItem {
	ReferenceItem {
		filename: filename.to_string(),
		label: filename.trim_end_matches(".png").to_string(),
		memory_id: memory_id.to_string(),
		feature,
	}
}

#[test]
fn reloaded_snapshot_matches_the_built_catalog() {
	let tim = Feature::Hash(HashCode(0xF0F0_F0F0_0F0F_0F0F));
	let keys = Feature::Hash(HashCode(0x0123_4567_89AB_CDEF));
	let catalog = ReferenceCatalog::new(
		VisionMode::Hash,
		vec![
			item("grandson_tim.png", "mem_family_tim", tim),
			item("key_bowl.png", "mem_routine_keys", keys),
		],
	)
	.expect("catalog failed");
	let reloaded = ReferenceCatalog::from_json(&catalog.to_json().expect("encode failed"))
		.expect("decode failed");
	let policy = MatchPolicy::from_config(&vision(VisionMode::Hash));
	let query = Feature::Hash(HashCode(0x0123_4567_89AB_CDEE));
	let built = matcher::find_nearest(&query, &catalog, &policy).expect("match failed");
	let restored = matcher::find_nearest(&query, &reloaded, &policy).expect("match failed");

	assert_eq!(built, restored);
	assert_eq!(restored.memory_id(), Some("mem_routine_keys"));
	assert_eq!(restored.distance, 1.0);
	assert_eq!(restored.confidence, 0.95);
}

#[test]
fn embedding_catalog_uses_cosine_distance() {
	let catalog = ReferenceCatalog::new(
		VisionMode::Embedding,
		vec![
			item("grandson_tim.png", "mem_family_tim", Feature::Embedding(vec![1.0, 0.0])),
			item("key_bowl.png", "mem_routine_keys", Feature::Embedding(vec![0.0, 1.0])),
		],
	)
	.expect("catalog failed");
	let policy = MatchPolicy::from_config(&vision(VisionMode::Embedding));
	let close = matcher::find_nearest(&Feature::Embedding(vec![1.0, 0.1]), &catalog, &policy)
		.expect("match failed");

	assert_eq!(close.memory_id(), Some("mem_family_tim"));
	assert_eq!(close.confidence, 0.995);

	let far = matcher::find_nearest(&Feature::Embedding(vec![-1.0, 0.0]), &catalog, &policy)
		.expect("match failed");

	assert_eq!(far.nearest.filename, "key_bowl.png");
	assert_eq!(far.memory_id(), None);
	assert_eq!(far.confidence, 0.0);
}

#[test]
fn repeated_failures_end_in_a_dead_record() {
	let max_attempts = 3;
	let mut record = MemoryRecord {
		id: Uuid::new_v4(),
		text: "Keys live in the blue bowl".to_string(),
		author: Some("Caregiver".to_string()),
		patient_id: "default".to_string(),
		image_url: None,
		created_at: OffsetDateTime::UNIX_EPOCH,
		status: MemoryStatus::Pending,
		attempts: 0,
		indexed_at: None,
	};

	for _ in 0..max_attempts {
		assert!(record.is_eligible(max_attempts));

		RecordUpdate::failed().apply_to(&mut record);
	}

	assert_eq!(record.status, MemoryStatus::Failed);
	assert_eq!(record.attempts, max_attempts);
	assert!(record.is_dead(max_attempts));
	assert!(!record.is_eligible(max_attempts));
}

#[test]
fn indexing_keeps_the_attempt_count() {
	let now = OffsetDateTime::UNIX_EPOCH;
	let mut record = MemoryRecord {
		id: Uuid::new_v4(),
		text: "Tim is your grandson".to_string(),
		author: None,
		patient_id: "default".to_string(),
		image_url: None,
		created_at: now,
		status: MemoryStatus::Failed,
		attempts: 2,
		indexed_at: None,
	};

	RecordUpdate::indexed(now).apply_to(&mut record);

	assert_eq!(record.status, MemoryStatus::Indexed);
	assert_eq!(record.attempts, 2);
	assert_eq!(record.indexed_at, Some(now));
	assert!(!record.is_eligible(5));
}
