use std::{io::Cursor, path::Path, sync::Arc};

use image::{ImageBuffer, ImageFormat, Rgb};
use uuid::Uuid;

use nv_config::{
	Config, Index, Postgres, Providers, Service, Storage, SyncConfig, Vision, VisionMode,
};
use nv_domain::{
	document::IndexDocument,
	record::{MemoryRecord, RecordUpdate},
};
use nv_service::{
	Backends, BoxFuture, DefaultExtractor, Error, NvService, RecordStore, Result, UNKNOWN_MATCH_ID,
	VectorIndex,
};
use nv_storage::{qdrant::EnsureOutcome, records::ClaimRequest};

struct NoStore;
impl RecordStore for NoStore {
	fn select<'a>(&'a self, _req: &'a ClaimRequest) -> BoxFuture<'a, Result<Vec<MemoryRecord>>> {
		Box::pin(async { Ok(Vec::new()) })
	}

	fn apply_bulk<'a>(
		&'a self,
		_ids: &'a [Uuid],
		_update: &'a RecordUpdate,
		_owner: Uuid,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async { Ok(0) })
	}
}

struct NoIndex;
impl VectorIndex for NoIndex {
	fn ensure_namespace<'a>(
		&'a self,
		_name: &'a str,
		_doc_type: &'a str,
	) -> BoxFuture<'a, Result<EnsureOutcome>> {
		Box::pin(async { Ok(EnsureOutcome::AlreadyExists) })
	}

	fn upload<'a>(
		&'a self,
		_namespace: &'a str,
		_docs: &'a [IndexDocument],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}
}

fn config(dir: &Path) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage {
			postgres: Postgres { dsn: "postgres://unused".to_string(), pool_max_conns: 1 },
			index: Index {
				url: "http://127.0.0.1:6334".to_string(),
				api_key: None,
				namespace: "memories".to_string(),
				doc_type: "text".to_string(),
				source: "neurovault".to_string(),
			},
		},
		sync: SyncConfig::default(),
		vision: Vision {
			mode: VisionMode::Hash,
			images_dir: dir.join("images"),
			labels_path: dir.join("labels.json"),
			snapshot_path: None,
			unknown_threshold: None,
			confidence_scale: None,
		},
		providers: Providers::default(),
	}
}

fn service(cfg: Config) -> NvService {
	let extractor = Arc::new(DefaultExtractor::new(None));

	NvService::with_backends(cfg, Backends::new(Arc::new(NoStore), Arc::new(NoIndex), extractor))
}

/// An 8x8 grid of gray blocks drawn from a small LCG, scaled up to `size` pixels.
fn block_png(seed: u64, size: u32) -> Vec<u8> {
	let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
	let mut grid = [[0_u8; 8]; 8];

	for row in &mut grid {
		for cell in row.iter_mut() {
			state = state
				.wrapping_mul(6_364_136_223_846_793_005)
				.wrapping_add(1_442_695_040_888_963_407);
			*cell = (state >> 56) as u8;
		}
	}

	let cell = size / 8;
	let img = ImageBuffer::from_fn(size, size, |x, y| {
		let value = grid[(y / cell) as usize][(x / cell) as usize];

		Rgb([value, value, value])
	});
	let mut out = Cursor::new(Vec::new());

	img.write_to(&mut out, ImageFormat::Png).expect("Failed to encode PNG.");

	out.into_inner()
}

fn write_references(dir: &Path) {
	std::fs::create_dir_all(dir.join("images")).expect("Failed to create images dir.");
	std::fs::write(
		dir.join("labels.json"),
		r#"{
			"grandson_tim.png": {"memory_id": "mem_family_tim", "label": "Grandson Tim"},
			"key_bowl.png": "mem_routine_keys",
			"corrupt.png": "mem_corrupt"
		}"#,
	)
	.expect("Failed to write labels.");
	std::fs::write(dir.join("images/grandson_tim.png"), block_png(11, 64))
		.expect("Failed to write image.");
	std::fs::write(dir.join("images/key_bowl.png"), block_png(23, 64))
		.expect("Failed to write image.");
	std::fs::write(dir.join("images/corrupt.png"), b"\x89PNG truncated")
		.expect("Failed to write image.");
}

#[tokio::test]
async fn reference_image_identifies_itself() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");

	write_references(dir.path());

	let svc = service(config(dir.path()));
	let report = svc.rebuild_catalog().await.expect("rebuild failed");

	assert_eq!(report.count, 2);
	assert_eq!(report.skipped, 1);

	let response = svc.identify(&block_png(11, 64)).await.expect("identify failed");

	assert_eq!(response.match_id, "mem_family_tim");
	assert_eq!(response.label.as_deref(), Some("Grandson Tim"));
	assert_eq!(response.distance, 0.0);
	assert_eq!(response.confidence, 1.0);
	assert_eq!(response.matched_filename, "grandson_tim.png");
}

#[tokio::test]
async fn rescaled_capture_still_matches() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");

	write_references(dir.path());

	let svc = service(config(dir.path()));

	svc.rebuild_catalog().await.expect("rebuild failed");

	let response = svc.identify(&block_png(23, 128)).await.expect("identify failed");

	assert_eq!(response.match_id, "mem_routine_keys");
	assert!(response.distance < 13.0);
}

#[tokio::test]
async fn unrelated_capture_is_unknown() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");

	write_references(dir.path());

	let mut cfg = config(dir.path());

	// Only an exact hash counts as known.
	cfg.vision.unknown_threshold = Some(1.0);

	let svc = service(cfg);

	svc.rebuild_catalog().await.expect("rebuild failed");

	let response = svc.identify(&block_png(99, 64)).await.expect("identify failed");

	assert_eq!(response.match_id, UNKNOWN_MATCH_ID);
	assert_eq!(response.label, None);
	assert!(!response.matched_filename.is_empty());
}

#[tokio::test]
async fn embedding_mode_without_provider_cannot_extract() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");

	write_references(dir.path());

	let mut cfg = config(dir.path());

	cfg.vision.mode = VisionMode::Embedding;

	let svc = service(cfg);
	let report = svc.rebuild_catalog().await.expect("rebuild failed");

	// Every entry fails extraction, so nothing is published.
	assert_eq!(report.count, 0);
	assert_eq!(report.skipped, 3);
	assert!(matches!(svc.identify(&block_png(11, 64)).await, Err(Error::NoReferenceData)));
}
