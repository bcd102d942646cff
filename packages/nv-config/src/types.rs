use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HASH_UNKNOWN_THRESHOLD: f32 = 13.0;
pub const HASH_CONFIDENCE_SCALE: f32 = 20.0;
pub const EMBEDDING_UNKNOWN_THRESHOLD: f32 = 0.35;
pub const EMBEDDING_CONFIDENCE_SCALE: f32 = 1.0;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub sync: SyncConfig,
	pub vision: Vision,
	#[serde(default)]
	pub providers: Providers,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_http_bind")]
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub index: Index,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Index {
	pub url: String,
	/// Optional. Sent as the Qdrant API key when present.
	pub api_key: Option<String>,
	#[serde(default = "default_namespace")]
	pub namespace: String,
	#[serde(default = "default_doc_type")]
	pub doc_type: String,
	/// Value written to every uploaded document's `source` metadata key.
	#[serde(default = "default_source")]
	pub source: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	pub batch_size: u32,
	pub max_attempts: u32,
	pub max_ticks: u32,
	pub poll_interval_ms: u64,
	pub claim_lease_seconds: i64,
	/// Postgres `LISTEN` channel whose notifications request an immediate sync run.
	pub notify_channel: String,
}
impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			batch_size: 50,
			max_attempts: 5,
			max_ticks: 5,
			poll_interval_ms: 600_000,
			claim_lease_seconds: 300,
			notify_channel: "nv_sync".to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionMode {
	Hash,
	Embedding,
}
impl VisionMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Hash => "hash",
			Self::Embedding => "embedding",
		}
	}

	pub fn default_unknown_threshold(self) -> f32 {
		match self {
			Self::Hash => HASH_UNKNOWN_THRESHOLD,
			Self::Embedding => EMBEDDING_UNKNOWN_THRESHOLD,
		}
	}

	pub fn default_confidence_scale(self) -> f32 {
		match self {
			Self::Hash => HASH_CONFIDENCE_SCALE,
			Self::Embedding => EMBEDDING_CONFIDENCE_SCALE,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Vision {
	#[serde(default = "default_vision_mode")]
	pub mode: VisionMode,
	pub images_dir: PathBuf,
	pub labels_path: PathBuf,
	/// Optional. When set, rebuilt catalogs are persisted here and reloaded at startup.
	pub snapshot_path: Option<PathBuf>,
	/// Optional. Overrides the mode default.
	pub unknown_threshold: Option<f32>,
	/// Optional. Overrides the mode default.
	pub confidence_scale: Option<f32>,
}
impl Vision {
	pub fn unknown_threshold(&self) -> f32 {
		self.unknown_threshold.unwrap_or_else(|| self.mode.default_unknown_threshold())
	}

	pub fn confidence_scale(&self) -> f32 {
		self.confidence_scale.unwrap_or_else(|| self.mode.default_confidence_scale())
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct Providers {
	pub image_embedding: Option<ImageEmbeddingProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageEmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_http_bind() -> String {
	"127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_namespace() -> String {
	"memories".to_string()
}

fn default_doc_type() -> String {
	"text".to_string()
}

fn default_source() -> String {
	"neurovault".to_string()
}

fn default_vision_mode() -> VisionMode {
	VisionMode::Hash
}
