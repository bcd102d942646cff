pub mod sync;
pub mod vision;

mod error;

pub use error::{Error, Result};
pub use sync::SyncReport;
pub use vision::{CatalogHandle, IdentifyResponse, RebuildReport, UNKNOWN_MATCH_ID};

use std::{future::Future, pin::Pin, sync::Arc};

use uuid::Uuid;

use nv_config::{Config, ImageEmbeddingProviderConfig, VisionMode};
use nv_domain::{
	catalog::ReferenceCatalog,
	document::IndexDocument,
	feature::Feature,
	record::{MemoryRecord, RecordUpdate},
};
use nv_providers::{image_embedding, phash};
use nv_storage::{
	db::Db,
	qdrant::{EnsureOutcome, QdrantIndex},
	records::{self, ClaimRequest},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Typed access to the persisted memory records.
pub trait RecordStore
where
	Self: Send + Sync,
{
	/// Claims up to `req.limit` eligible records, oldest first.
	fn select<'a>(&'a self, req: &'a ClaimRequest) -> BoxFuture<'a, Result<Vec<MemoryRecord>>>;

	/// Sets the same field values on every listed record still claimed by `owner`.
	fn apply_bulk<'a>(
		&'a self,
		ids: &'a [Uuid],
		update: &'a RecordUpdate,
		owner: Uuid,
	) -> BoxFuture<'a, Result<u64>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn ensure_namespace<'a>(
		&'a self,
		name: &'a str,
		doc_type: &'a str,
	) -> BoxFuture<'a, Result<EnsureOutcome>>;

	fn upload<'a>(
		&'a self,
		namespace: &'a str,
		docs: &'a [IndexDocument],
	) -> BoxFuture<'a, Result<()>>;
}

pub trait FeatureExtractor
where
	Self: Send + Sync,
{
	fn extract<'a>(&'a self, mode: VisionMode, image: &'a [u8]) -> BoxFuture<'a, Result<Feature>>;
}

/// Extracts hash features locally and embedding features through the configured provider.
pub struct DefaultExtractor {
	embedding: Option<ImageEmbeddingProviderConfig>,
}
impl DefaultExtractor {
	pub fn new(embedding: Option<ImageEmbeddingProviderConfig>) -> Self {
		Self { embedding }
	}
}
impl FeatureExtractor for DefaultExtractor {
	fn extract<'a>(&'a self, mode: VisionMode, image: &'a [u8]) -> BoxFuture<'a, Result<Feature>> {
		Box::pin(async move {
			match mode {
				VisionMode::Hash => Ok(Feature::Hash(phash::phash(image)?)),
				VisionMode::Embedding => {
					let cfg = self.embedding.as_ref().ok_or_else(|| Error::ConfigMissing {
						key: "providers.image_embedding".to_string(),
					})?;

					Ok(Feature::Embedding(image_embedding::embed_image(cfg, image).await?))
				},
			}
		})
	}
}

impl RecordStore for Db {
	fn select<'a>(&'a self, req: &'a ClaimRequest) -> BoxFuture<'a, Result<Vec<MemoryRecord>>> {
		Box::pin(async move { Ok(records::claim_eligible(self, req).await?) })
	}

	fn apply_bulk<'a>(
		&'a self,
		ids: &'a [Uuid],
		update: &'a RecordUpdate,
		owner: Uuid,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(records::apply_bulk(self, ids, update, owner).await?) })
	}
}

impl VectorIndex for QdrantIndex {
	fn ensure_namespace<'a>(
		&'a self,
		name: &'a str,
		doc_type: &'a str,
	) -> BoxFuture<'a, Result<EnsureOutcome>> {
		Box::pin(async move { Ok(QdrantIndex::ensure_namespace(self, name, doc_type).await?) })
	}

	fn upload<'a>(
		&'a self,
		namespace: &'a str,
		docs: &'a [IndexDocument],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantIndex::upload(self, namespace, docs).await?) })
	}
}

#[derive(Clone)]
pub struct Backends {
	pub store: Arc<dyn RecordStore>,
	pub index: Arc<dyn VectorIndex>,
	pub extractor: Arc<dyn FeatureExtractor>,
}
impl Backends {
	pub fn new(
		store: Arc<dyn RecordStore>,
		index: Arc<dyn VectorIndex>,
		extractor: Arc<dyn FeatureExtractor>,
	) -> Self {
		Self { store, index, extractor }
	}
}

pub struct NvService {
	pub cfg: Config,
	pub backends: Backends,
	pub catalog: CatalogHandle,
}
impl NvService {
	pub fn new(cfg: Config, db: Db, index: QdrantIndex) -> Self {
		let extractor = DefaultExtractor::new(cfg.providers.image_embedding.clone());
		let backends = Backends::new(Arc::new(db), Arc::new(index), Arc::new(extractor));

		Self::with_backends(cfg, backends)
	}

	pub fn with_backends(cfg: Config, backends: Backends) -> Self {
		let catalog = CatalogHandle::new(ReferenceCatalog::empty(cfg.vision.mode));

		Self { cfg, backends, catalog }
	}
}
