use std::sync::Arc;

use nv_service::NvService;
use nv_storage::{db::Db, qdrant::QdrantIndex};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<NvService>,
}
impl AppState {
	/// Connects the backends and publishes the initial catalog.
	///
	/// A catalog that cannot be built at startup leaves the service running with an empty catalog;
	/// identification reports missing reference data until a rebuild succeeds.
	pub async fn new(config: nv_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let index = QdrantIndex::new(&config.storage.index)?;
		let service = NvService::new(config, db, index);

		if let Err(err) = service.load_or_rebuild_catalog().await {
			tracing::warn!(
				error = %err,
				"Initial catalog build failed. Starting with an empty catalog."
			);
		}

		Ok(Self::from_service(Arc::new(service)))
	}

	pub fn from_service(service: Arc<NvService>) -> Self {
		Self { service }
	}
}
