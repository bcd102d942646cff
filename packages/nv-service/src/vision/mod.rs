pub mod builder;
pub mod identify;

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use nv_domain::catalog::ReferenceCatalog;

pub const UNKNOWN_MATCH_ID: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub count: usize,
	pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifyResponse {
	/// The matched memory id, or `"unknown"`.
	pub match_id: String,
	pub label: Option<String>,
	pub confidence: f32,
	pub distance: f32,
	pub matched_filename: String,
}

/// Shared pointer to the published catalog snapshot.
///
/// Readers clone the inner `Arc` and keep matching against it even while a rebuild publishes a
/// replacement.
#[derive(Clone)]
pub struct CatalogHandle {
	inner: Arc<RwLock<Arc<ReferenceCatalog>>>,
}
impl CatalogHandle {
	pub fn new(catalog: ReferenceCatalog) -> Self {
		Self { inner: Arc::new(RwLock::new(Arc::new(catalog))) }
	}

	pub fn current(&self) -> Arc<ReferenceCatalog> {
		self.inner.read().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Swaps in `catalog` and returns the snapshot it replaced.
	pub fn publish(&self, catalog: ReferenceCatalog) -> Arc<ReferenceCatalog> {
		let mut guard = self.inner.write().unwrap_or_else(|err| err.into_inner());

		std::mem::replace(&mut *guard, Arc::new(catalog))
	}
}
