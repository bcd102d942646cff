use std::{io::ErrorKind, path::Path};

use nv_config::VisionMode;
use nv_domain::catalog::{self, LabelEntry, ReferenceCatalog, ReferenceItem};

use crate::{Error, FeatureExtractor, NvService, RebuildReport, Result};

/// Why a label entry did not make it into the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
	MissingMemoryId,
	MissingImage,
	UnreadableImage(String),
	ExtractionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
	pub filename: String,
	pub reason: SkipReason,
}

#[derive(Debug)]
pub struct BuiltCatalog {
	pub catalog: ReferenceCatalog,
	pub skipped: Vec<SkippedEntry>,
}

/// Reads the label mapping and extracts one feature per referenced image.
///
/// Entries without a memory id, without an image file, or whose image cannot be turned into a
/// feature are skipped and reported. A missing label file or image directory fails the build.
pub async fn build_catalog(
	extractor: &dyn FeatureExtractor,
	mode: VisionMode,
	images_dir: &Path,
	labels_path: &Path,
) -> Result<BuiltCatalog> {
	let raw = tokio::fs::read_to_string(labels_path).await.map_err(|err| Error::Catalog {
		message: format!("Failed to read label mapping {}: {err}.", labels_path.display()),
	})?;
	let entries = catalog::parse_labels(&raw)?;

	if !tokio::fs::metadata(images_dir).await.map(|meta| meta.is_dir()).unwrap_or(false) {
		return Err(Error::Catalog {
			message: format!("Image directory {} does not exist.", images_dir.display()),
		});
	}

	let mut items = Vec::with_capacity(entries.len());
	let mut skipped = Vec::new();

	for entry in entries {
		match build_item(extractor, mode, images_dir, &entry).await {
			Ok(item) => items.push(item),
			Err(reason) => {
				tracing::warn!(
					filename = %entry.filename,
					reason = ?reason,
					"Skipping label entry."
				);

				skipped.push(SkippedEntry { filename: entry.filename, reason });
			},
		}
	}

	Ok(BuiltCatalog { catalog: ReferenceCatalog::new(mode, items)?, skipped })
}

async fn build_item(
	extractor: &dyn FeatureExtractor,
	mode: VisionMode,
	images_dir: &Path,
	entry: &LabelEntry,
) -> Result<ReferenceItem, SkipReason> {
	let Some(memory_id) = entry.memory_id.clone() else {
		return Err(SkipReason::MissingMemoryId);
	};
	let bytes = match tokio::fs::read(images_dir.join(&entry.filename)).await {
		Ok(bytes) => bytes,
		Err(err) if err.kind() == ErrorKind::NotFound => return Err(SkipReason::MissingImage),
		Err(err) => return Err(SkipReason::UnreadableImage(err.to_string())),
	};
	let feature = extractor
		.extract(mode, &bytes)
		.await
		.map_err(|err| SkipReason::ExtractionFailed(err.to_string()))?;

	Ok(ReferenceItem {
		filename: entry.filename.clone(),
		label: entry.label.clone(),
		memory_id,
		feature,
	})
}

impl NvService {
	/// Builds a fresh catalog, publishes it, and persists it when a snapshot path is configured.
	pub async fn rebuild_catalog(&self) -> Result<RebuildReport> {
		let vision = &self.cfg.vision;
		let built = build_catalog(
			self.backends.extractor.as_ref(),
			vision.mode,
			&vision.images_dir,
			&vision.labels_path,
		)
		.await?;
		let report = RebuildReport { count: built.catalog.len(), skipped: built.skipped.len() };

		if let Some(path) = &vision.snapshot_path
			&& let Err(err) = write_snapshot(&built.catalog, path).await
		{
			tracing::warn!(
				error = %err,
				path = %path.display(),
				"Failed to persist catalog snapshot."
			);
		}

		self.catalog.publish(built.catalog);

		tracing::info!(
			count = report.count,
			skipped = report.skipped,
			mode = vision.mode.as_str(),
			"Published reference catalog."
		);

		Ok(report)
	}

	/// Publishes the persisted snapshot when one exists for the configured mode and feature size,
	/// otherwise rebuilds. Returns the number of published items.
	pub async fn load_or_rebuild_catalog(&self) -> Result<usize> {
		let vision = &self.cfg.vision;

		if let Some(path) = &vision.snapshot_path {
			match read_snapshot(path).await {
				Ok(Some(snapshot)) if self.snapshot_is_current(&snapshot) => {
					let count = snapshot.len();

					self.catalog.publish(snapshot);

					tracing::info!(count, path = %path.display(), "Loaded catalog snapshot.");

					return Ok(count);
				},
				Ok(Some(snapshot)) => tracing::info!(
					snapshot_mode = snapshot.mode().as_str(),
					mode = vision.mode.as_str(),
					snapshot_dimensions = ?snapshot_dimensions(&snapshot),
					dimensions = ?self.configured_dimensions(),
					"Catalog snapshot no longer matches the extractor. Rebuilding."
				),
				Ok(None) => {},
				Err(err) => tracing::warn!(
					error = %err,
					path = %path.display(),
					"Ignoring unreadable catalog snapshot."
				),
			}
		}

		Ok(self.rebuild_catalog().await?.count)
	}

	fn snapshot_is_current(&self, snapshot: &ReferenceCatalog) -> bool {
		if snapshot.mode() != self.cfg.vision.mode {
			return false;
		}

		match (snapshot_dimensions(snapshot), self.configured_dimensions()) {
			(Some(stored), Some(expected)) => stored == expected,
			_ => true,
		}
	}

	/// Feature size the extractor produces, when the mode fixes one by configuration.
	fn configured_dimensions(&self) -> Option<usize> {
		match self.cfg.vision.mode {
			VisionMode::Hash => None,
			VisionMode::Embedding => self
				.cfg
				.providers
				.image_embedding
				.as_ref()
				.map(|provider| provider.dimensions as usize),
		}
	}
}

fn snapshot_dimensions(snapshot: &ReferenceCatalog) -> Option<usize> {
	snapshot.items().first().map(|item| item.feature.dimensions())
}

async fn write_snapshot(catalog: &ReferenceCatalog, path: &Path) -> Result<()> {
	let json = catalog.to_json().map_err(|err| Error::Catalog { message: err.to_string() })?;

	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent)
			.await
			.map_err(|err| Error::Catalog { message: err.to_string() })?;
	}

	tokio::fs::write(path, json).await.map_err(|err| Error::Catalog { message: err.to_string() })
}

async fn read_snapshot(path: &Path) -> Result<Option<ReferenceCatalog>> {
	let raw = match tokio::fs::read_to_string(path).await {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(Error::Catalog { message: err.to_string() }),
	};

	Ok(Some(ReferenceCatalog::from_json(&raw)?))
}
