use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use nv_config::VisionMode;

use crate::{Error, Result, feature::Feature};

/// One entry of the label mapping, before its image is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
	pub filename: String,
	pub label: String,
	/// `None` when the mapping gives no usable memory id; such entries are skipped at build time.
	pub memory_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceItem {
	pub filename: String,
	pub label: String,
	pub memory_id: String,
	pub feature: Feature,
}

/// An immutable, ordered set of reference features. Catalogs are rebuilt, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCatalog {
	mode: VisionMode,
	items: Vec<ReferenceItem>,
}
impl ReferenceCatalog {
	pub fn new(mode: VisionMode, items: Vec<ReferenceItem>) -> Result<Self> {
		let dimensions = items.first().map(|item| item.feature.dimensions());

		for item in &items {
			if item.feature.mode() != mode {
				return Err(Error::FeatureMismatch {
					message: format!(
						"{} has a {} feature in a {} catalog",
						item.filename,
						item.feature.mode().as_str(),
						mode.as_str()
					),
				});
			}
			if Some(item.feature.dimensions()) != dimensions {
				return Err(Error::FeatureMismatch {
					message: format!(
						"{} has {} dimensions, expected {}",
						item.filename,
						item.feature.dimensions(),
						dimensions.unwrap_or_default()
					),
				});
			}
		}

		Ok(Self { mode, items })
	}

	pub fn empty(mode: VisionMode) -> Self {
		Self { mode, items: Vec::new() }
	}

	pub fn mode(&self) -> VisionMode {
		self.mode
	}

	pub fn items(&self) -> &[ReferenceItem] {
		&self.items
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}

	/// Decodes a persisted snapshot and re-checks its invariants.
	pub fn from_json(raw: &str) -> Result<Self> {
		let decoded: Self = serde_json::from_str(raw)
			.map_err(|err| Error::InvalidSnapshot { message: err.to_string() })?;

		Self::new(decoded.mode, decoded.items)
	}
}

/// Parses a label mapping. Values are either a memory id string or an object carrying
/// `memory_id` (or `memoryId`) and an optional `label`. Entries keep the order of the mapping,
/// which is the catalog order ties are resolved by.
pub fn parse_labels(raw: &str) -> Result<Vec<LabelEntry>> {
	let value: Value = serde_json::from_str(raw)
		.map_err(|err| Error::InvalidLabels { message: err.to_string() })?;
	let Value::Object(map) = value else {
		return Err(Error::InvalidLabels { message: "top level must be an object".to_string() });
	};
	let mut entries = Vec::with_capacity(map.len());

	for (filename, value) in map {
		let (label, memory_id) = match &value {
			Value::String(memory_id) => (None, Some(memory_id.as_str())),
			Value::Object(fields) => (
				fields.get("label").and_then(Value::as_str),
				fields
					.get("memory_id")
					.or_else(|| fields.get("memoryId"))
					.and_then(Value::as_str),
			),
			_ => (None, None),
		};
		let label = label
			.map(str::trim)
			.filter(|label| !label.is_empty())
			.map(str::to_string)
			.unwrap_or_else(|| default_label(&filename));
		let memory_id = memory_id.map(str::trim).filter(|id| !id.is_empty()).map(str::to_string);

		entries.push(LabelEntry { filename, label, memory_id });
	}

	Ok(entries)
}

pub fn default_label(filename: &str) -> String {
	Path::new(filename)
		.file_stem()
		.and_then(|stem| stem.to_str())
		.map(str::to_string)
		.unwrap_or_else(|| filename.to_string())
}
