use std::collections::BTreeMap;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::record::MemoryRecord;

pub const META_FILE: &str = "file";
pub const META_SOURCE: &str = "source";
pub const META_AUTHOR: &str = "author";
pub const META_IMAGE_URL: &str = "imageUrl";
pub const META_PATIENT_ID: &str = "patientId";
pub const META_CREATED_AT: &str = "createdAt";

/// A memory shaped for the vector index. Metadata never carries absent or blank values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
	pub id: Uuid,
	pub text: String,
	pub metadata: BTreeMap<String, String>,
}

/// Builds the index document for a record, or `None` when its text is blank after trimming.
pub fn build_document(record: &MemoryRecord, source: &str) -> Option<IndexDocument> {
	let text = record.text.trim();

	if text.is_empty() {
		return None;
	}

	let id = record.id.to_string();
	let created_at = record.created_at.format(&Rfc3339).ok();
	let mut metadata = BTreeMap::new();

	for (key, value) in [
		(META_FILE, Some(id.as_str())),
		(META_SOURCE, Some(source)),
		(META_AUTHOR, record.author.as_deref()),
		(META_IMAGE_URL, record.image_url.as_deref()),
		(META_PATIENT_ID, Some(record.patient_id.as_str())),
		(META_CREATED_AT, created_at.as_deref()),
	] {
		if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
			metadata.insert(key.to_string(), value.to_string());
		}
	}

	Some(IndexDocument { id: record.id, text: text.to_string(), metadata })
}
