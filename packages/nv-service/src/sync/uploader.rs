use uuid::Uuid;

use nv_domain::{
	document::{self, IndexDocument},
	record::{MemoryRecord, RecordUpdate},
};
use nv_storage::qdrant::EnsureOutcome;

use crate::{RecordStore, Result, VectorIndex, sync::SyncSettings};

const MAX_ERROR_CHARS: usize = 1_024;
const REDACTED: &str = "[REDACTED]";
const SECRET_KEYS: [&str; 6] = ["api_key", "apikey", "api-key", "password", "secret", "token"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
	/// Every attempted document was accepted by the index.
	Uploaded,
	/// The namespace could not be ensured or the upload call failed. Carries sanitized error text.
	Failed { error: String },
	/// No record in the batch had content to upload.
	Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
	/// Ids sent to the index, in batch order.
	pub attempted: Vec<Uuid>,
	/// Ids already marked failed for blank text.
	pub empty: Vec<Uuid>,
	pub status: UploadStatus,
}

/// Shapes a claimed batch into documents and uploads them in one call.
///
/// Records with blank text are failed individually right away and never uploaded. The rest share
/// one outcome.
pub async fn upload_batch(
	store: &dyn RecordStore,
	index: &dyn VectorIndex,
	settings: &SyncSettings,
	batch: &[MemoryRecord],
	owner: Uuid,
) -> Result<BatchOutcome> {
	let mut docs: Vec<IndexDocument> = Vec::with_capacity(batch.len());
	let mut empty = Vec::new();

	for record in batch {
		match document::build_document(record, &settings.source) {
			Some(doc) => docs.push(doc),
			None => {
				store.apply_bulk(&[record.id], &RecordUpdate::failed(), owner).await?;

				tracing::warn!(record_id = %record.id, "Record has no text. Marked failed.");

				empty.push(record.id);
			},
		}
	}

	let attempted = docs.iter().map(|doc| doc.id).collect::<Vec<_>>();

	if docs.is_empty() {
		return Ok(BatchOutcome { attempted, empty, status: UploadStatus::Nothing });
	}

	let status = match push_documents(index, settings, &docs).await {
		Ok(()) => UploadStatus::Uploaded,
		Err(err) => {
			let error = sanitize_error(&err.to_string());

			tracing::error!(
				error = %error,
				namespace = %settings.namespace,
				count = docs.len(),
				"Batch upload failed."
			);

			UploadStatus::Failed { error }
		},
	};

	Ok(BatchOutcome { attempted, empty, status })
}

async fn push_documents(
	index: &dyn VectorIndex,
	settings: &SyncSettings,
	docs: &[IndexDocument],
) -> Result<()> {
	let ensured = index.ensure_namespace(&settings.namespace, &settings.doc_type).await?;

	if ensured == EnsureOutcome::AlreadyExists {
		tracing::debug!(namespace = %settings.namespace, "Namespace already exists.");
	}

	index.upload(&settings.namespace, docs).await
}

/// Redacts bearer tokens and `key=value` secrets and caps the length.
pub fn sanitize_error(text: &str) -> String {
	let mut previous: Option<&str> = None;
	let words = text
		.split_whitespace()
		.map(|word| {
			let masked = match previous {
				Some(prev) if prev.eq_ignore_ascii_case("bearer") => REDACTED.to_string(),
				_ => redact_assignment(word),
			};

			previous = Some(word);

			masked
		})
		.collect::<Vec<_>>();

	truncate_chars(words.join(" "), MAX_ERROR_CHARS)
}

/// Masks the value of `key=value` or `key:value` when the key names a credential.
fn redact_assignment(word: &str) -> String {
	let Some(split) = word.find(['=', ':']) else {
		return word.to_string();
	};
	let key = word[..split].to_ascii_lowercase();

	if SECRET_KEYS.iter().any(|secret| key.contains(secret)) {
		format!("{}{REDACTED}", &word[..=split])
	} else {
		word.to_string()
	}
}

fn truncate_chars(mut text: String, max: usize) -> String {
	if let Some((cut, _)) = text.char_indices().nth(max) {
		text.truncate(cut);
		text.push_str("...");
	}

	text
}
