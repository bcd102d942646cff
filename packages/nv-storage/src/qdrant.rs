pub const BM25_VECTOR_NAME: &str = "bm25";
pub const BM25_MODEL: &str = "qdrant/bm25";
pub const TEXT_DOC_TYPE: &str = "text";

use std::collections::HashMap;

use qdrant_client::{
	Qdrant, QdrantError,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Document, Modifier, PointStruct, SparseVectorParamsBuilder,
		SparseVectorsConfigBuilder, UpsertPointsBuilder, Value, Vector,
	},
};
use serde_json::Value as JsonValue;

use nv_domain::document::IndexDocument;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
	Created,
	AlreadyExists,
}

/// Vector index backed by Qdrant. Each namespace is a collection holding a BM25 sparse vector
/// that the server infers from the document text.
pub struct QdrantIndex {
	pub client: Qdrant,
}
impl QdrantIndex {
	pub fn new(cfg: &nv_config::Index) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?;

		Ok(Self { client })
	}

	/// Creates the namespace. An existing namespace is reported, not treated as a failure.
	pub async fn ensure_namespace(&self, name: &str, doc_type: &str) -> Result<EnsureOutcome> {
		if doc_type != TEXT_DOC_TYPE {
			return Err(Error::InvalidArgument(format!("Unsupported doc type {doc_type:?}.")));
		}

		let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

		sparse_vectors_config.add_named_vector_params(
			BM25_VECTOR_NAME,
			SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
		);

		let builder = CreateCollectionBuilder::new(name.to_string())
			.sparse_vectors_config(sparse_vectors_config);

		match self.client.create_collection(builder).await {
			Ok(_) => Ok(EnsureOutcome::Created),
			Err(err) if is_already_exists_error(&err) => Ok(EnsureOutcome::AlreadyExists),
			Err(err) => Err(err.into()),
		}
	}

	/// Upserts every document in one request; the call succeeds or fails as a whole.
	pub async fn upload(&self, namespace: &str, docs: &[IndexDocument]) -> Result<()> {
		if docs.is_empty() {
			return Ok(());
		}

		let points = docs.iter().map(document_point).collect::<Vec<_>>();
		let upsert = UpsertPointsBuilder::new(namespace.to_string(), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}
}

pub fn is_already_exists_error(err: &QdrantError) -> bool {
	let message = err.to_string().to_lowercase();

	message.contains("already exists")
}

fn document_point(doc: &IndexDocument) -> PointStruct {
	let mut payload_map = HashMap::new();
	let metadata = doc
		.metadata
		.iter()
		.map(|(key, value)| (key.clone(), JsonValue::String(value.clone())))
		.collect::<serde_json::Map<_, _>>();

	payload_map.insert("text".to_string(), Value::from(doc.text.clone()));
	payload_map.insert("metadata".to_string(), Value::from(JsonValue::Object(metadata)));

	let mut vector_map = HashMap::new();

	vector_map.insert(
		BM25_VECTOR_NAME.to_string(),
		Vector::from(Document::new(doc.text.clone(), BM25_MODEL)),
	);

	PointStruct::new(doc.id.to_string(), vector_map, Payload::from(payload_map))
}
