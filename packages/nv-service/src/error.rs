pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Missing required setting {key}.")]
	ConfigMissing { key: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
	#[error("Extraction failed: {message}")]
	Extraction { message: String },
	#[error("Catalog error: {message}")]
	Catalog { message: String },
	#[error("No reference data is loaded.")]
	NoReferenceData,
}
impl From<nv_storage::Error> for Error {
	fn from(err: nv_storage::Error) -> Self {
		match err {
			nv_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			nv_storage::Error::InvalidRow(message) => Self::Storage { message },
			nv_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			nv_storage::Error::Qdrant(inner) => Self::Index { message: inner.to_string() },
		}
	}
}
impl From<nv_providers::Error> for Error {
	fn from(err: nv_providers::Error) -> Self {
		Self::Extraction { message: err.to_string() }
	}
}
impl From<nv_domain::Error> for Error {
	fn from(err: nv_domain::Error) -> Self {
		match err {
			nv_domain::Error::NoReferenceData => Self::NoReferenceData,
			nv_domain::Error::FeatureMismatch { message } => Self::Extraction { message },
			other => Self::Catalog { message: other.to_string() },
		}
	}
}
