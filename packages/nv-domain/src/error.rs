pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("No reference data in catalog.")]
	NoReferenceData,
	#[error("Feature mismatch: {message}")]
	FeatureMismatch { message: String },
	#[error("Invalid label mapping: {message}")]
	InvalidLabels { message: String },
	#[error("Invalid catalog snapshot: {message}")]
	InvalidSnapshot { message: String },
	#[error("Invalid hash code {value:?}.")]
	InvalidHashCode { value: String },
	#[error("Unknown record status {value:?}.")]
	UnknownStatus { value: String },
}
