use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use nv_service::{Error as ServiceError, IdentifyResponse, RebuildReport, SyncReport};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub ok: bool,
	pub mode: &'static str,
	pub catalog_items: usize,
	pub images_dir: String,
	pub labels_path: String,
	pub snapshot_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
	pub image_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRunRequest {
	#[serde(default)]
	pub max_ticks: Option<u32>,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/vision/rebuild", post(rebuild))
		.route("/v1/vision/identify", post(identify))
		.route("/v1/sync/run", post(sync_run))
		.with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	let vision = &state.service.cfg.vision;
	let catalog = state.service.catalog.current();

	Json(HealthResponse {
		ok: true,
		mode: catalog.mode().as_str(),
		catalog_items: catalog.len(),
		images_dir: vision.images_dir.display().to_string(),
		labels_path: vision.labels_path.display().to_string(),
		snapshot_path: vision.snapshot_path.as_ref().map(|path| path.display().to_string()),
	})
}

async fn rebuild(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let report = state.service.rebuild_catalog().await?;

	Ok(Json(report))
}

async fn identify(
	State(state): State<AppState>,
	Json(payload): Json<IdentifyRequest>,
) -> Result<Json<IdentifyResponse>, ApiError> {
	let image = decode_image(&payload.image_base64)?;
	let response = state.service.identify(&image).await?;

	Ok(Json(response))
}

async fn sync_run(
	State(state): State<AppState>,
	payload: Option<Json<SyncRunRequest>>,
) -> Result<Json<SyncReport>, ApiError> {
	let max_ticks = payload
		.and_then(|Json(body)| body.max_ticks)
		.unwrap_or(state.service.cfg.sync.max_ticks);

	if max_ticks == 0 {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"max_ticks must be greater than zero.",
		));
	}

	let report = state.service.run_sync_ticks(max_ticks).await?;

	Ok(Json(report))
}

/// Decodes plain base64 or a `data:<mime>;base64,` URL into image bytes.
pub fn decode_image(raw: &str) -> Result<Vec<u8>, ApiError> {
	let encoded = strip_data_url(raw.trim());
	let bytes = STANDARD.decode(encoded).map_err(|err| {
		json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			format!("Invalid image_base64: {err}."),
		)
	})?;

	if bytes.is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"image_base64 must not be empty.",
		));
	}

	Ok(bytes)
}

fn strip_data_url(raw: &str) -> &str {
	if raw.starts_with("data:")
		&& let Some((_, encoded)) = raw.split_once(',')
	{
		return encoded;
	}

	raw
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, code) = match &err {
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::Extraction { .. } =>
				(StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed"),
			ServiceError::NoReferenceData => (StatusCode::SERVICE_UNAVAILABLE, "no_reference_data"),
			ServiceError::Storage { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
			ServiceError::Index { .. } => (StatusCode::BAD_GATEWAY, "index_error"),
			ServiceError::Catalog { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "catalog_error"),
			ServiceError::ConfigMissing { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "config_missing"),
		};

		json_error(status, code, err.to_string())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		if self.status.is_server_error() {
			tracing::error!(
				error_code = %self.error_code,
				message = %self.message,
				"Request failed."
			);
		}

		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn data_url_prefix_is_stripped() {
		let plain = STANDARD.encode(b"png bytes");
		let data_url = format!("data:image/png;base64,{plain}");

		assert_eq!(decode_image(&plain).expect("plain failed"), b"png bytes");
		assert_eq!(decode_image(&data_url).expect("data url failed"), b"png bytes");
	}

	#[test]
	fn undecodable_payload_is_a_bad_request() {
		let err = decode_image("not base64 at all!").expect_err("expected decode failure");

		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn empty_payload_is_a_bad_request() {
		let err = decode_image("data:image/png;base64,").expect_err("expected empty payload");

		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
	}
}
