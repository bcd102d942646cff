use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Embeds one image through an OpenAI-style embeddings endpoint that accepts data URLs as input.
pub async fn embed_image(
	cfg: &nv_config::ImageEmbeddingProviderConfig,
	image: &[u8],
) -> Result<Vec<f32>> {
	let mime = image_mime(image)?;
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": [format!("data:{mime};base64,{}", STANDARD.encode(image))],
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vec = parse_embedding_response(json)?;

	tracing::debug!(
		provider_id = %cfg.provider_id,
		model = %cfg.model,
		dimensions = vec.len(),
		"Received image embedding."
	);

	if vec.len() != cfg.dimensions as usize {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding dimension {} does not match configured dimensions {}.",
				vec.len(),
				cfg.dimensions
			),
		});
	}

	Ok(vec)
}

fn image_mime(image: &[u8]) -> Result<&'static str> {
	let format =
		image::guess_format(image).map_err(|err| Error::Decode { message: err.to_string() })?;

	match format {
		image::ImageFormat::Png => Ok("image/png"),
		image::ImageFormat::Jpeg => Ok("image/jpeg"),
		other => Err(Error::Decode { message: format!("Unsupported image format {other:?}.") }),
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<f32>> {
	let item = json
		.get("data")
		.and_then(|v| v.as_array())
		.and_then(|data| data.first())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Embedding response is missing data array.".to_string(),
		})?;
	let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding item missing embedding array.".to_string() }
	})?;
	let mut vec = Vec::with_capacity(embedding.len());

	for value in embedding {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding value must be numeric.".to_string(),
		})?;

		vec.push(number as f32);
	}

	Ok(vec)
}
