use nv_domain::{
	catalog::ReferenceCatalog,
	feature::Feature,
	matcher::{self, MatchPolicy},
};

use crate::{Error, IdentifyResponse, NvService, Result, UNKNOWN_MATCH_ID};

impl NvService {
	/// Identifies a captured image against the published catalog.
	pub async fn identify(&self, image: &[u8]) -> Result<IdentifyResponse> {
		let catalog = self.catalog.current();

		if catalog.is_empty() {
			return Err(Error::NoReferenceData);
		}

		let feature = self.backends.extractor.extract(catalog.mode(), image).await?;
		let policy = MatchPolicy::from_config(&self.cfg.vision);
		let response = match_feature(&feature, &catalog, &policy)?;

		tracing::debug!(
			match_id = %response.match_id,
			distance = response.distance,
			confidence = response.confidence,
			matched_filename = %response.matched_filename,
			"Identified image."
		);

		Ok(response)
	}
}

/// Pure matching step: the same feature and catalog always produce the same response.
pub fn match_feature(
	feature: &Feature,
	catalog: &ReferenceCatalog,
	policy: &MatchPolicy,
) -> Result<IdentifyResponse> {
	let outcome = matcher::find_nearest(feature, catalog, policy)?;

	Ok(IdentifyResponse {
		match_id: outcome.memory_id().unwrap_or(UNKNOWN_MATCH_ID).to_string(),
		label: outcome.label().map(str::to_string),
		confidence: outcome.confidence,
		distance: outcome.distance,
		matched_filename: outcome.nearest.filename.clone(),
	})
}
