use crate::{
	Error, Result,
	catalog::{ReferenceCatalog, ReferenceItem},
	feature::Feature,
};

/// Mode-specific constants that turn a raw distance into a decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
	/// Distances at or above this are reported as unknown.
	pub unknown_threshold: f32,
	/// Distance at which confidence reaches zero.
	pub confidence_scale: f32,
}
impl MatchPolicy {
	pub fn from_config(cfg: &nv_config::Vision) -> Self {
		Self {
			unknown_threshold: cfg.unknown_threshold(),
			confidence_scale: cfg.confidence_scale(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome<'a> {
	pub nearest: &'a ReferenceItem,
	pub distance: f32,
	pub confidence: f32,
	pub known: bool,
}
impl MatchOutcome<'_> {
	pub fn memory_id(&self) -> Option<&str> {
		self.known.then_some(self.nearest.memory_id.as_str())
	}

	pub fn label(&self) -> Option<&str> {
		self.known.then_some(self.nearest.label.as_str())
	}
}

/// Linear scan for the nearest reference. Ties keep the earlier item in catalog order.
pub fn find_nearest<'a>(
	query: &Feature,
	catalog: &'a ReferenceCatalog,
	policy: &MatchPolicy,
) -> Result<MatchOutcome<'a>> {
	if query.mode() != catalog.mode() {
		return Err(Error::FeatureMismatch {
			message: format!(
				"query is a {} feature but the catalog holds {} features",
				query.mode().as_str(),
				catalog.mode().as_str()
			),
		});
	}

	let mut best: Option<(&ReferenceItem, f32)> = None;

	for item in catalog.items() {
		let distance = query.distance(&item.feature)?;

		if best.map(|(_, best_distance)| distance < best_distance).unwrap_or(true) {
			best = Some((item, distance));
		}
	}

	let Some((nearest, distance)) = best else {
		return Err(Error::NoReferenceData);
	};

	Ok(MatchOutcome {
		nearest,
		distance,
		confidence: confidence_from_distance(distance, policy.confidence_scale),
		known: distance < policy.unknown_threshold,
	})
}

/// `clamp(1 - distance / scale, 0, 1)` rounded to three decimals.
pub fn confidence_from_distance(distance: f32, scale: f32) -> f32 {
	if distance <= 0.0 {
		return 1.0;
	}

	let raw = (1.0 - f64::from(distance) / f64::from(scale)).clamp(0.0, 1.0);

	((raw * 1_000.0).round() / 1_000.0) as f32
}

#[cfg(test)]
mod tests {
	use nv_config::VisionMode;

	use super::*;
	use crate::feature::HashCode;

	const HASH_POLICY: MatchPolicy =
		MatchPolicy { unknown_threshold: 13.0, confidence_scale: 20.0 };

	fn item(filename: &str, code: u64) -> ReferenceItem {
		ReferenceItem {
			filename: filename.to_string(),
			label: filename.to_string(),
			memory_id: format!("mem_{filename}"),
			feature: Feature::Hash(HashCode(code)),
		}
	}

	fn catalog(items: Vec<ReferenceItem>) -> ReferenceCatalog {
		ReferenceCatalog::new(VisionMode::Hash, items).expect("catalog failed")
	}

	#[test]
	fn nearest_known_match_wins_over_far_item() {
		// Two differing bits versus fifteen.
		let catalog = catalog(vec![item("far.png", 0x7fff), item("near.png", 0b11)]);
		let query = Feature::Hash(HashCode(0));
		let outcome = find_nearest(&query, &catalog, &HASH_POLICY).expect("match failed");

		assert_eq!(outcome.nearest.filename, "near.png");
		assert_eq!(outcome.distance, 2.0);
		assert!(outcome.known);
		assert_eq!(outcome.memory_id(), Some("mem_near.png"));
		assert_eq!(outcome.confidence, 0.9);
	}

	#[test]
	fn distance_at_threshold_is_unknown_but_keeps_diagnostics() {
		let catalog = catalog(vec![item("a.png", 0x1fff)]);
		let outcome = find_nearest(&Feature::Hash(HashCode(0)), &catalog, &HASH_POLICY)
			.expect("match failed");

		assert_eq!(outcome.distance, 13.0);
		assert!(!outcome.known);
		assert_eq!(outcome.memory_id(), None);
		assert_eq!(outcome.label(), None);
		assert_eq!(outcome.nearest.filename, "a.png");
		assert_eq!(outcome.confidence, 0.35);
	}

	#[test]
	fn ties_keep_first_item() {
		let catalog = catalog(vec![item("first.png", 0b01), item("second.png", 0b10)]);
		let outcome = find_nearest(&Feature::Hash(HashCode(0)), &catalog, &HASH_POLICY)
			.expect("match failed");

		assert_eq!(outcome.nearest.filename, "first.png");
	}

	#[test]
	fn exact_match_has_full_confidence() {
		let catalog = catalog(vec![item("a.png", 0xabcdef)]);
		let outcome = find_nearest(&Feature::Hash(HashCode(0xabcdef)), &catalog, &HASH_POLICY)
			.expect("match failed");

		assert_eq!(outcome.distance, 0.0);
		assert_eq!(outcome.confidence, 1.0);
	}

	#[test]
	fn empty_catalog_has_no_reference_data() {
		let catalog = ReferenceCatalog::empty(VisionMode::Hash);
		let result = find_nearest(&Feature::Hash(HashCode(0)), &catalog, &HASH_POLICY);

		assert!(matches!(result, Err(Error::NoReferenceData)));
	}

	#[test]
	fn query_mode_must_match_catalog() {
		let catalog = catalog(vec![item("a.png", 0)]);
		let result = find_nearest(&Feature::Embedding(vec![1.0]), &catalog, &HASH_POLICY);

		assert!(matches!(result, Err(Error::FeatureMismatch { .. })));
	}

	#[test]
	fn confidence_is_clamped() {
		assert_eq!(confidence_from_distance(40.0, 20.0), 0.0);
		assert_eq!(confidence_from_distance(0.0, 20.0), 1.0);
		assert_eq!(confidence_from_distance(0.1, 1.0), 0.9);
	}

	#[test]
	fn repeated_identification_is_stable() {
		let catalog = catalog(vec![item("a.png", 0b1), item("b.png", 0b1110)]);
		let query = Feature::Hash(HashCode(0b11));
		let first = find_nearest(&query, &catalog, &HASH_POLICY).expect("match failed");
		let second = find_nearest(&query, &catalog, &HASH_POLICY).expect("match failed");

		assert_eq!(first, second);
	}
}
