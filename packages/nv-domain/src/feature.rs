use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use nv_config::VisionMode;

use crate::{Error, Result};

/// A 64-bit perceptual hash. Bit 63 is the first coefficient in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashCode(pub u64);
impl HashCode {
	pub const BITS: u32 = 64;

	pub fn from_bits(bits: &[bool]) -> Self {
		let mut value = 0_u64;

		for bit in bits.iter().take(Self::BITS as usize) {
			value = (value << 1) | u64::from(*bit);
		}

		Self(value)
	}

	pub fn to_hex(self) -> String {
		format!("{:016x}", self.0)
	}

	pub fn from_hex(value: &str) -> Result<Self> {
		let trimmed = value.trim();

		if trimmed.len() != 16 {
			return Err(Error::InvalidHashCode { value: value.to_string() });
		}

		u64::from_str_radix(trimmed, 16)
			.map(Self)
			.map_err(|_| Error::InvalidHashCode { value: value.to_string() })
	}

	pub fn hamming(self, other: Self) -> u32 {
		(self.0 ^ other.0).count_ones()
	}
}
impl fmt::Display for HashCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}
impl Serialize for HashCode {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_hex())
	}
}
impl<'de> Deserialize<'de> for HashCode {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Self::from_hex(&raw).map_err(serde::de::Error::custom)
	}
}

/// A comparable image feature. The variant fixes the distance metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feature {
	Hash(HashCode),
	Embedding(Vec<f32>),
}
impl Feature {
	pub fn mode(&self) -> VisionMode {
		match self {
			Self::Hash(_) => VisionMode::Hash,
			Self::Embedding(_) => VisionMode::Embedding,
		}
	}

	pub fn dimensions(&self) -> usize {
		match self {
			Self::Hash(_) => HashCode::BITS as usize,
			Self::Embedding(vec) => vec.len(),
		}
	}

	/// Hamming distance for hashes, `1 - cosine similarity` for embeddings.
	pub fn distance(&self, other: &Self) -> Result<f32> {
		match (self, other) {
			(Self::Hash(a), Self::Hash(b)) => Ok(a.hamming(*b) as f32),
			(Self::Embedding(a), Self::Embedding(b)) => cosine_distance(a, b),
			(a, b) => Err(Error::FeatureMismatch {
				message: format!(
					"cannot compare {} feature with {} feature",
					a.mode().as_str(),
					b.mode().as_str()
				),
			}),
		}
	}
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
	if a.len() != b.len() {
		return Err(Error::FeatureMismatch {
			message: format!("embedding dimension {} does not match {}", a.len(), b.len()),
		});
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b.iter()) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return Ok(1.0);
	}

	let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);

	Ok((1.0 - similarity).max(0.0) as f32)
}
