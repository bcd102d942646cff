use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Error;

/// Lifecycle of a memory record with respect to index synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStatus {
	Pending,
	Indexed,
	Failed,
}
impl MemoryStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Indexed => "indexed",
			Self::Failed => "failed",
		}
	}
}
impl fmt::Display for MemoryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for MemoryStatus {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"pending" => Ok(Self::Pending),
			"indexed" => Ok(Self::Indexed),
			"failed" => Ok(Self::Failed),
			other => Err(Error::UnknownStatus { value: other.to_string() }),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
	pub id: Uuid,
	pub text: String,
	pub author: Option<String>,
	pub patient_id: String,
	pub image_url: Option<String>,
	pub created_at: OffsetDateTime,
	pub status: MemoryStatus,
	pub attempts: u32,
	pub indexed_at: Option<OffsetDateTime>,
}
impl MemoryRecord {
	/// Pending records are always eligible. Failed records stay eligible until they have used
	/// `max_attempts` attempts; after that they are dead and never selected again.
	pub fn is_eligible(&self, max_attempts: u32) -> bool {
		match self.status {
			MemoryStatus::Pending => true,
			MemoryStatus::Failed => self.attempts < max_attempts,
			MemoryStatus::Indexed => false,
		}
	}

	pub fn is_dead(&self, max_attempts: u32) -> bool {
		self.status == MemoryStatus::Failed && self.attempts >= max_attempts
	}
}

/// Field values applied to every record of a batch in one mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
	pub status: MemoryStatus,
	pub indexed_at: Option<OffsetDateTime>,
	pub increment_attempts: bool,
}
impl RecordUpdate {
	pub fn indexed(now: OffsetDateTime) -> Self {
		Self { status: MemoryStatus::Indexed, indexed_at: Some(now), increment_attempts: false }
	}

	pub fn failed() -> Self {
		Self { status: MemoryStatus::Failed, indexed_at: None, increment_attempts: true }
	}

	/// Applies the update to an in-memory record.
	pub fn apply_to(&self, record: &mut MemoryRecord) {
		record.status = self.status;

		if let Some(indexed_at) = self.indexed_at {
			record.indexed_at = Some(indexed_at);
		}
		if self.increment_attempts {
			record.attempts = record.attempts.saturating_add(1);
		}
	}
}
