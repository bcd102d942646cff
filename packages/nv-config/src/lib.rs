mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EMBEDDING_CONFIDENCE_SCALE, EMBEDDING_UNKNOWN_THRESHOLD, HASH_CONFIDENCE_SCALE,
	HASH_UNKNOWN_THRESHOLD, ImageEmbeddingProviderConfig, Index, Postgres, Providers, Service,
	Storage, SyncConfig, Vision, VisionMode,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::ConfigMissing { key: "storage.postgres.dsn".to_string() });
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.index.url.trim().is_empty() {
		return Err(Error::ConfigMissing { key: "storage.index.url".to_string() });
	}
	if cfg.storage.index.namespace.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.index.namespace must be non-empty.".to_string(),
		});
	}
	if cfg.storage.index.doc_type != "text" {
		return Err(Error::Validation {
			message: "storage.index.doc_type must be text.".to_string(),
		});
	}
	if cfg.sync.batch_size == 0 {
		return Err(Error::Validation {
			message: "sync.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.max_attempts == 0 {
		return Err(Error::Validation {
			message: "sync.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.max_ticks == 0 {
		return Err(Error::Validation {
			message: "sync.max_ticks must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "sync.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "sync.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.notify_channel.trim().is_empty() {
		return Err(Error::Validation {
			message: "sync.notify_channel must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("vision.unknown_threshold", cfg.vision.unknown_threshold),
		("vision.confidence_scale", cfg.vision.confidence_scale),
	] {
		let Some(value) = value else {
			continue;
		};

		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value <= 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.vision.mode == VisionMode::Embedding {
		let Some(provider) = cfg.providers.image_embedding.as_ref() else {
			return Err(Error::ConfigMissing { key: "providers.image_embedding".to_string() });
		};

		if provider.api_key.trim().is_empty() {
			return Err(Error::ConfigMissing {
				key: "providers.image_embedding.api_key".to_string(),
			});
		}
		if provider.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.image_embedding.dimensions must be greater than zero."
					.to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.index.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.index.api_key = None;
	}
	if cfg
		.vision
		.snapshot_path
		.as_deref()
		.map(|path| path.as_os_str().is_empty())
		.unwrap_or(false)
	{
		cfg.vision.snapshot_path = None;
	}

	cfg.storage.index.namespace = cfg.storage.index.namespace.trim().to_string();
}
