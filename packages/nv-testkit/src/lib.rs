//! Scratch Postgres databases and Qdrant namespaces for the ignored integration tests.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, sync::Mutex, thread};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

/// Names a scratch database created from `NV_PG_DSN`. Dropping it without `cleanup` still
/// removes the database and every namespace handed out through it.
pub struct TestDatabase {
	scratch: Scratch,
	dsn: String,
	finished: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Invalid NV_PG_DSN: {err}.")))?;
		let scratch = Scratch {
			database: format!("nv_test_{}", Uuid::new_v4().simple()),
			maintenance: base.clone().database("postgres"),
			qdrant_url: env_qdrant_url(),
			namespaces: Mutex::new(Vec::new()),
		};

		scratch.create().await?;

		let dsn = base.database(&scratch.database).to_url_lossy().to_string();

		Ok(Self { scratch, dsn, finished: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Returns `<prefix>_<database>` and schedules the namespace for deletion.
	pub fn namespace(&self, prefix: &str) -> String {
		let namespace = format!("{prefix}_{}", self.scratch.database);
		let mut namespaces = self.scratch.namespaces.lock().unwrap_or_else(|err| err.into_inner());

		if !namespaces.contains(&namespace) {
			namespaces.push(namespace.clone());
		}

		namespace
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.finished = true;

		self.scratch.remove().await
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.finished {
			return;
		}

		let scratch = self.scratch.detach();
		// Drop may run inside a runtime, so the teardown gets a thread and runtime of its own.
		let handle = thread::spawn(move || {
			let outcome = tokio::runtime::Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| Error::Message(format!("Failed to build cleanup runtime: {err}.")))
				.and_then(|runtime| runtime.block_on(scratch.remove()));

			if let Err(err) = outcome {
				eprintln!("Scratch cleanup for {} failed: {err}", scratch.database);
			}
		});

		let _ = handle.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("NV_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("NV_QDRANT_URL").ok()
}

struct Scratch {
	database: String,
	maintenance: PgConnectOptions,
	qdrant_url: Option<String>,
	namespaces: Mutex<Vec<String>>,
}
impl Scratch {
	fn detach(&self) -> Self {
		let namespaces = self.namespaces.lock().unwrap_or_else(|err| err.into_inner()).clone();

		Self {
			database: self.database.clone(),
			maintenance: self.maintenance.clone(),
			qdrant_url: self.qdrant_url.clone(),
			namespaces: Mutex::new(namespaces),
		}
	}

	async fn create(&self) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.maintenance).await?;

		sqlx::query(&format!(r#"CREATE DATABASE "{}""#, self.database)).execute(&mut conn).await?;

		Ok(())
	}

	/// Drops the namespaces first, then the database. Both are attempted even if one fails.
	async fn remove(&self) -> Result<()> {
		let namespaces = self.namespaces.lock().unwrap_or_else(|err| err.into_inner()).clone();
		let qdrant = self.remove_namespaces(&namespaces).await;
		let postgres = self.remove_database().await;

		qdrant.and(postgres)
	}

	async fn remove_namespaces(&self, namespaces: &[String]) -> Result<()> {
		let Some(url) = self.qdrant_url.as_deref() else {
			return Ok(());
		};

		if namespaces.is_empty() {
			return Ok(());
		}

		let client = Qdrant::from_url(url)
			.build()
			.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;

		for namespace in namespaces {
			client.delete_collection(namespace.clone()).await.map_err(|err| {
				Error::Message(format!("Failed to delete namespace {namespace}: {err}."))
			})?;
		}

		Ok(())
	}

	async fn remove_database(&self) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.maintenance).await?;

		sqlx::query(&format!(r#"DROP DATABASE IF EXISTS "{}" WITH (FORCE)"#, self.database))
			.execute(&mut conn)
			.await?;

		Ok(())
	}
}
