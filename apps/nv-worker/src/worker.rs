//! Sync request queue.
//!
//! Requests come from the poll timer and from Postgres notifications on the configured channel,
//! which writers of memory records send with `NOTIFY`. Other in-process notifiers can hold a
//! cloned [`SyncTrigger`]. The driver loop drains everything queued before each run, so any
//! number of requests that pile up while a run is in flight cause exactly one follow-up run.

use std::{sync::Arc, time::Duration};

use sqlx::{
	PgPool,
	postgres::{PgListener, PgNotification},
};
use tokio::{
	sync::mpsc::{self, Receiver, Sender, error::TrySendError},
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};

use nv_service::NvService;

const QUEUE_CAPACITY: usize = 16;
const LISTEN_RETRY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
	Poll,
	Notify { reason: String },
}

/// Cloneable handle used to ask the worker for a sync run.
#[derive(Debug, Clone)]
pub struct SyncTrigger {
	tx: Sender<SyncRequest>,
}
impl SyncTrigger {
	/// Enqueues `request`. Returns `false` once the worker has stopped.
	///
	/// A full queue already guarantees a pending run, so the request is dropped in that case.
	pub fn request(&self, request: SyncRequest) -> bool {
		match self.tx.try_send(request) {
			Ok(()) => true,
			Err(TrySendError::Full(request)) => {
				tracing::debug!(?request, "Sync queue is full. Request coalesced.");

				true
			},
			Err(TrySendError::Closed(_)) => false,
		}
	}

	pub fn notify(&self, reason: impl Into<String>) -> bool {
		self.request(SyncRequest::Notify { reason: reason.into() })
	}
}

pub fn channel() -> (SyncTrigger, Receiver<SyncRequest>) {
	let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);

	(SyncTrigger { tx }, rx)
}

/// Enqueues a poll request every `interval`, starting immediately.
pub fn spawn_poller(trigger: SyncTrigger, interval: Duration) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = time::interval(interval);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;

			if !trigger.request(SyncRequest::Poll) {
				break;
			}
		}
	})
}

/// Subscribes to `channel` and turns each notification into a [`SyncRequest::Notify`].
///
/// The listener reconnects on its own after a dropped connection; notifications sent while it
/// was disconnected are covered by the next poll.
pub async fn spawn_listener(
	pool: &PgPool,
	channel: &str,
	trigger: SyncTrigger,
) -> sqlx::Result<JoinHandle<()>> {
	let mut listener = PgListener::connect_with(pool).await?;

	listener.listen(channel).await?;

	Ok(tokio::spawn(async move {
		loop {
			match listener.recv().await {
				Ok(notification) =>
					if !trigger.notify(notify_reason(&notification)) {
						break;
					},
				Err(err) => {
					tracing::warn!(error = %err, "Sync notification listener lost its connection.");

					time::sleep(LISTEN_RETRY).await;
				},
			}
		}
	}))
}

fn notify_reason(notification: &PgNotification) -> String {
	reason_from_payload(notification.channel(), notification.payload())
}

fn reason_from_payload(channel: &str, payload: &str) -> String {
	let payload = payload.trim();

	if payload.is_empty() { channel.to_string() } else { payload.to_string() }
}

/// Consumes requests until every trigger is dropped, running the sync driver once per drained
/// group of requests.
pub async fn drive(service: Arc<NvService>, mut requests: Receiver<SyncRequest>, max_ticks: u32) {
	while let Some(first) = requests.recv().await {
		let coalesced = drain(&mut requests);

		tracing::debug!(request = ?first, coalesced, "Sync requested.");

		match service.run_sync_ticks(max_ticks).await {
			Ok(report) => tracing::info!(
				ticks = report.processed_per_tick.len(),
				processed = report.total(),
				processed_per_tick = ?report.processed_per_tick,
				"Sync run finished."
			),
			Err(err) => tracing::error!(error = %err, "Sync run failed."),
		}
	}

	tracing::info!("Sync queue closed. Worker stopped.");
}

fn drain(requests: &mut Receiver<SyncRequest>) -> usize {
	let mut count = 0;

	while requests.try_recv().is_ok() {
		count += 1;
	}

	count
}
