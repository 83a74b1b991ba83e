// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background snapshot polling.
//!
//! A [`Poller`] runs a tick function on a fixed interval in a tokio task until
//! it is stopped, dropped, or the tick asks it to stop.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Shortest interval between ticks.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to a running background poll loop.
#[derive(Debug)]
pub struct Poller {
	/// Number of completed ticks.
	ticks: Arc<AtomicU64>,
	/// Handle to the background task.
	task_handle: Option<JoinHandle<()>>,
	/// Channel to signal shutdown.
	shutdown_tx: Option<mpsc::Sender<()>>,
}

impl Poller {
	/// Spawns the poll loop on `runtime`.
	///
	/// `tick` runs after every `interval` (at least [`MIN_POLL_INTERVAL`]).
	/// Returning `false` from it ends the loop.
	pub fn start<F, Fut>(runtime: &Handle, interval: Duration, tick: F) -> Self
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = bool> + Send + 'static,
	{
		let interval = interval.max(MIN_POLL_INTERVAL);
		let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
		let ticks = Arc::new(AtomicU64::new(0));

		let loop_ticks = Arc::clone(&ticks);
		let handle = runtime.spawn(async move {
			run_poll_loop(interval, tick, loop_ticks, shutdown_rx).await;
		});

		info!(interval_secs = interval.as_secs(), "Snapshot poller started");

		Self {
			ticks,
			task_handle: Some(handle),
			shutdown_tx: Some(shutdown_tx),
		}
	}

	/// Stops the loop and waits for the task to finish.
	pub async fn stop(mut self) {
		if let Some(tx) = self.shutdown_tx.take() {
			let _ = tx.send(()).await;
		}
		if let Some(handle) = self.task_handle.take() {
			handle.abort();
			let _ = handle.await;
		}
		info!("Snapshot poller stopped");
	}

	/// Returns true while the background task is alive.
	pub fn is_running(&self) -> bool {
		self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
	}

	/// Returns the number of ticks completed since the poller was started.
	pub fn ticks(&self) -> u64 {
		self.ticks.load(Ordering::SeqCst)
	}
}

impl Drop for Poller {
	fn drop(&mut self) {
		if let Some(handle) = self.task_handle.take() {
			handle.abort();
		}
	}
}

async fn run_poll_loop<F, Fut>(
	interval: Duration,
	mut tick: F,
	ticks: Arc<AtomicU64>,
	mut shutdown_rx: mpsc::Receiver<()>,
) where
	F: FnMut() -> Fut,
	Fut: Future<Output = bool>,
{
	loop {
		tokio::select! {
			_ = tokio::time::sleep(interval) => {}
			_ = shutdown_rx.recv() => {
				debug!("Snapshot poller received shutdown signal");
				break;
			}
		}

		let keep_going = tick().await;
		ticks.fetch_add(1, Ordering::SeqCst);
		if !keep_going {
			debug!("Snapshot poller tick requested stop");
			break;
		}
	}
}
