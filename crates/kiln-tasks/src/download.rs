// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Streaming downloads recorded as `downloading` tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TaskError};
use crate::model::{NewTask, TaskId, TaskSize, TaskUpdate};
use crate::registry::TaskRegistry;

const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const REPORT_EVERY_BYTES: u64 = 256 * 1024;

#[derive(Debug, Error)]
enum TransferError {
	#[error("request failed: {0}")]
	Request(#[from] reqwest::Error),

	#[error("upstream returned {0}")]
	Status(StatusCode),

	#[error("no response headers within {0:?}")]
	HeaderTimeout(Duration),

	#[error("no data received for {0:?}")]
	IdleTimeout(Duration),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Task(#[from] TaskError),
}

/// Downloads a URL to a path while keeping a task up to date.
#[derive(Clone)]
pub struct Downloader {
	client: Client,
	registry: Arc<TaskRegistry>,
	header_timeout: Duration,
	idle_timeout: Duration,
}

impl Downloader {
	pub fn new(client: Client, registry: Arc<TaskRegistry>) -> Self {
		Self {
			client,
			registry,
			header_timeout: DEFAULT_HEADER_TIMEOUT,
			idle_timeout: DEFAULT_IDLE_TIMEOUT,
		}
	}

	pub fn with_timeouts(mut self, header_timeout: Duration, idle_timeout: Duration) -> Self {
		self.header_timeout = header_timeout;
		self.idle_timeout = idle_timeout;
		self
	}

	pub fn registry(&self) -> &Arc<TaskRegistry> {
		&self.registry
	}

	/// Allocate the task for a download without touching the network.
	pub async fn begin(&self, url: &str, path: &Path) -> Result<TaskId> {
		self.registry.create(NewTask::download(url, path)).await
	}

	/// Transfer `url` into `path` under an already allocated task.
	///
	/// The body is written to `<path>.part` and renamed into place before the
	/// task is completed. Any failure marks the task failed.
	#[instrument(skip(self), fields(task_id = %id))]
	pub async fn run(&self, id: TaskId, url: &str, path: &Path) -> Result<()> {
		let part = part_path(path);

		match self.transfer(id, url, path, &part).await {
			Ok(bytes) => {
				info!(bytes, path = %path.display(), "download finished");
				Ok(())
			}
			Err(e) => {
				let reason = e.to_string();
				if let Err(cleanup) = tokio::fs::remove_file(&part).await {
					debug!(error = %cleanup, "no partial file to remove");
				}
				self.registry.mark_failed(id, reason.clone()).await?;
				Err(TaskError::TransferFailed {
					task_id: id,
					reason,
				})
			}
		}
	}

	/// `begin` then `run`.
	pub async fn download(&self, url: &str, path: &Path) -> Result<TaskId> {
		let id = self.begin(url, path).await?;
		self.run(id, url, path).await?;
		Ok(id)
	}

	async fn transfer(
		&self,
		id: TaskId,
		url: &str,
		path: &Path,
		part: &Path,
	) -> std::result::Result<u64, TransferError> {
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		debug!(url, "requesting download");
		let resp = tokio::time::timeout(self.header_timeout, self.client.get(url).send())
			.await
			.map_err(|_| TransferError::HeaderTimeout(self.header_timeout))??;

		let status = resp.status();
		if !status.is_success() {
			return Err(TransferError::Status(status));
		}

		let total = resp.content_length().unwrap_or(0);
		if total == 0 {
			warn!(url, "upstream did not announce a length, progress is approximate");
		}
		self.registry
			.update(id, TaskUpdate::new().size(TaskSize::with_total(total)))
			.await?;

		let mut file = tokio::fs::File::create(part).await?;
		let mut stream = resp.bytes_stream();
		let mut received: u64 = 0;
		let mut unreported: u64 = 0;

		loop {
			let next = tokio::time::timeout(self.idle_timeout, stream.next())
				.await
				.map_err(|_| TransferError::IdleTimeout(self.idle_timeout))?;
			let Some(chunk) = next else {
				break;
			};
			let chunk = chunk?;

			file.write_all(&chunk).await?;
			received += chunk.len() as u64;
			unreported += chunk.len() as u64;

			if unreported >= REPORT_EVERY_BYTES {
				self.registry.account_bytes(id, unreported, 99).await?;
				unreported = 0;
			}
		}

		file.flush().await?;
		file.sync_all().await?;
		drop(file);

		if unreported > 0 {
			self.registry.account_bytes(id, unreported, 99).await?;
		}

		tokio::fs::rename(part, path).await?;

		let final_total = if total > 0 { total } else { received };
		self.registry
			.update(
				id,
				TaskUpdate::completed().size(TaskSize {
					total: final_total,
					current: received,
				}),
			)
			.await?;

		Ok(received)
	}
}

fn part_path(path: &Path) -> PathBuf {
	let mut name = path.as_os_str().to_owned();
	name.push(".part");
	PathBuf::from(name)
}
