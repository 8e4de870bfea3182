// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Live and archived task sets, persisted as two whole documents.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kiln_common_store::{load_document, save_document, DocumentStore};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::model::{NewTask, Task, TaskId, TaskStatus, TaskUpdate};

pub const TASKS_DOCUMENT: &str = "tasks";
pub const ARCHIVED_TASKS_DOCUMENT: &str = "archived_tasks";

type TaskMap = BTreeMap<TaskId, Task>;

#[derive(Default)]
struct TaskSets {
	live: TaskMap,
	archived: TaskMap,
}

/// Tracks long-running work (downloads, unpacks) with persisted progress.
///
/// All mutations run under one async mutex and are written to the store
/// before the in-memory sets change, so a failed write leaves the registry
/// as it was.
pub struct TaskRegistry {
	store: Arc<dyn DocumentStore>,
	sets: Mutex<TaskSets>,
}

impl TaskRegistry {
	/// Load both task documents. An id present in both is kept only in the
	/// archive.
	#[instrument(skip(store))]
	pub async fn open(store: Arc<dyn DocumentStore>) -> Result<Self> {
		let mut live: TaskMap = load_document(store.as_ref(), TASKS_DOCUMENT)
			.await?
			.unwrap_or_default();
		let archived: TaskMap = load_document(store.as_ref(), ARCHIVED_TASKS_DOCUMENT)
			.await?
			.unwrap_or_default();

		let before = live.len();
		live.retain(|id, _| !archived.contains_key(id));
		if live.len() != before {
			warn!(
				duplicates = before - live.len(),
				"dropping live tasks that are already archived"
			);
			save_document(store.as_ref(), TASKS_DOCUMENT, &live).await?;
		}

		info!(
			live = live.len(),
			archived = archived.len(),
			"task registry loaded"
		);

		Ok(Self {
			store,
			sets: Mutex::new(TaskSets { live, archived }),
		})
	}

	pub async fn create(&self, new: NewTask) -> Result<TaskId> {
		let id = TaskId::new();
		let task_type = new.task_type;
		let task = new.into_task(id, Utc::now());

		let mut sets = self.sets.lock().await;
		let mut live = sets.live.clone();
		live.insert(id, task);
		self.save_live(&live).await?;
		sets.live = live;

		info!(task_id = %id, task_type = %task_type, "task created");
		Ok(id)
	}

	/// Merge `update` into a live task. Returns `false` for an unknown id.
	///
	/// A task that reaches `completed` is archived in the same step. If its
	/// target path does not exist it stays live and in progress instead.
	pub async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<bool> {
		let mut sets = self.sets.lock().await;
		self.mutate(&mut sets, id, |task, now| update.apply(task, now))
			.await
	}

	/// Move a live task into the archive once its target path exists.
	pub async fn archive(&self, id: TaskId) -> Result<bool> {
		let mut sets = self.sets.lock().await;
		let Some(task) = sets.live.get(&id).cloned() else {
			return Ok(false);
		};

		if !path_exists(&task.path).await {
			warn!(task_id = %id, path = %task.path.display(), "task target missing, not archiving");
			return Ok(false);
		}

		self.commit_archive(&mut sets, task, Utc::now()).await?;
		Ok(true)
	}

	/// Account `bytes` more transferred data and recompute the percentage.
	pub async fn record_progress(&self, id: TaskId, bytes: u64) -> Result<bool> {
		self.account_bytes(id, bytes, 100).await
	}

	pub(crate) async fn account_bytes(&self, id: TaskId, bytes: u64, ceiling: u8) -> Result<bool> {
		let mut sets = self.sets.lock().await;
		self.mutate(&mut sets, id, |task, now| {
			let mut size = task.size.unwrap_or_default();
			size.current += bytes;
			TaskUpdate::new()
				.size(size)
				.progress(size.percent().min(ceiling))
				.apply(task, now);
		})
		.await
	}

	pub async fn mark_failed(&self, id: TaskId, error: impl Into<String>) -> Result<bool> {
		let error = error.into();
		warn!(task_id = %id, error = %error, "task failed");
		self.update(id, TaskUpdate::failed(error)).await
	}

	/// Look a task up in either set.
	pub async fn get(&self, id: TaskId) -> Option<Task> {
		let sets = self.sets.lock().await;
		sets.live
			.get(&id)
			.or_else(|| sets.archived.get(&id))
			.cloned()
	}

	/// Live tasks with the given status. Completed tasks live in the archive.
	pub async fn list_by_status(&self, status: TaskStatus) -> Vec<Task> {
		let sets = self.sets.lock().await;
		sets.live
			.values()
			.filter(|t| t.status == status)
			.cloned()
			.collect()
	}

	pub async fn list_archived(&self) -> Vec<Task> {
		self.sets.lock().await.archived.values().cloned().collect()
	}

	async fn mutate<F>(&self, sets: &mut TaskSets, id: TaskId, f: F) -> Result<bool>
	where
		F: FnOnce(&mut Task, DateTime<Utc>),
	{
		let Some(current) = sets.live.get(&id) else {
			debug!(task_id = %id, "update for unknown task ignored");
			return Ok(false);
		};

		let mut task = current.clone();
		let now = Utc::now();
		f(&mut task, now);

		if task.status == TaskStatus::Completed {
			if path_exists(&task.path).await {
				self.commit_archive(sets, task, now).await?;
				return Ok(true);
			}
			warn!(
				task_id = %id,
				path = %task.path.display(),
				"task reported complete but target is missing"
			);
			task.status = TaskStatus::InProgress;
			task.progress = task.progress.min(99);
		}

		let mut live = sets.live.clone();
		live.insert(id, task);
		self.save_live(&live).await?;
		sets.live = live;
		Ok(true)
	}

	async fn commit_archive(&self, sets: &mut TaskSets, mut task: Task, now: DateTime<Utc>) -> Result<()> {
		let id = task.id;
		task.archived_at = Some(now);

		let mut live = sets.live.clone();
		live.remove(&id);
		let mut archived = sets.archived.clone();
		archived.insert(id, task);

		// Archive first: open() drops live ids that are also archived.
		self.save_archived(&archived).await?;
		self.save_live(&live).await?;

		sets.live = live;
		sets.archived = archived;

		info!(task_id = %id, "task archived");
		Ok(())
	}

	async fn save_live(&self, live: &TaskMap) -> Result<()> {
		save_document(self.store.as_ref(), TASKS_DOCUMENT, live).await?;
		Ok(())
	}

	async fn save_archived(&self, archived: &TaskMap) -> Result<()> {
		save_document(self.store.as_ref(), ARCHIVED_TASKS_DOCUMENT, archived).await?;
		Ok(())
	}
}

async fn path_exists(path: &Path) -> bool {
	tokio::fs::try_exists(path).await.unwrap_or(false)
}
