// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for TaskId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TaskId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
	Downloading,
	Installing,
	Unpacking,
	Updating,
	Common,
}

impl TaskType {
	pub fn as_str(&self) -> &'static str {
		match self {
			TaskType::Downloading => "downloading",
			TaskType::Installing => "installing",
			TaskType::Unpacking => "unpacking",
			TaskType::Updating => "updating",
			TaskType::Common => "common",
		}
	}
}

impl fmt::Display for TaskType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
	InProgress,
	Completed,
	Failed,
}

impl TaskStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			TaskStatus::InProgress => "in_progress",
			TaskStatus::Completed => "completed",
			TaskStatus::Failed => "failed",
		}
	}
}

impl fmt::Display for TaskStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TaskStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().replace('-', "_").as_str() {
			"in_progress" | "running" => Ok(TaskStatus::InProgress),
			"completed" | "done" => Ok(TaskStatus::Completed),
			"failed" => Ok(TaskStatus::Failed),
			_ => Err(format!("unknown task status: {s}")),
		}
	}
}

/// Byte accounting for transfer tasks. `total` is 0 when the upstream did not
/// announce a length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSize {
	pub total: u64,
	pub current: u64,
}

impl TaskSize {
	pub fn with_total(total: u64) -> Self {
		Self { total, current: 0 }
	}

	/// Completion percentage for the bytes seen so far.
	///
	/// Without a known total this falls back to one point per MiB, never
	/// reaching 100 on its own.
	pub fn percent(&self) -> u8 {
		if self.total > 0 {
			let pct = (self.current as f64 / self.total as f64 * 100.0).round();
			pct.min(100.0) as u8
		} else {
			let mib = (self.current as f64 / (1024.0 * 1024.0)).round();
			mib.min(99.0) as u8
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub id: TaskId,
	#[serde(rename = "type")]
	pub task_type: TaskType,
	pub status: TaskStatus,
	pub progress: u8,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<TaskSize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	pub path: PathBuf,
	pub filename: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub archived_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// What a caller knows about a task before it starts.
#[derive(Clone, Debug)]
pub struct NewTask {
	pub task_type: TaskType,
	pub path: PathBuf,
	pub url: Option<String>,
	pub size: Option<TaskSize>,
}

impl NewTask {
	pub fn new(task_type: TaskType, path: impl Into<PathBuf>) -> Self {
		Self {
			task_type,
			path: path.into(),
			url: None,
			size: None,
		}
	}

	pub fn download(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
		Self {
			url: Some(url.into()),
			size: Some(TaskSize::default()),
			..Self::new(TaskType::Downloading, path)
		}
	}

	pub fn with_size(mut self, size: TaskSize) -> Self {
		self.size = Some(size);
		self
	}

	pub(crate) fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Task {
		let filename = file_name_of(&self.path);
		Task {
			id,
			task_type: self.task_type,
			status: TaskStatus::InProgress,
			progress: 0,
			size: self.size,
			url: self.url,
			path: self.path,
			filename,
			created_at: now,
			updated_at: now,
			archived_at: None,
			error: None,
		}
	}
}

fn file_name_of(path: &Path) -> String {
	path.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_default()
}

/// Partial field set merged into a live task by `TaskRegistry::update`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskUpdate {
	pub status: Option<TaskStatus>,
	pub progress: Option<u8>,
	pub size: Option<TaskSize>,
	pub error: Option<String>,
}

impl TaskUpdate {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn status(mut self, status: TaskStatus) -> Self {
		self.status = Some(status);
		self
	}

	pub fn progress(mut self, progress: u8) -> Self {
		self.progress = Some(progress);
		self
	}

	pub fn size(mut self, size: TaskSize) -> Self {
		self.size = Some(size);
		self
	}

	pub fn error(mut self, error: impl Into<String>) -> Self {
		self.error = Some(error.into());
		self
	}

	pub fn completed() -> Self {
		Self::new().status(TaskStatus::Completed).progress(100)
	}

	pub fn failed(error: impl Into<String>) -> Self {
		Self::new().status(TaskStatus::Failed).error(error)
	}

	/// Merge into `task`. Progress never moves backwards and 100 forces
	/// completion.
	pub(crate) fn apply(self, task: &mut Task, now: DateTime<Utc>) {
		if let Some(size) = self.size {
			task.size = Some(size);
		}
		if let Some(progress) = self.progress {
			task.progress = task.progress.max(progress.min(100));
		}
		if let Some(status) = self.status {
			task.status = status;
		}
		if let Some(error) = self.error {
			task.error = Some(error);
		}
		if task.progress == 100 {
			task.status = TaskStatus::Completed;
		}
		task.updated_at = now;
	}
}
