// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use kiln_common_store::StoreError;
use thiserror::Error;

use crate::model::TaskId;

#[derive(Debug, Error)]
pub enum TaskError {
	#[error("transfer failed (task {task_id}): {reason}")]
	TransferFailed { task_id: TaskId, reason: String },

	#[error("unpack failed (task {task_id}): {reason}")]
	UnpackFailed { task_id: TaskId, reason: String },

	#[error("task store error: {0}")]
	Store(#[from] StoreError),
}

impl TaskError {
	/// The task that recorded this failure, if any.
	pub fn task_id(&self) -> Option<TaskId> {
		match self {
			TaskError::TransferFailed { task_id, .. } | TaskError::UnpackFailed { task_id, .. } => {
				Some(*task_id)
			}
			TaskError::Store(_) => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, TaskError>;
