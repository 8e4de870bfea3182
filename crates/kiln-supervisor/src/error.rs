// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
	#[error("instance already exists: {0}")]
	AlreadyExists(String),

	#[error("unknown instance: {0}")]
	UnknownInstance(String),

	#[error("launch script for {name} not found at {}", .path.display())]
	ScriptMissing { name: String, path: PathBuf },

	#[error("instance {0} is not running")]
	NotRunning(String),

	#[error("instance {0} did not accept input in time")]
	CommandTimeout(String),

	#[error("failed to start {name}: {source}")]
	SpawnFailed {
		name: String,
		#[source]
		source: std::io::Error,
	},

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
