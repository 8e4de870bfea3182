// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use kiln_runtime::RuntimeError;
use kiln_sources::SourceError;
use kiln_tasks::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisioningError {
	#[error("invalid provisioning request: {0}")]
	InvalidSpec(String),

	#[error("instance {0} is already being provisioned")]
	AlreadyInProgress(String),

	#[error(transparent)]
	Runtime(#[from] RuntimeError),

	#[error("java {version} is not installed; install it with `{hint}`")]
	RuntimeUnavailable { version: String, hint: String },

	#[error("java {version} was unpacked but no executable was found under {}", .path.display())]
	RuntimeExecutableMissing { version: String, path: PathBuf },

	#[error(transparent)]
	Source(#[from] SourceError),

	#[error(transparent)]
	Task(#[from] TaskError),

	#[error("failed to write instance files: {0}")]
	Io(#[from] std::io::Error),

	#[error("provisioning was aborted before completion")]
	Aborted,
}

pub type Result<T> = std::result::Result<T, ProvisioningError>;
