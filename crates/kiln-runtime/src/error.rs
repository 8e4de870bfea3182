// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use kiln_common_http::HttpError;
use kiln_common_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("unsupported platform: os={os} arch={arch}")]
	UnsupportedPlatform { os: String, arch: String },

	#[error("failed to fetch runtime releases: {0}")]
	Fetch(#[from] HttpError),

	#[error("catalog store error: {0}")]
	Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
