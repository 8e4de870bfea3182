// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use kiln_common_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
	#[error("unknown software source: {0}")]
	UnknownSource(String),

	/// Any upstream failure: transport, status, malformed payload or a
	/// missing version.
	#[error("{source_name}: {detail}")]
	NotFound { source_name: String, detail: String },

	#[error("catalog store error: {0}")]
	Store(#[from] StoreError),
}

impl SourceError {
	pub(crate) fn not_found(source_name: &str, detail: impl std::fmt::Display) -> Self {
		SourceError::NotFound {
			source_name: source_name.to_string(),
			detail: detail.to_string(),
		}
	}
}

pub type Result<T> = std::result::Result<T, SourceError>;
