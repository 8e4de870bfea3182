// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use reqwest::StatusCode;
use thiserror::Error;

use crate::retry::{is_retryable_status, RetryableError};

/// Errors produced while fetching a document from an upstream API.
#[derive(Debug, Error)]
pub enum HttpError {
	#[error("request to {url} failed: {source}")]
	Request {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("unexpected status {status} from {url}")]
	Status { url: String, status: StatusCode },

	#[error("malformed payload from {url}: {source}")]
	Decode {
		url: String,
		#[source]
		source: serde_json::Error,
	},
}

impl RetryableError for HttpError {
	fn is_retryable(&self) -> bool {
		match self {
			Self::Request { source, .. } => source.is_retryable(),
			Self::Status { status, .. } => is_retryable_status(*status),
			Self::Decode { .. } => false,
		}
	}
}
