// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Outbound HTTP behaviour.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
	/// Timeout for metadata requests.
	pub request_timeout: Duration,
	/// Time allowed for response headers on a download.
	pub header_timeout: Duration,
	/// Longest allowed gap between body chunks on a download.
	pub download_idle_timeout: Duration,
	pub retry_attempts: u32,
}

impl Default for HttpConfig {
	fn default() -> Self {
		HttpConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub header_timeout_secs: Option<u64>,
	#[serde(default)]
	pub download_idle_timeout_secs: Option<u64>,
	#[serde(default)]
	pub retry_attempts: Option<u32>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.header_timeout_secs.is_some() {
			self.header_timeout_secs = other.header_timeout_secs;
		}
		if other.download_idle_timeout_secs.is_some() {
			self.download_idle_timeout_secs = other.download_idle_timeout_secs;
		}
		if other.retry_attempts.is_some() {
			self.retry_attempts = other.retry_attempts;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		HttpConfig {
			request_timeout: Duration::from_secs(self.request_timeout_secs.unwrap_or(30)),
			header_timeout: Duration::from_secs(self.header_timeout_secs.unwrap_or(10)),
			download_idle_timeout: Duration::from_secs(self.download_idle_timeout_secs.unwrap_or(30)),
			retry_attempts: self.retry_attempts.unwrap_or(3),
		}
	}
}
