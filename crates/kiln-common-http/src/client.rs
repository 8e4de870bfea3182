// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates a new HTTP client with the standard Kiln User-Agent header.
pub fn new_client() -> Result<Client, reqwest::Error> {
	builder().build()
}

/// Creates a new HTTP client builder with the standard Kiln User-Agent header
/// and a bounded connect timeout.
///
/// Use this when you need to customize the client further.
pub fn builder() -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent())
		.connect_timeout(CONNECT_TIMEOUT)
}

/// Creates a new HTTP client with a whole-request timeout.
///
/// Do not use this client for large streaming downloads: the timeout covers
/// the full body, not just the response headers.
pub fn new_client_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
	builder().timeout(timeout).build()
}

/// Returns the standard Kiln User-Agent string.
///
/// Format: `kiln/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"kiln/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}
