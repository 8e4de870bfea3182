// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::HttpError;
use crate::retry::{retry, RetryConfig};

/// Pulls JSON and text documents from upstream APIs with retry.
#[derive(Debug, Clone)]
pub struct Fetcher {
	client: Client,
	retry: RetryConfig,
}

impl Fetcher {
	pub fn new(client: Client, retry: RetryConfig) -> Self {
		Self { client, retry }
	}

	/// GET `url` and decode the body as JSON.
	pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
		let body = self.get_bytes(url, &[]).await?;
		serde_json::from_slice(&body).map_err(|source| HttpError::Decode {
			url: url.to_string(),
			source,
		})
	}

	/// GET `url` with extra request headers and return the body as text.
	pub async fn get_text(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, HttpError> {
		let body = self.get_bytes(url, headers).await?;
		Ok(String::from_utf8_lossy(&body).into_owned())
	}

	async fn get_bytes(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, HttpError> {
		retry(&self.retry, || async {
			debug!(url, "fetching upstream document");

			let mut req = self.client.get(url);
			for (name, value) in headers {
				req = req.header(*name, *value);
			}

			let resp = req.send().await.map_err(|source| HttpError::Request {
				url: url.to_string(),
				source,
			})?;

			let status = resp.status();
			if !status.is_success() {
				return Err(HttpError::Status {
					url: url.to_string(),
					status,
				});
			}

			let bytes = resp.bytes().await.map_err(|source| HttpError::Request {
				url: url.to_string(),
				source,
			})?;
			Ok(bytes.to_vec())
		})
		.await
	}
}
