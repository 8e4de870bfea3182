// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Extra software sources served as a `{version: url}` JSON map.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternalSourceConfig {
	pub name: String,
	#[serde(default)]
	pub display_name: Option<String>,
	pub versions_url: String,
}

impl ExternalSourceConfig {
	pub fn display_name(&self) -> &str {
		self.display_name.as_deref().unwrap_or(&self.name)
	}
}
