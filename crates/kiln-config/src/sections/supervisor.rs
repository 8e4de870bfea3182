// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
	/// Output lines kept per instance.
	pub log_lines: usize,
	pub stop_command: String,
	pub stop_timeout: Duration,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		SupervisorConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SupervisorConfigLayer {
	#[serde(default)]
	pub log_lines: Option<usize>,
	#[serde(default)]
	pub stop_command: Option<String>,
	#[serde(default)]
	pub stop_timeout_secs: Option<u64>,
}

impl SupervisorConfigLayer {
	pub fn merge(&mut self, other: SupervisorConfigLayer) {
		if other.log_lines.is_some() {
			self.log_lines = other.log_lines;
		}
		if other.stop_command.is_some() {
			self.stop_command = other.stop_command;
		}
		if other.stop_timeout_secs.is_some() {
			self.stop_timeout_secs = other.stop_timeout_secs;
		}
	}

	pub fn finalize(self) -> SupervisorConfig {
		SupervisorConfig {
			log_lines: self.log_lines.unwrap_or(1000),
			stop_command: self.stop_command.unwrap_or_else(|| "stop".to_string()),
			stop_timeout: Duration::from_secs(self.stop_timeout_secs.unwrap_or(30)),
		}
	}
}
