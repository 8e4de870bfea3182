// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
	Stopped,
	Starting,
	Running,
	Stopping,
}

impl InstanceStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			InstanceStatus::Stopped => "stopped",
			InstanceStatus::Starting => "starting",
			InstanceStatus::Running => "running",
			InstanceStatus::Stopping => "stopping",
		}
	}
}

impl fmt::Display for InstanceStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
	/// Written to stdin by `stop`.
	pub stop_command: String,
	pub log_capacity: usize,
	/// How long `restart` waits for a graceful exit before killing.
	pub stop_timeout: Duration,
	/// Upper bound on writing one line to the instance's stdin.
	pub command_timeout: Duration,
}

impl Default for InstanceConfig {
	fn default() -> Self {
		Self {
			stop_command: "stop".to_string(),
			log_capacity: 1000,
			stop_timeout: Duration::from_secs(30),
			command_timeout: Duration::from_secs(5),
		}
	}
}

/// Point-in-time view of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
	pub name: String,
	pub directory: PathBuf,
	pub status: InstanceStatus,
	pub pid: Option<u32>,
	pub restart_attempts: u32,
	pub last_exit_code: Option<i32>,
}
