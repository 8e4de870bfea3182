// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use kiln_runtime::required_runtime;
use serde::{Deserialize, Serialize};

use crate::error::{ProvisioningError, Result};

pub const DEFAULT_LAUNCH_FLAGS: &str = "-Xms1G -Xmx2G";
pub const DEFAULT_PORT: u16 = 25565;

/// What to build: one named instance of a software source at a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionSpec {
	pub instance_name: String,
	pub software_source: String,
	pub software_version: String,
	/// Defaults to the runtime the software version requires.
	pub runtime_version: Option<u32>,
	pub launch_flags: String,
	pub port: u16,
}

impl ProvisionSpec {
	pub fn new(
		instance_name: impl Into<String>,
		software_source: impl Into<String>,
		software_version: impl Into<String>,
	) -> Self {
		Self {
			instance_name: instance_name.into(),
			software_source: software_source.into(),
			software_version: software_version.into(),
			runtime_version: None,
			launch_flags: DEFAULT_LAUNCH_FLAGS.to_string(),
			port: DEFAULT_PORT,
		}
	}

	pub fn with_runtime_version(mut self, version: u32) -> Self {
		self.runtime_version = Some(version);
		self
	}

	pub fn with_launch_flags(mut self, flags: impl Into<String>) -> Self {
		self.launch_flags = flags.into();
		self
	}

	pub fn with_port(mut self, port: u16) -> Self {
		self.port = port;
		self
	}

	pub fn effective_runtime_version(&self) -> u32 {
		self.runtime_version
			.unwrap_or_else(|| required_runtime(&self.software_version))
	}

	/// File name of the downloaded server artifact.
	pub fn artifact_name(&self) -> String {
		format!("{}-{}.jar", self.software_source, self.software_version)
	}

	pub fn validate(&self) -> Result<()> {
		let name = self.instance_name.trim();
		if name.is_empty() {
			return Err(invalid("instance name must not be empty"));
		}
		if name.contains('/') || name.contains('\\') || name.contains("..") {
			return Err(invalid(format!(
				"instance name {name:?} must not contain path separators or '..'"
			)));
		}
		if self.software_source.trim().is_empty() {
			return Err(invalid("software source must not be empty"));
		}
		let version = self.software_version.trim();
		if version.is_empty() || version.contains('/') || version.contains('\\') {
			return Err(invalid(format!("software version {version:?} is not valid")));
		}
		if self.port == 0 {
			return Err(invalid("port must be between 1 and 65535"));
		}
		Ok(())
	}
}

fn invalid(reason: impl Into<String>) -> ProvisioningError {
	ProvisioningError::InvalidSpec(reason.into())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_follow_the_software_version() {
		let spec = ProvisionSpec::new("lobby", "paper", "1.16.5");
		assert_eq!(spec.launch_flags, "-Xms1G -Xmx2G");
		assert_eq!(spec.port, 25565);
		assert_eq!(spec.effective_runtime_version(), 16);
		assert_eq!(spec.with_runtime_version(21).effective_runtime_version(), 21);
	}

	#[test]
	fn artifact_is_named_after_source_and_version() {
		assert_eq!(
			ProvisionSpec::new("a", "purpur", "1.20.1").artifact_name(),
			"purpur-1.20.1.jar"
		);
	}

	#[test]
	fn rejects_unsafe_or_empty_fields() {
		let bad = [
			ProvisionSpec::new("", "paper", "1.20.1"),
			ProvisionSpec::new("../etc", "paper", "1.20.1"),
			ProvisionSpec::new("a/b", "paper", "1.20.1"),
			ProvisionSpec::new("a\\b", "paper", "1.20.1"),
			ProvisionSpec::new("ok", "", "1.20.1"),
			ProvisionSpec::new("ok", "paper", ""),
			ProvisionSpec::new("ok", "paper", "1.20.1").with_port(0),
		];
		for spec in bad {
			assert!(
				matches!(spec.validate(), Err(ProvisioningError::InvalidSpec(_))),
				"{spec:?}"
			);
		}
		assert!(ProvisionSpec::new("survival-1", "paper", "1.20.1")
			.validate()
			.is_ok());
	}
}
