// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Filesystem locations.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
	/// Root for everything kiln writes: ~/.local/share/kiln by default.
	pub data_dir: PathBuf,
	/// Instance directories, one per server.
	pub servers_dir: PathBuf,
	/// Managed runtimes and other binaries.
	pub binaries_dir: PathBuf,
}

impl PathsConfig {
	/// Directory holding the persisted JSON documents.
	pub fn store_dir(&self) -> PathBuf {
		self.data_dir.join("state")
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PathsConfigLayer {
	#[serde(default)]
	pub data_dir: Option<String>,
	#[serde(default)]
	pub servers_dir: Option<String>,
	#[serde(default)]
	pub binaries_dir: Option<String>,
}

impl PathsConfigLayer {
	pub fn merge(&mut self, other: PathsConfigLayer) {
		if other.data_dir.is_some() {
			self.data_dir = other.data_dir;
		}
		if other.servers_dir.is_some() {
			self.servers_dir = other.servers_dir;
		}
		if other.binaries_dir.is_some() {
			self.binaries_dir = other.binaries_dir;
		}
	}

	pub fn finalize(self) -> Result<PathsConfig, ConfigError> {
		let data_dir = match self.data_dir {
			Some(dir) => PathBuf::from(dir),
			None => dirs::data_dir()
				.map(|d| d.join("kiln"))
				.ok_or(ConfigError::DataDirNotFound)?,
		};
		let servers_dir = self
			.servers_dir
			.map(PathBuf::from)
			.unwrap_or_else(|| data_dir.join("servers"));
		let binaries_dir = self
			.binaries_dir
			.map(PathBuf::from)
			.unwrap_or_else(|| data_dir.join("binaries"));

		Ok(PathsConfig {
			data_dir,
			servers_dir,
			binaries_dir,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn subdirectories_follow_data_dir() {
		let layer = PathsConfigLayer {
			data_dir: Some("/srv/kiln".to_string()),
			..Default::default()
		};
		let paths = layer.finalize().unwrap();
		assert_eq!(paths.servers_dir, PathBuf::from("/srv/kiln/servers"));
		assert_eq!(paths.binaries_dir, PathBuf::from("/srv/kiln/binaries"));
		assert_eq!(paths.store_dir(), PathBuf::from("/srv/kiln/state"));
	}

	#[test]
	fn explicit_subdirectories_win() {
		let layer = PathsConfigLayer {
			data_dir: Some("/srv/kiln".to_string()),
			servers_dir: Some("/mnt/servers".to_string()),
			binaries_dir: None,
		};
		let paths = layer.finalize().unwrap();
		assert_eq!(paths.servers_dir, PathBuf::from("/mnt/servers"));
		assert_eq!(paths.binaries_dir, PathBuf::from("/srv/kiln/binaries"));
	}
}
