// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::platform::{Platform, ScriptDialect};

/// Everything needed to fetch, unpack and locate one runtime version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDescriptor {
	pub version: String,
	pub platform_name: String,
	pub arch: String,
	pub url: String,
	pub filename: String,
	pub download_path: PathBuf,
	pub unpack_path: PathBuf,
	pub dialect: ScriptDialect,
	pub executable_name: String,
}

impl RuntimeDescriptor {
	pub(crate) fn new(version: &str, platform: Platform, adoptium_base: &str, java_dir: &Path) -> Self {
		let filename = format!("Java-{version}-{}{}", platform.arch, platform.archive_ext);
		Self {
			version: version.to_string(),
			platform_name: platform.name.to_string(),
			arch: platform.arch.to_string(),
			url: binary_url(adoptium_base, version, platform),
			download_path: java_dir.join(&filename),
			unpack_path: java_dir.join(version),
			filename,
			dialect: platform.dialect,
			executable_name: platform.executable_name().to_string(),
		}
	}

	/// The runtime executable, if the unpacked tree contains one.
	///
	/// Archives usually wrap everything in a `jdk-<version>` directory, and
	/// macOS builds nest a further `Contents/Home`. A directory with a single
	/// entry is searched the same way.
	pub async fn verified_executable(&self) -> Option<PathBuf> {
		let direct = self.executable_in(&self.unpack_path);
		if is_file(&direct).await {
			return Some(direct);
		}

		let mut entries = tokio::fs::read_dir(&self.unpack_path).await.ok()?;
		let mut dirs = Vec::new();
		while let Ok(Some(entry)) = entries.next_entry().await {
			dirs.push(entry.path());
		}
		dirs.sort();

		let nested = dirs
			.iter()
			.find(|p| {
				p.file_name()
					.map(|n| n.to_string_lossy().starts_with("jdk"))
					.unwrap_or(false)
			})
			.or_else(|| if dirs.len() == 1 { dirs.first() } else { None })?;

		for root in [nested.clone(), nested.join("Contents").join("Home")] {
			let candidate = self.executable_in(&root);
			if is_file(&candidate).await {
				return Some(candidate);
			}
		}

		debug!(unpack_path = %self.unpack_path.display(), "no runtime executable found");
		None
	}

	fn executable_in(&self, root: &Path) -> PathBuf {
		root.join("bin").join(&self.executable_name)
	}
}

pub(crate) fn binary_url(adoptium_base: &str, version: &str, platform: Platform) -> String {
	format!(
		"{}/v3/binary/latest/{version}/ga/{}/{}/jdk/hotspot/normal/eclipse?project=jdk",
		adoptium_base.trim_end_matches('/'),
		platform.name,
		platform.arch
	)
}

async fn is_file(path: &Path) -> bool {
	tokio::fs::metadata(path)
		.await
		.map(|m| m.is_file())
		.unwrap_or(false)
}
