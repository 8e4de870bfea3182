// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_common_http::Fetcher;
use kiln_common_store::CatalogCache;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::descriptor::{binary_url, RuntimeDescriptor};
use crate::error::Result;
use crate::platform::{is_constrained_host, Platform, CONSTRAINED_JAVA_PATH};

pub const DEFAULT_ADOPTIUM_URL: &str = "https://api.adoptium.net";
const CATALOG_NAME: &str = "java";
const INSTALLABLE: std::ops::RangeInclusive<u32> = 8..=21;

/// A system-provided runtime that must be installed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstrainedRuntime {
	pub version: String,
	pub executable: PathBuf,
	pub install_hint: String,
}

/// How to obtain a runtime on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeTarget {
	Managed(RuntimeDescriptor),
	Constrained(ConstrainedRuntime),
}

#[derive(Debug, Deserialize)]
struct AvailableReleases {
	available_releases: Vec<u32>,
}

/// Resolves runtime versions to downloadable archives and local installs.
pub struct RuntimeResolver {
	fetcher: Fetcher,
	java_dir: PathBuf,
	adoptium_base: String,
	catalog: Arc<CatalogCache>,
	constrained: bool,
}

impl RuntimeResolver {
	pub fn new(
		fetcher: Fetcher,
		binaries_dir: &Path,
		adoptium_base: impl Into<String>,
		catalog: Arc<CatalogCache>,
	) -> Self {
		Self {
			fetcher,
			java_dir: binaries_dir.join("java"),
			adoptium_base: adoptium_base.into(),
			catalog,
			constrained: is_constrained_host(),
		}
	}

	/// Override host detection of the constrained environment.
	pub fn with_constrained(mut self, constrained: bool) -> Self {
		self.constrained = constrained;
		self
	}

	pub fn java_dir(&self) -> &Path {
		&self.java_dir
	}

	pub fn resolve_descriptor(&self, version: &str, os: &str, arch: &str) -> Result<RuntimeDescriptor> {
		let platform = Platform::resolve(os, arch)?;
		Ok(RuntimeDescriptor::new(
			version,
			platform,
			&self.adoptium_base,
			&self.java_dir,
		))
	}

	pub fn resolve_for_host(&self, version: &str) -> Result<RuntimeTarget> {
		if self.constrained {
			return Ok(RuntimeTarget::Constrained(ConstrainedRuntime {
				version: version.to_string(),
				executable: PathBuf::from(CONSTRAINED_JAVA_PATH),
				install_hint: format!("pkg install openjdk-{version}"),
			}));
		}

		self.resolve_descriptor(version, std::env::consts::OS, std::env::consts::ARCH)
			.map(RuntimeTarget::Managed)
	}

	/// Path to a usable executable for `version`, if one is installed.
	pub async fn is_locally_available(&self, version: &str) -> Option<PathBuf> {
		match self.resolve_for_host(version).ok()? {
			RuntimeTarget::Managed(descriptor) => descriptor.verified_executable().await,
			RuntimeTarget::Constrained(runtime) => tokio::fs::try_exists(&runtime.executable)
				.await
				.unwrap_or(false)
				.then_some(runtime.executable),
		}
	}

	/// Versions unpacked under the runtime directory.
	pub async fn list_local(&self) -> Vec<String> {
		let Ok(mut entries) = tokio::fs::read_dir(&self.java_dir).await else {
			return Vec::new();
		};

		let mut versions = Vec::new();
		while let Ok(Some(entry)) = entries.next_entry().await {
			let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
			if is_dir {
				versions.push(entry.file_name().to_string_lossy().into_owned());
			}
		}
		versions.sort_by_key(|v| std::cmp::Reverse(v.parse::<u32>().unwrap_or(0)));
		versions
	}

	/// Runtime versions available for download, newest first.
	#[instrument(skip(self))]
	pub async fn list_installable(&self) -> Result<Vec<u32>> {
		if let Some(cached) = self.catalog.fresh(CATALOG_NAME).await? {
			debug!("using cached runtime release list");
			return Ok(newest_first(
				cached.versions.keys().filter_map(|v| v.parse().ok()),
			));
		}

		let url = format!(
			"{}/v3/info/available_releases",
			self.adoptium_base.trim_end_matches('/')
		);
		let releases: AvailableReleases = self.fetcher.get_json(&url).await?;
		let versions = newest_first(releases.available_releases.into_iter());

		let host = Platform::host().ok();
		let entries: BTreeMap<String, String> = versions
			.iter()
			.map(|v| {
				let v = v.to_string();
				let url = host
					.map(|p| binary_url(&self.adoptium_base, &v, p))
					.unwrap_or_default();
				(v, url)
			})
			.collect();
		self.catalog.replace(CATALOG_NAME, entries).await?;

		info!(count = versions.len(), "refreshed runtime release list");
		Ok(versions)
	}
}

fn newest_first(versions: impl Iterator<Item = u32>) -> Vec<u32> {
	let mut versions: Vec<u32> = versions.filter(|v| INSTALLABLE.contains(v)).collect();
	versions.sort_unstable_by(|a, b| b.cmp(a));
	versions.dedup();
	versions
}
