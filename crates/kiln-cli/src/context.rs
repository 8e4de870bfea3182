// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Composition root: every long-lived service is built here once and shared
//! through `Arc`.

use std::sync::Arc;

use anyhow::Context;
use kiln_common_http::{Fetcher, RetryConfig};
use kiln_common_store::{CatalogCache, DocumentStore, JsonFileStore};
use kiln_config::KilnConfig;
use kiln_provisioning::Provisioner;
use kiln_runtime::{RuntimeResolver, DEFAULT_ADOPTIUM_URL};
use kiln_sources::{SourceEndpoints, SourceRegistry, SourceResolver};
use kiln_supervisor::{InstanceConfig, Supervisor};
use kiln_tasks::{Downloader, TaskRegistry};
use tracing::debug;

pub struct AppContext {
	pub config: KilnConfig,
	pub tasks: Arc<TaskRegistry>,
	pub runtimes: Arc<RuntimeResolver>,
	pub sources: Arc<SourceResolver>,
	pub provisioner: Provisioner,
	pub supervisor: Arc<Supervisor>,
}

impl AppContext {
	pub async fn build(config: KilnConfig) -> anyhow::Result<Self> {
		let paths = &config.paths;
		for dir in [&paths.data_dir, &paths.servers_dir, &paths.binaries_dir] {
			tokio::fs::create_dir_all(dir)
				.await
				.with_context(|| format!("failed to create {}", dir.display()))?;
		}

		let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(paths.store_dir()));
		let catalog = Arc::new(CatalogCache::new(Arc::clone(&store), config.catalog.ttl));
		let tasks = Arc::new(
			TaskRegistry::open(Arc::clone(&store))
				.await
				.context("failed to load task registry")?,
		);

		let metadata_client = kiln_common_http::new_client_with_timeout(config.http.request_timeout)
			.context("failed to build HTTP client")?;
		let retry = RetryConfig::default().with_max_attempts(config.http.retry_attempts);
		let fetcher = Fetcher::new(metadata_client, retry);

		let adoptium = config
			.endpoints
			.adoptium
			.clone()
			.unwrap_or_else(|| DEFAULT_ADOPTIUM_URL.to_string());
		let runtimes = Arc::new(RuntimeResolver::new(
			fetcher.clone(),
			&paths.binaries_dir,
			adoptium,
			Arc::clone(&catalog),
		));

		let registry = config
			.sources
			.iter()
			.fold(SourceRegistry::builtin(), |registry, source| {
				registry.with_external(&source.name, source.display_name(), &source.versions_url)
			});
		let sources = Arc::new(SourceResolver::new(
			fetcher,
			Arc::new(registry),
			source_endpoints(&config),
			catalog,
		));

		let download_client = kiln_common_http::new_client().context("failed to build HTTP client")?;
		let downloader = Downloader::new(download_client, Arc::clone(&tasks))
			.with_timeouts(config.http.header_timeout, config.http.download_idle_timeout);

		let provisioner = Provisioner::new(
			Arc::clone(&runtimes),
			Arc::clone(&sources),
			downloader,
			&paths.servers_dir,
		);

		debug!(data_dir = %paths.data_dir.display(), "application context ready");

		Ok(Self {
			config,
			tasks,
			runtimes,
			sources,
			provisioner,
			supervisor: Arc::new(Supervisor::new()),
		})
	}

	pub fn instance_config(&self) -> InstanceConfig {
		let supervisor = &self.config.supervisor;
		InstanceConfig {
			stop_command: supervisor.stop_command.clone(),
			log_capacity: supervisor.log_lines,
			stop_timeout: supervisor.stop_timeout,
			..InstanceConfig::default()
		}
	}
}

fn source_endpoints(config: &KilnConfig) -> SourceEndpoints {
	let overrides = &config.endpoints;
	let mut endpoints = SourceEndpoints::default();
	if let Some(url) = &overrides.mojang_manifest {
		endpoints.mojang_manifest = url.clone();
	}
	if let Some(url) = &overrides.papermc {
		endpoints.papermc = url.clone();
	}
	if let Some(url) = &overrides.purpur {
		endpoints.purpur = url.clone();
	}
	if let Some(url) = &overrides.magma {
		endpoints.magma = url.clone();
	}
	if let Some(url) = &overrides.spigot_listing {
		endpoints.spigot_listing = url.clone();
	}
	endpoints
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_config::{KilnConfigLayer, PathsConfigLayer};
	use tempfile::TempDir;

	fn config_in(tmp: &TempDir, extra: &str) -> KilnConfig {
		let mut layer: KilnConfigLayer = toml_layer(extra);
		layer.merge(KilnConfigLayer {
			paths: Some(PathsConfigLayer {
				data_dir: Some(tmp.path().display().to_string()),
				..Default::default()
			}),
			..Default::default()
		});
		kiln_config::finalize(layer).unwrap()
	}

	fn toml_layer(extra: &str) -> KilnConfigLayer {
		let tmp = tempfile::NamedTempFile::new().unwrap();
		std::fs::write(tmp.path(), extra).unwrap();
		kiln_config::ConfigSource::load(&kiln_config::TomlSource::new(tmp.path())).unwrap()
	}

	#[tokio::test]
	async fn builds_services_and_directories() {
		let tmp = TempDir::new().unwrap();
		let ctx = AppContext::build(config_in(
			&tmp,
			r#"
[[sources]]
name = "fabric"
display_name = "Fabric"
versions_url = "https://mirror.example/fabric.json"

[supervisor]
stop_command = "end"
log_lines = 20
"#,
		))
		.await
		.unwrap();

		assert!(tmp.path().join("servers").is_dir());
		assert!(tmp.path().join("binaries").is_dir());
		assert!(ctx.sources.registry().get("fabric").is_ok());
		assert!(ctx.sources.registry().get("paper").is_ok());
		assert_eq!(ctx.provisioner.instance_dir("lobby"), tmp.path().join("servers").join("lobby"));

		let instance = ctx.instance_config();
		assert_eq!(instance.stop_command, "end");
		assert_eq!(instance.log_capacity, 20);
	}

	#[test]
	fn endpoint_overrides_replace_only_what_is_set() {
		let tmp = TempDir::new().unwrap();
		let config = config_in(&tmp, "[endpoints]\npurpur = \"https://purpur.mirror\"\n");
		let endpoints = source_endpoints(&config);
		assert_eq!(endpoints.purpur, "https://purpur.mirror");
		assert_eq!(endpoints.papermc, SourceEndpoints::default().papermc);
	}
}
