// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use kiln_common_http::{Fetcher, HttpError};
use kiln_common_store::{CachedCatalog, CatalogCache};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SourceError};
use crate::registry::{SourceKind, SourceRegistry};
use crate::spigot::{parse_listing, SpigotRelease};
use crate::version::sort_newest_first;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";
const DEFAULT_MANIFEST_CONCURRENCY: usize = 16;

/// Upstream base URLs. Paths below each base are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoints {
	pub mojang_manifest: String,
	pub papermc: String,
	pub purpur: String,
	pub magma: String,
	pub spigot_listing: String,
}

impl Default for SourceEndpoints {
	fn default() -> Self {
		Self {
			mojang_manifest: "https://piston-meta.mojang.com/mc/game/version_manifest.json".to_string(),
			papermc: "https://api.papermc.io".to_string(),
			purpur: "https://api.purpurmc.org/v2/purpur".to_string(),
			magma: "https://api.magmafoundation.org/api/v2".to_string(),
			spigot_listing: "https://getbukkit.org/download/spigot".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct VersionManifest {
	versions: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
	id: String,
	url: String,
}

#[derive(Debug, Deserialize)]
struct VersionDocument {
	downloads: Option<VersionDownloads>,
}

#[derive(Debug, Deserialize)]
struct VersionDownloads {
	server: Option<DownloadRef>,
}

#[derive(Debug, Deserialize)]
struct DownloadRef {
	url: String,
}

#[derive(Debug, Deserialize)]
struct VersionList {
	versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PaperVersion {
	builds: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct PaperBuild {
	downloads: PaperDownloads,
}

#[derive(Debug, Deserialize)]
struct PaperDownloads {
	application: PaperApplication,
}

#[derive(Debug, Deserialize)]
struct PaperApplication {
	name: String,
}

/// Lists versions and resolves artifact URLs across all registered sources.
pub struct SourceResolver {
	fetcher: Fetcher,
	registry: Arc<SourceRegistry>,
	endpoints: SourceEndpoints,
	catalog: Arc<CatalogCache>,
	manifest_concurrency: usize,
}

impl SourceResolver {
	pub fn new(
		fetcher: Fetcher,
		registry: Arc<SourceRegistry>,
		endpoints: SourceEndpoints,
		catalog: Arc<CatalogCache>,
	) -> Self {
		Self {
			fetcher,
			registry,
			endpoints,
			catalog,
			manifest_concurrency: DEFAULT_MANIFEST_CONCURRENCY,
		}
	}

	pub fn with_manifest_concurrency(mut self, concurrency: usize) -> Self {
		self.manifest_concurrency = concurrency.max(1);
		self
	}

	pub fn registry(&self) -> &SourceRegistry {
		&self.registry
	}

	/// Versions offered by `source`, newest first.
	#[instrument(skip(self))]
	pub async fn list_versions(&self, source: &str) -> Result<Vec<String>> {
		let descriptor = self.registry.get(source)?;

		let versions = match &descriptor.kind {
			SourceKind::Vanilla => {
				let catalog = self.vanilla_catalog(source).await?;
				// The manifest is already newest first; ids like `24w14a` do
				// not sort against `1.21` by number.
				catalog.ids_in_order().unwrap_or_else(|| {
					let mut versions: Vec<String> = catalog.versions.into_keys().collect();
					sort_newest_first(&mut versions);
					versions
				})
			}
			SourceKind::PaperFamily { project } => {
				let url = self.paper_project_url(project);
				let list: VersionList = self.fetch_json(source, &url).await?;
				list.versions.into_iter().rev().collect()
			}
			SourceKind::Purpur => {
				let list: VersionList = self.fetch_json(source, &self.endpoints.purpur).await?;
				list.versions.into_iter().rev().collect()
			}
			SourceKind::Magma => {
				let url = format!("{}/allVersions", self.endpoints.magma.trim_end_matches('/'));
				let entries: Vec<Value> = self.fetch_json(source, &url).await?;
				entries.iter().filter_map(magma_version).collect()
			}
			SourceKind::Spigot => self
				.spigot_releases(source)
				.await?
				.into_iter()
				.map(|r| r.version)
				.collect(),
			SourceKind::External { versions_url } => {
				let mut versions: Vec<String> = self
					.external_map(source, versions_url)
					.await?
					.into_iter()
					.map(|(k, _)| k)
					.collect();
				sort_newest_first(&mut versions);
				versions
			}
		};

		debug!(count = versions.len(), "listed versions");
		Ok(versions)
	}

	/// Download URL of the server artifact for `version` of `source`.
	#[instrument(skip(self))]
	pub async fn resolve_download_url(&self, source: &str, version: &str) -> Result<String> {
		let descriptor = self.registry.get(source)?;
		let missing = || SourceError::not_found(source, format!("version {version} not available"));

		let url = match &descriptor.kind {
			SourceKind::Vanilla => self.vanilla_url(source, version).await?,
			SourceKind::PaperFamily { project } => self.paper_url(source, project, version).await?,
			SourceKind::Purpur => format!(
				"{}/{version}/latest/download",
				self.endpoints.purpur.trim_end_matches('/')
			),
			SourceKind::Magma => format!(
				"{}/{version}/latest/download",
				self.endpoints.magma.trim_end_matches('/')
			),
			SourceKind::Spigot => self
				.spigot_releases(source)
				.await?
				.into_iter()
				.find(|r| r.version == version)
				.map(|r| r.download_link)
				.ok_or_else(missing)?,
			SourceKind::External { versions_url } => self
				.external_map(source, versions_url)
				.await?
				.remove(version)
				.and_then(|v| v.as_str().map(str::to_string))
				.ok_or_else(missing)?,
		};

		info!(url = %url, "resolved artifact URL");
		Ok(url)
	}

	async fn fetch_json<T: serde::de::DeserializeOwned>(&self, source: &str, url: &str) -> Result<T> {
		self.fetcher
			.get_json(url)
			.await
			.map_err(|e| upstream_failure(source, e))
	}

	fn paper_project_url(&self, project: &str) -> String {
		format!(
			"{}/v2/projects/{project}",
			self.endpoints.papermc.trim_end_matches('/')
		)
	}

	async fn paper_url(&self, source: &str, project: &str, version: &str) -> Result<String> {
		let version_url = format!("{}/versions/{version}", self.paper_project_url(project));
		let info: PaperVersion = self.fetch_json(source, &version_url).await?;

		let build = info
			.builds
			.iter()
			.max()
			.ok_or_else(|| SourceError::not_found(source, format!("no builds for {version}")))?;

		let build_url = format!("{version_url}/builds/{build}");
		let build_info: PaperBuild = self.fetch_json(source, &build_url).await?;

		Ok(format!(
			"{build_url}/downloads/{}",
			build_info.downloads.application.name
		))
	}

	async fn vanilla_url(&self, source: &str, version: &str) -> Result<String> {
		if let Some(cached) = self.catalog.fresh(source).await? {
			if let Some(url) = cached.versions.get(version) {
				return Ok(url.clone());
			}
		}

		let manifest: VersionManifest = self
			.fetch_json(source, &self.endpoints.mojang_manifest)
			.await?;
		let entry = manifest
			.versions
			.into_iter()
			.find(|v| v.id == version)
			.ok_or_else(|| SourceError::not_found(source, format!("version {version} not in manifest")))?;

		let doc: VersionDocument = self.fetch_json(source, &entry.url).await?;
		server_url(doc)
			.ok_or_else(|| SourceError::not_found(source, format!("version {version} has no server download")))
	}

	/// The full `{version: server_url}` map, from cache while fresh.
	async fn vanilla_catalog(&self, source: &str) -> Result<CachedCatalog> {
		if let Some(cached) = self.catalog.fresh(source).await? {
			return Ok(cached);
		}

		let manifest: VersionManifest = self
			.fetch_json(source, &self.endpoints.mojang_manifest)
			.await?;
		let total = manifest.versions.len();

		let versions: Vec<(String, String)> = stream::iter(manifest.versions)
			.map(|entry| async move {
				match self.fetcher.get_json::<VersionDocument>(&entry.url).await {
					Ok(doc) => server_url(doc).map(|url| (entry.id, url)),
					Err(e) => {
						warn!(version = %entry.id, error = %e, "skipping unreadable version document");
						None
					}
				}
			})
			.buffered(self.manifest_concurrency)
			.filter_map(|entry| async move { entry })
			.collect()
			.await;

		info!(
			manifest = total,
			with_server = versions.len(),
			"walked version manifest"
		);
		Ok(self.catalog.replace_ordered(source, versions).await?)
	}

	async fn spigot_releases(&self, source: &str) -> Result<Vec<SpigotRelease>> {
		let html = self
			.fetcher
			.get_text(
				&self.endpoints.spigot_listing,
				&[("user-agent", BROWSER_USER_AGENT)],
			)
			.await
			.map_err(|e| upstream_failure(source, e))?;

		let releases = parse_listing(&html);
		if releases.is_empty() {
			return Err(SourceError::not_found(source, "listing contained no releases"));
		}
		Ok(releases)
	}

	async fn external_map(&self, source: &str, url: &str) -> Result<serde_json::Map<String, Value>> {
		self.fetch_json(source, url).await
	}
}

fn server_url(doc: VersionDocument) -> Option<String> {
	doc.downloads?.server.map(|s| s.url)
}

fn magma_version(entry: &Value) -> Option<String> {
	match entry {
		Value::String(s) => Some(s.clone()),
		Value::Object(obj) => ["name", "version", "id"]
			.iter()
			.find_map(|k| obj.get(*k).and_then(Value::as_str))
			.map(str::to_string),
		_ => None,
	}
}

fn upstream_failure(source: &str, err: HttpError) -> SourceError {
	warn!(source, error = %err, "upstream request failed");
	SourceError::not_found(source, err)
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_common_http::RetryConfig;
	use kiln_common_store::MemoryStore;
	use serde_json::json;
	use wiremock::matchers::{header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn resolver_with(endpoints: SourceEndpoints, registry: SourceRegistry) -> SourceResolver {
		let fetcher = Fetcher::new(kiln_common_http::new_client().unwrap(), RetryConfig::no_retry());
		let catalog = Arc::new(CatalogCache::new(
			Arc::new(MemoryStore::new()),
			CatalogCache::DEFAULT_TTL,
		));
		SourceResolver::new(fetcher, Arc::new(registry), endpoints, catalog)
	}

	fn endpoints_at(base: &str) -> SourceEndpoints {
		SourceEndpoints {
			mojang_manifest: format!("{base}/mc/game/version_manifest.json"),
			papermc: base.to_string(),
			purpur: format!("{base}/v2/purpur"),
			magma: format!("{base}/api/v2"),
			spigot_listing: format!("{base}/download/spigot"),
		}
	}

	#[tokio::test]
	async fn purpur_urls_are_templated_without_network() {
		let resolver = resolver_with(
			SourceEndpoints {
				purpur: "https://api.purpurmc.org/v2/purpur".to_string(),
				..endpoints_at("http://127.0.0.1:9")
			},
			SourceRegistry::builtin(),
		);

		let url = resolver.resolve_download_url("purpur", "1.20.1").await.unwrap();
		assert_eq!(url, "https://api.purpurmc.org/v2/purpur/1.20.1/latest/download");
	}

	#[tokio::test]
	async fn magma_urls_are_templated() {
		let resolver = resolver_with(SourceEndpoints::default(), SourceRegistry::builtin());
		let url = resolver.resolve_download_url("magma", "1.18.2").await.unwrap();
		assert_eq!(
			url,
			"https://api.magmafoundation.org/api/v2/1.18.2/latest/download"
		);
	}

	#[tokio::test]
	async fn unknown_sources_are_rejected() {
		let resolver = resolver_with(SourceEndpoints::default(), SourceRegistry::builtin());
		let err = resolver.list_versions("bukkit").await.unwrap_err();
		assert!(matches!(err, SourceError::UnknownSource(_)));
	}

	#[tokio::test]
	async fn paper_resolves_latest_build_download() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/v2/projects/paper/versions/1.20.1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "builds": [17, 196, 42] })))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/v2/projects/paper/versions/1.20.1/builds/196"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"downloads": { "application": { "name": "paper-1.20.1-196.jar" } }
			})))
			.mount(&server)
			.await;

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		let url = resolver.resolve_download_url("paper", "1.20.1").await.unwrap();
		assert_eq!(
			url,
			format!(
				"{}/v2/projects/paper/versions/1.20.1/builds/196/downloads/paper-1.20.1-196.jar",
				server.uri()
			)
		);
	}

	#[tokio::test]
	async fn paper_family_lists_newest_first() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/v2/projects/velocity"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"project_id": "velocity",
				"versions": ["3.1.0", "3.2.0", "3.3.0"]
			})))
			.mount(&server)
			.await;

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		assert_eq!(
			resolver.list_versions("velocity").await.unwrap(),
			vec!["3.3.0", "3.2.0", "3.1.0"]
		);
	}

	#[tokio::test]
	async fn paper_version_without_builds_is_not_found() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "builds": [] })))
			.mount(&server)
			.await;

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		let err = resolver.resolve_download_url("folia", "1.20.1").await.unwrap_err();
		assert!(matches!(err, SourceError::NotFound { .. }));
	}

	#[tokio::test]
	async fn upstream_errors_become_not_found() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		for source in ["paper", "purpur", "magma", "vanilla", "spigot"] {
			let err = resolver.list_versions(source).await.unwrap_err();
			assert!(matches!(err, SourceError::NotFound { .. }), "{source}");
		}
	}

	#[tokio::test]
	async fn vanilla_walks_manifest_and_caches() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/mc/game/version_manifest.json"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"latest": { "release": "1.20.1" },
				"versions": [
					{ "id": "1.20.1", "type": "release", "url": format!("{}/v/1.20.1.json", server.uri()) },
					{ "id": "1.9", "type": "release", "url": format!("{}/v/1.9.json", server.uri()) },
					{ "id": "rd-132211", "type": "old_alpha", "url": format!("{}/v/rd.json", server.uri()) }
				]
			})))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/v/1.20.1.json"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"downloads": { "server": { "url": "https://launcher.invalid/1.20.1/server.jar" } }
			})))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/v/1.9.json"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"downloads": { "server": { "url": "https://launcher.invalid/1.9/server.jar" } }
			})))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/v/rd.json"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "downloads": {} })))
			.mount(&server)
			.await;

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		assert_eq!(
			resolver.list_versions("vanilla").await.unwrap(),
			vec!["1.20.1", "1.9"]
		);

		// Served from the catalog cache; the manifest mock expects one hit.
		let url = resolver.resolve_download_url("vanilla", "1.9").await.unwrap();
		assert_eq!(url, "https://launcher.invalid/1.9/server.jar");
	}

	#[tokio::test]
	async fn vanilla_keeps_manifest_order_for_snapshots_and_prereleases() {
		let server = MockServer::start().await;
		let ids = ["24w14a", "1.21", "1.21-pre1", "1.20.6"];
		let versions: Vec<Value> = ids
			.iter()
			.map(|id| json!({ "id": id, "type": "release", "url": format!("{}/v/{id}.json", server.uri()) }))
			.collect();
		Mock::given(method("GET"))
			.and(path("/mc/game/version_manifest.json"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "versions": versions })))
			.mount(&server)
			.await;
		for id in ids {
			Mock::given(method("GET"))
				.and(path(format!("/v/{id}.json")))
				.respond_with(ResponseTemplate::new(200).set_body_json(json!({
					"downloads": { "server": { "url": format!("https://launcher.invalid/{id}/server.jar") } }
				})))
				.mount(&server)
				.await;
		}

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		assert_eq!(resolver.list_versions("vanilla").await.unwrap(), ids);
		// Second listing comes from the cache and keeps the same order.
		assert_eq!(resolver.list_versions("vanilla").await.unwrap(), ids);
	}

	#[tokio::test]
	async fn spigot_listing_is_scraped_with_browser_agent() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/download/spigot"))
			.and(header("user-agent", BROWSER_USER_AGENT))
			.respond_with(ResponseTemplate::new(200).set_body_string(
				r#"<div class="download-pane"><h2>1.21.1</h2><a class="btn btn-download" href="https://getbukkit.invalid/get/1">Download</a></div>"#,
			))
			.mount(&server)
			.await;

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		assert_eq!(resolver.list_versions("spigot").await.unwrap(), vec!["1.21.1"]);
		assert_eq!(
			resolver.resolve_download_url("spigot", "1.21.1").await.unwrap(),
			"https://getbukkit.invalid/get/1"
		);
		assert!(matches!(
			resolver.resolve_download_url("spigot", "1.7.10").await.unwrap_err(),
			SourceError::NotFound { .. }
		));
	}

	#[tokio::test]
	async fn external_sources_serve_version_maps() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/forge.json"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"1.19.2": "https://files.invalid/forge-1.19.2.jar",
				"1.20.1": "https://files.invalid/forge-1.20.1.jar"
			})))
			.mount(&server)
			.await;

		let registry = SourceRegistry::builtin().with_external(
			"forge",
			"Forge",
			format!("{}/forge.json", server.uri()),
		);
		let resolver = resolver_with(endpoints_at(&server.uri()), registry);

		assert_eq!(
			resolver.list_versions("forge").await.unwrap(),
			vec!["1.20.1", "1.19.2"]
		);
		assert_eq!(
			resolver.resolve_download_url("forge", "1.19.2").await.unwrap(),
			"https://files.invalid/forge-1.19.2.jar"
		);
		assert!(resolver.resolve_download_url("forge", "1.12.2").await.is_err());
	}

	#[tokio::test]
	async fn magma_lists_versions_as_served() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/v2/allVersions"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!(["1.20.1", "1.18.2", "1.12.2"])))
			.mount(&server)
			.await;

		let resolver = resolver_with(endpoints_at(&server.uri()), SourceRegistry::builtin());
		assert_eq!(
			resolver.list_versions("magma").await.unwrap(),
			vec!["1.20.1", "1.18.2", "1.12.2"]
		);
	}
}
