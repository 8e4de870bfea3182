// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Persisted upstream catalogs with a freshness window.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::store::{load_document, save_document, DocumentStore};

pub const CATALOGS_DOCUMENT: &str = "catalogs";

/// A version-id to download-URL map fetched from one upstream, with the
/// instant it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCatalog {
	pub last_updated: DateTime<Utc>,
	pub versions: BTreeMap<String, String>,
	/// Version ids in the upstream's own order, when it has a meaningful one.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub order: Vec<String>,
}

impl CachedCatalog {
	pub fn new(versions: BTreeMap<String, String>) -> Self {
		Self {
			last_updated: Utc::now(),
			versions,
			order: Vec::new(),
		}
	}

	/// Build from entries whose sequence is worth keeping.
	pub fn ordered(entries: Vec<(String, String)>) -> Self {
		let order = entries.iter().map(|(id, _)| id.clone()).collect();
		Self {
			order,
			..Self::new(entries.into_iter().collect())
		}
	}

	/// Ids in upstream order, or `None` if none was recorded.
	pub fn ids_in_order(&self) -> Option<Vec<String>> {
		if self.order.is_empty() {
			return None;
		}
		Some(
			self.order
				.iter()
				.filter(|id| self.versions.contains_key(*id))
				.cloned()
				.collect(),
		)
	}

	pub fn is_fresh_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
		let Ok(ttl) = chrono::Duration::from_std(ttl) else {
			return true;
		};
		now.signed_duration_since(self.last_updated) < ttl
	}
}

type CatalogDocument = BTreeMap<String, CachedCatalog>;

/// Read-through view over the `catalogs` document.
pub struct CatalogCache {
	store: Arc<dyn DocumentStore>,
	ttl: Duration,
	lock: Mutex<()>,
}

impl CatalogCache {
	pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

	pub fn new(store: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
		Self {
			store,
			ttl,
			lock: Mutex::new(()),
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// The cached catalog for `name`, regardless of age.
	pub async fn get(&self, name: &str) -> Result<Option<CachedCatalog>> {
		let doc: CatalogDocument = load_document(self.store.as_ref(), CATALOGS_DOCUMENT)
			.await?
			.unwrap_or_default();
		Ok(doc.get(name).cloned())
	}

	/// The cached catalog for `name` if it is still inside the freshness window.
	pub async fn fresh(&self, name: &str) -> Result<Option<CachedCatalog>> {
		let now = Utc::now();
		let entry = self.get(name).await?;
		let fresh = entry.filter(|c| c.is_fresh_at(self.ttl, now));
		debug!(catalog = name, hit = fresh.is_some(), "catalog cache lookup");
		Ok(fresh)
	}

	/// Replace the whole entry for `name` with `versions`, stamped now.
	pub async fn replace(
		&self,
		name: &str,
		versions: BTreeMap<String, String>,
	) -> Result<CachedCatalog> {
		self.store_catalog(name, CachedCatalog::new(versions)).await
	}

	/// Like [`replace`](Self::replace), remembering the order of `entries`.
	pub async fn replace_ordered(
		&self,
		name: &str,
		entries: Vec<(String, String)>,
	) -> Result<CachedCatalog> {
		self.store_catalog(name, CachedCatalog::ordered(entries)).await
	}

	async fn store_catalog(&self, name: &str, catalog: CachedCatalog) -> Result<CachedCatalog> {
		let _guard = self.lock.lock().await;

		let mut doc: CatalogDocument = load_document(self.store.as_ref(), CATALOGS_DOCUMENT)
			.await?
			.unwrap_or_default();

		doc.insert(name.to_string(), catalog.clone());
		save_document(self.store.as_ref(), CATALOGS_DOCUMENT, &doc).await?;

		debug!(
			catalog = name,
			versions = catalog.versions.len(),
			"catalog refreshed"
		);
		Ok(catalog)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::{JsonFileStore, MemoryStore};
	use serde_json::json;
	use tempfile::TempDir;

	fn versions(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn freshness_window_is_exclusive() {
		let catalog = CachedCatalog::new(BTreeMap::new());
		let ttl = Duration::from_secs(60);

		assert!(catalog.is_fresh_at(ttl, catalog.last_updated));
		assert!(catalog.is_fresh_at(ttl, catalog.last_updated + chrono::Duration::seconds(59)));
		assert!(!catalog.is_fresh_at(ttl, catalog.last_updated + chrono::Duration::seconds(60)));
	}

	#[tokio::test]
	async fn replace_overwrites_the_whole_entry() {
		let cache = CatalogCache::new(Arc::new(MemoryStore::new()), CatalogCache::DEFAULT_TTL);

		cache
			.replace("vanilla", versions(&[("1.20.1", "a"), ("1.19.4", "b")]))
			.await
			.unwrap();
		cache
			.replace("vanilla", versions(&[("1.21", "c")]))
			.await
			.unwrap();

		let catalog = cache.fresh("vanilla").await.unwrap().unwrap();
		assert_eq!(catalog.versions, versions(&[("1.21", "c")]));
	}

	#[tokio::test]
	async fn ordered_catalogs_keep_upstream_order_across_reload() {
		let tmp = TempDir::new().unwrap();
		let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(tmp.path()));
		let entries = vec![
			("24w14a".to_string(), "s".to_string()),
			("1.21".to_string(), "r".to_string()),
			("1.21-pre1".to_string(), "p".to_string()),
		];
		CatalogCache::new(Arc::clone(&store), CatalogCache::DEFAULT_TTL)
			.replace_ordered("vanilla", entries)
			.await
			.unwrap();

		let reloaded = CatalogCache::new(store, CatalogCache::DEFAULT_TTL);
		let catalog = reloaded.fresh("vanilla").await.unwrap().unwrap();
		assert_eq!(
			catalog.ids_in_order(),
			Some(vec!["24w14a".to_string(), "1.21".to_string(), "1.21-pre1".to_string()])
		);
		assert!(CachedCatalog::new(BTreeMap::new()).ids_in_order().is_none());
	}

	#[tokio::test]
	async fn stale_entries_are_not_served_as_fresh() {
		let store = Arc::new(MemoryStore::new());
		store
			.set(
				CATALOGS_DOCUMENT,
				json!({
					"vanilla": {
						"lastUpdated": "2020-01-01T00:00:00Z",
						"versions": { "1.15.2": "https://example.invalid/server.jar" }
					}
				}),
			)
			.await
			.unwrap();

		let cache = CatalogCache::new(store, CatalogCache::DEFAULT_TTL);
		assert!(cache.fresh("vanilla").await.unwrap().is_none());
		assert!(cache.get("vanilla").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn entries_for_other_sources_are_preserved() {
		let tmp = TempDir::new().unwrap();
		let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(tmp.path()));
		let cache = CatalogCache::new(Arc::clone(&store), CatalogCache::DEFAULT_TTL);

		cache.replace("vanilla", versions(&[("1.20.1", "a")])).await.unwrap();
		cache.replace("java", versions(&[("21", "")])).await.unwrap();

		let doc = store.get(CATALOGS_DOCUMENT).await.unwrap().unwrap();
		assert!(doc.get("vanilla").is_some());
		assert!(doc.get("java").is_some());
		assert!(doc["vanilla"].get("lastUpdated").is_some());
	}
}
