// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// Whole-document get/set storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<Value>>;

	/// Replace the document stored under `key`. Returns once the write is
	/// durable.
	async fn set(&self, key: &str, document: Value) -> Result<()>;
}

/// Load a document and decode it into `T`.
pub async fn load_document<T: DeserializeOwned>(
	store: &dyn DocumentStore,
	key: &str,
) -> Result<Option<T>> {
	match store.get(key).await? {
		Some(value) => Ok(Some(serde_json::from_value(value)?)),
		None => Ok(None),
	}
}

/// Encode `document` and store it under `key`.
pub async fn save_document<T: Serialize + ?Sized>(
	store: &dyn DocumentStore,
	key: &str,
	document: &T,
) -> Result<()> {
	store.set(key, serde_json::to_value(document)?).await
}

fn validate_key(key: &str) -> Result<()> {
	let valid = !key.is_empty()
		&& key
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
	if valid {
		Ok(())
	} else {
		Err(StoreError::InvalidKey(key.to_string()))
	}
}

/// One pretty-printed JSON file per key inside a data directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
pub struct JsonFileStore {
	dir: PathBuf,
	write_lock: Mutex<()>,
}

impl JsonFileStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self {
			dir: dir.into(),
			write_lock: Mutex::new(()),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn document_path(&self, key: &str) -> PathBuf {
		self.dir.join(format!("{key}.json"))
	}

	async fn quarantine(&self, key: &str, path: &Path) -> Result<PathBuf> {
		let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
		let target = self.dir.join(format!("{key}.json.corrupt-{stamp}"));
		tokio::fs::rename(path, &target).await?;
		Ok(target)
	}
}

#[async_trait]
impl DocumentStore for JsonFileStore {
	async fn get(&self, key: &str) -> Result<Option<Value>> {
		validate_key(key)?;
		let path = self.document_path(key);

		if !tokio::fs::try_exists(&path).await? {
			debug!(key, path = %path.display(), "document not found");
			return Ok(None);
		}

		let contents = tokio::fs::read_to_string(&path).await?;
		match serde_json::from_str(&contents) {
			Ok(value) => Ok(Some(value)),
			Err(e) => {
				// Moved aside so the next write cannot overwrite it.
				let quarantined = self.quarantine(key, &path).await?;
				warn!(
					key,
					path = %path.display(),
					moved_to = %quarantined.display(),
					error = %e,
					"unreadable document moved aside, starting empty"
				);
				Ok(None)
			}
		}
	}

	async fn set(&self, key: &str, document: Value) -> Result<()> {
		validate_key(key)?;
		let _guard = self.write_lock.lock().await;

		tokio::fs::create_dir_all(&self.dir).await?;

		let path = self.document_path(key);
		let tmp_path = self.dir.join(format!("{key}.json.tmp"));
		let json = serde_json::to_string_pretty(&document)?;

		tokio::fs::write(&tmp_path, json).await?;
		tokio::fs::rename(&tmp_path, &path).await?;

		debug!(key, path = %path.display(), "saved document");
		Ok(())
	}
}

/// Volatile store, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
	documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl DocumentStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<Value>> {
		validate_key(key)?;
		Ok(self.documents.read().await.get(key).cloned())
	}

	async fn set(&self, key: &str, document: Value) -> Result<()> {
		validate_key(key)?;
		self.documents.write().await.insert(key.to_string(), document);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Deserialize;
	use serde_json::json;
	use tempfile::TempDir;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Sample {
		name: String,
		count: u32,
	}

	#[tokio::test]
	async fn missing_document_is_none() {
		let tmp = TempDir::new().unwrap();
		let store = JsonFileStore::new(tmp.path());
		assert!(store.get("tasks").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn file_store_persists_across_instances() {
		let tmp = TempDir::new().unwrap();
		let doc = Sample {
			name: "paper".to_string(),
			count: 3,
		};

		save_document(&JsonFileStore::new(tmp.path()), "sample", &doc)
			.await
			.unwrap();

		let reopened = JsonFileStore::new(tmp.path());
		let loaded: Option<Sample> = load_document(&reopened, "sample").await.unwrap();
		assert_eq!(loaded, Some(doc));
		assert!(!tmp.path().join("sample.json.tmp").exists());
	}

	#[tokio::test]
	async fn corrupt_document_reads_as_empty_and_is_kept_aside() {
		let tmp = TempDir::new().unwrap();
		std::fs::write(tmp.path().join("tasks.json"), "{ not json").unwrap();

		let store = JsonFileStore::new(tmp.path());
		assert!(store.get("tasks").await.unwrap().is_none());

		store.set("tasks", json!({})).await.unwrap();
		assert_eq!(store.get("tasks").await.unwrap(), Some(json!({})));

		let kept: Vec<PathBuf> = std::fs::read_dir(tmp.path())
			.unwrap()
			.map(|entry| entry.unwrap().path())
			.filter(|path| {
				path.file_name()
					.and_then(|n| n.to_str())
					.is_some_and(|n| n.starts_with("tasks.json.corrupt-"))
			})
			.collect();
		assert_eq!(kept.len(), 1);
		assert_eq!(std::fs::read_to_string(&kept[0]).unwrap(), "{ not json");
	}

	#[tokio::test]
	async fn keys_cannot_escape_the_data_dir() {
		let tmp = TempDir::new().unwrap();
		let store = JsonFileStore::new(tmp.path());

		for key in ["../escape", "a/b", "", "tasks.json"] {
			let err = store.set(key, json!(1)).await.unwrap_err();
			assert!(matches!(err, StoreError::InvalidKey(_)), "key {key:?}");
		}
	}

	#[tokio::test]
	async fn memory_store_round_trips_values() {
		let store = MemoryStore::new();
		store.set("catalogs", json!({ "a": 1 })).await.unwrap();
		assert_eq!(store.get("catalogs").await.unwrap(), Some(json!({ "a": 1 })));
		assert!(store.get("other").await.unwrap().is_none());
	}
}
