// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-(account, API version) rule catalogs, built once and shared.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tollgate_policy_core::{ApiVersion, LeafRegistries, RuleCatalog};
use tracing::instrument;

use crate::error::{AccessError, Result};
use crate::types::AccountId;

/// Supplies the catalog document for an account and API version.
pub trait CatalogSource: Send + Sync {
	fn document(&self, account_id: AccountId, version: ApiVersion) -> Result<Value>;
}

/// Serves the same document to every account and version.
#[derive(Debug, Clone)]
pub struct StaticCatalogSource {
	document: Value,
}

impl StaticCatalogSource {
	pub fn new(document: Value) -> Self {
		Self { document }
	}

	pub fn from_toml_str(content: &str) -> Result<Self> {
		let document: Value = toml::from_str(content)
			.map_err(|e| AccessError::CatalogSource(format!("invalid catalog TOML: {e}")))?;
		Ok(Self::new(document))
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).map_err(|e| {
			AccessError::CatalogSource(format!("failed to read {}: {e}", path.display()))
		})?;
		Self::from_toml_str(&content)
	}
}

impl CatalogSource for StaticCatalogSource {
	fn document(&self, _account_id: AccountId, _version: ApiVersion) -> Result<Value> {
		Ok(self.document.clone())
	}
}

type CacheKey = (AccountId, ApiVersion);

pub struct RuleCatalogCache {
	source: Arc<dyn CatalogSource>,
	registries: Arc<LeafRegistries>,
	entries: RwLock<HashMap<CacheKey, Arc<RuleCatalog>>>,
}

impl RuleCatalogCache {
	pub fn new(source: Arc<dyn CatalogSource>, registries: Arc<LeafRegistries>) -> Self {
		Self {
			source,
			registries,
			entries: RwLock::new(HashMap::new()),
		}
	}

	/// Returns the catalog for a key, building it on first use.
	///
	/// A catalog that fails to parse is not cached; the next call retries.
	#[instrument(skip(self), fields(account_id = %account_id, version = %version))]
	pub async fn get(&self, account_id: AccountId, version: ApiVersion) -> Result<Arc<RuleCatalog>> {
		let key = (account_id, version);
		if let Some(catalog) = self.entries.read().await.get(&key) {
			return Ok(Arc::clone(catalog));
		}

		let mut entries = self.entries.write().await;
		if let Some(catalog) = entries.get(&key) {
			return Ok(Arc::clone(catalog));
		}

		let document = self.source.document(account_id, version)?;
		let catalog = Arc::new(RuleCatalog::parse(&document, &self.registries, version)?);
		tracing::info!(objects = catalog.len(), "rule catalog built");
		entries.insert(key, Arc::clone(&catalog));
		Ok(catalog)
	}

	/// Number of cached catalogs.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}

	pub fn registries(&self) -> &Arc<LeafRegistries> {
		&self.registries
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	const CATALOG: &str = r#"
		[objects.Prospect]
		read = { abilities = "PROSPECTS_VIEW" }

		[objects.Form]
		folderType = "form"
		sinceVersion = 4
		read = { abilities = "FORMS_VIEW" }
	"#;

	struct CountingSource {
		inner: StaticCatalogSource,
		calls: AtomicUsize,
	}

	impl CatalogSource for CountingSource {
		fn document(&self, account_id: AccountId, version: ApiVersion) -> Result<Value> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.inner.document(account_id, version)
		}
	}

	/// Serves each queued document once, then the last one forever.
	struct SequenceSource {
		documents: Mutex<Vec<Value>>,
	}

	impl CatalogSource for SequenceSource {
		fn document(&self, _account_id: AccountId, _version: ApiVersion) -> Result<Value> {
			let mut documents = self.documents.lock().unwrap();
			if documents.len() > 1 {
				Ok(documents.remove(0))
			} else {
				Ok(documents[0].clone())
			}
		}
	}

	fn counting() -> Arc<CountingSource> {
		Arc::new(CountingSource {
			inner: StaticCatalogSource::from_toml_str(CATALOG).unwrap(),
			calls: AtomicUsize::new(0),
		})
	}

	#[tokio::test]
	async fn catalog_is_built_once_per_key() {
		let source = counting();
		let cache = RuleCatalogCache::new(source.clone(), Arc::new(LeafRegistries::canonical()));

		let first = cache.get(AccountId(1), ApiVersion(5)).await.unwrap();
		let second = cache.get(AccountId(1), ApiVersion(5)).await.unwrap();
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);

		cache.get(AccountId(2), ApiVersion(5)).await.unwrap();
		let old = cache.get(AccountId(1), ApiVersion(3)).await.unwrap();
		assert_eq!(source.calls.load(Ordering::SeqCst), 3);
		assert_eq!(cache.len().await, 3);

		assert!(first.object("Form").is_some());
		assert!(old.object("Form").is_none());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_first_use_builds_once() {
		let source = counting();
		let cache = Arc::new(RuleCatalogCache::new(
			source.clone(),
			Arc::new(LeafRegistries::canonical()),
		));

		let handles: Vec<_> = (0..16)
			.map(|_| {
				let cache = Arc::clone(&cache);
				tokio::spawn(async move { cache.get(AccountId(1), ApiVersion(5)).await.unwrap() })
			})
			.collect();
		for handle in handles {
			handle.await.unwrap();
		}
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn parse_failures_are_not_cached() {
		let broken = serde_json::json!({ "objects": { "Prospect": { "read": { "abilities": "NOPE" } } } });
		let fixed = serde_json::json!({ "objects": { "Prospect": { "read": { "abilities": "PROSPECTS_VIEW" } } } });
		let source = Arc::new(SequenceSource {
			documents: Mutex::new(vec![broken, fixed]),
		});
		let cache = RuleCatalogCache::new(source, Arc::new(LeafRegistries::canonical()));

		let err = cache.get(AccountId(1), ApiVersion(5)).await.unwrap_err();
		assert!(matches!(err, AccessError::Parse(_)));
		assert!(cache.is_empty().await);

		let catalog = cache.get(AccountId(1), ApiVersion(5)).await.unwrap();
		assert_eq!(catalog.len(), 1);
	}

	#[test]
	fn static_source_reports_unreadable_files() {
		let err = StaticCatalogSource::from_path(Path::new("/nonexistent/catalog.toml")).unwrap_err();
		assert!(matches!(err, AccessError::CatalogSource(ref m) if m.contains("/nonexistent/catalog.toml")));
	}

	#[test]
	fn static_source_reads_toml_files() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("catalog.toml");
		std::fs::write(&path, CATALOG).unwrap();
		let source = StaticCatalogSource::from_path(&path).unwrap();
		let document = source.document(AccountId(1), ApiVersion(1)).unwrap();
		assert!(document["objects"]["Form"].is_object());
	}
}
