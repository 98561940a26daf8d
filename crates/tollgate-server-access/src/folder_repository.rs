// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite folder storage.
//!
//! Folder rows are kept in an identity map once loaded, so repeated lookups of
//! the same folder within a request do not hit the database. Rows can change
//! underneath the map (a folder switching to explicit permissions, for
//! example), which is why the filter pipeline evicts it before every folder
//! phase.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tollgate_policy_core::{FolderSystemType, RecordId};
use tracing::instrument;

use crate::context::AccessContext;
use crate::error::Result;
use crate::folder::{FolderDataLoader, FolderPermissionChecker, OwningFolders};
use crate::types::{AccountId, FolderId, FolderRecord, UserId};

#[derive(sqlx::FromRow)]
struct FolderRow {
	id: i64,
	account_id: i64,
	name: String,
	use_permissions: bool,
}

impl From<FolderRow> for FolderRecord {
	fn from(row: FolderRow) -> Self {
		FolderRecord {
			id: row.id,
			account_id: AccountId(row.account_id),
			name: row.name,
			use_permissions: row.use_permissions,
		}
	}
}

#[derive(sqlx::FromRow)]
struct FolderObjectRow {
	folder_type: String,
	object_id: i64,
	folder_id: i64,
}

pub struct SqliteFolderRepository {
	pool: SqlitePool,
	rows: RwLock<HashMap<FolderId, FolderRecord>>,
}

impl SqliteFolderRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			rows: RwLock::new(HashMap::new()),
		}
	}

	/// Number of folder rows currently held in the identity map.
	pub async fn cached_rows(&self) -> usize {
		self.rows.read().await.len()
	}

	#[instrument(skip(self, name), fields(account_id = %account_id))]
	pub async fn create_folder(
		&self,
		account_id: AccountId,
		name: &str,
		use_permissions: bool,
	) -> Result<FolderId> {
		let result = sqlx::query(
			r#"
			INSERT INTO folders (account_id, name, use_permissions)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(account_id.0)
		.bind(name)
		.bind(use_permissions)
		.execute(&self.pool)
		.await?;
		Ok(result.last_insert_rowid())
	}

	#[instrument(skip(self), fields(folder_id = folder_id))]
	pub async fn set_use_permissions(&self, folder_id: FolderId, use_permissions: bool) -> Result<()> {
		sqlx::query("UPDATE folders SET use_permissions = ? WHERE id = ?")
			.bind(use_permissions)
			.bind(folder_id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	/// Places a record in a folder, replacing any previous placement.
	#[instrument(skip(self), fields(account_id = %account_id, folder_type = %folder_type))]
	pub async fn assign(
		&self,
		account_id: AccountId,
		folder_type: &FolderSystemType,
		object_id: RecordId,
		folder_id: FolderId,
	) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO folder_objects (account_id, folder_type, object_id, folder_id)
			VALUES (?, ?, ?, ?)
			ON CONFLICT (account_id, folder_type, object_id) DO UPDATE SET folder_id = excluded.folder_id
			"#,
		)
		.bind(account_id.0)
		.bind(folder_type.as_str())
		.bind(object_id)
		.bind(folder_id)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[instrument(skip(self), fields(folder_id = folder_id, user_id = %user_id))]
	pub async fn set_user_permission(&self, folder_id: FolderId, user_id: UserId, can_view: bool) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO folder_user_permissions (folder_id, user_id, can_view)
			VALUES (?, ?, ?)
			ON CONFLICT (folder_id, user_id) DO UPDATE SET can_view = excluded.can_view
			"#,
		)
		.bind(folder_id)
		.bind(user_id.0)
		.bind(can_view)
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[async_trait]
impl FolderDataLoader for SqliteFolderRepository {
	async fn evict_cached_rows(&self) {
		let mut rows = self.rows.write().await;
		let evicted = rows.len();
		rows.clear();
		tracing::trace!(evicted, "folder row cache evicted");
	}

	#[instrument(skip(self, request), fields(account_id = %account_id, types = request.len()))]
	async fn load_owning_folder_ids(
		&self,
		account_id: AccountId,
		request: &BTreeMap<FolderSystemType, BTreeSet<RecordId>>,
	) -> Result<OwningFolders> {
		let pairs: Vec<Value> = request
			.iter()
			.flat_map(|(folder_type, ids)| ids.iter().map(move |id| json!([folder_type.as_str(), id])))
			.collect();
		if pairs.is_empty() {
			return Ok(OwningFolders::new());
		}

		let rows: Vec<FolderObjectRow> = sqlx::query_as(
			r#"
			SELECT fo.folder_type, fo.object_id, fo.folder_id
			FROM folder_objects fo
			JOIN json_each(?) AS req
				ON fo.folder_type = json_extract(req.value, '$[0]')
				AND fo.object_id = json_extract(req.value, '$[1]')
			WHERE fo.account_id = ?
			"#,
		)
		.bind(Value::Array(pairs).to_string())
		.bind(account_id.0)
		.fetch_all(&self.pool)
		.await?;

		let mut owning = OwningFolders::new();
		for row in rows {
			owning
				.entry(FolderSystemType(row.folder_type))
				.or_default()
				.insert(row.object_id, row.folder_id);
		}
		Ok(owning)
	}

	#[instrument(skip(self, ids), fields(account_id = %account_id, requested = ids.len()))]
	async fn load_folders(&self, account_id: AccountId, ids: &BTreeSet<FolderId>) -> Result<Vec<FolderRecord>> {
		// The result is built from this call's own reads. Another request may
		// evict the map at any point after the lock is released.
		let mut found: BTreeMap<FolderId, FolderRecord> = BTreeMap::new();
		let missing: Vec<FolderId> = {
			let rows = self.rows.read().await;
			let mut missing = Vec::new();
			for id in ids {
				match rows.get(id) {
					Some(record) => {
						found.insert(*id, record.clone());
					}
					None => missing.push(*id),
				}
			}
			missing
		};

		if !missing.is_empty() {
			let loaded: Vec<FolderRow> = sqlx::query_as(
				r#"
				SELECT id, account_id, name, use_permissions
				FROM folders
				WHERE id IN (SELECT value FROM json_each(?))
				"#,
			)
			.bind(json!(missing).to_string())
			.fetch_all(&self.pool)
			.await?;

			tracing::debug!(missing = missing.len(), loaded = loaded.len(), "loaded folder rows");
			let mut rows = self.rows.write().await;
			for row in loaded {
				let record = FolderRecord::from(row);
				rows.insert(record.id, record.clone());
				found.insert(record.id, record);
			}
		}

		Ok(found
			.into_values()
			.filter(|folder| folder.account_id == account_id)
			.collect())
	}
}

#[async_trait]
impl FolderPermissionChecker for SqliteFolderRepository {
	#[instrument(skip(self, folder, ctx), fields(folder_id = folder.id, user_id = %ctx.user_id))]
	async fn has_access(&self, folder: &FolderRecord, ctx: &AccessContext) -> Result<bool> {
		if folder.account_id != ctx.account_id {
			return Ok(false);
		}
		if !folder.use_permissions {
			return Ok(true);
		}

		let can_view: Option<(bool,)> = sqlx::query_as(
			r#"
			SELECT can_view FROM folder_user_permissions
			WHERE folder_id = ? AND user_id = ?
			"#,
		)
		.bind(folder.id)
		.bind(ctx.user_id.0)
		.fetch_optional(&self.pool)
		.await?;
		Ok(can_view.is_some_and(|(can_view,)| can_view))
	}

	/// One query for every permission-controlled folder in the batch.
	#[instrument(skip(self, folders, ctx), fields(account_id = %account_id, folders = folders.len()))]
	async fn filter_accessible_folders(
		&self,
		folders: &[FolderRecord],
		account_id: AccountId,
		ctx: &AccessContext,
	) -> Result<HashSet<FolderId>> {
		let mut accessible = HashSet::new();
		let mut controlled = Vec::new();
		for folder in folders {
			if folder.account_id != account_id || folder.account_id != ctx.account_id {
				continue;
			}
			if folder.use_permissions {
				controlled.push(folder.id);
			} else {
				accessible.insert(folder.id);
			}
		}

		if !controlled.is_empty() {
			let granted: Vec<(i64,)> = sqlx::query_as(
				r#"
				SELECT folder_id FROM folder_user_permissions
				WHERE user_id = ? AND can_view = 1
					AND folder_id IN (SELECT value FROM json_each(?))
				"#,
			)
			.bind(ctx.user_id.0)
			.bind(json!(controlled).to_string())
			.fetch_all(&self.pool)
			.await?;
			accessible.extend(granted.into_iter().map(|(folder_id,)| folder_id));
		}

		Ok(accessible)
	}
}
