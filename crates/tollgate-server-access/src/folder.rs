// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Folder collaborators consumed by the filter pipeline.
//!
//! Records of a folderable object type live in at most one folder, and the
//! caller must be able to see that folder to see the record. The pipeline only
//! talks to the folder system through these traits.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use tollgate_policy_core::{FolderSystemType, RecordId, RuleCatalog, FOLDER_OBJECT_TYPE};

use crate::context::AccessContext;
use crate::error::{IntegrityError, Result};
use crate::types::{AccountId, FolderId, FolderRecord};

/// Owning folder per record, grouped by folder system type. A record absent
/// from its type's map has no owning folder.
pub type OwningFolders = HashMap<FolderSystemType, HashMap<RecordId, FolderId>>;

/// Knows which object types live in folders.
pub trait ObjectFolderability: Send + Sync {
	fn is_folderable(&self, object_type: &str) -> bool;

	/// Folder system type of a folderable object type.
	fn folder_system_type(&self, object_type: &str) -> std::result::Result<FolderSystemType, IntegrityError>;
}

/// The catalog's `folderType` entries decide folderability.
impl ObjectFolderability for RuleCatalog {
	fn is_folderable(&self, object_type: &str) -> bool {
		object_type != FOLDER_OBJECT_TYPE
			&& self
				.object(object_type)
				.is_some_and(|rules| rules.folder_type().is_some())
	}

	fn folder_system_type(&self, object_type: &str) -> std::result::Result<FolderSystemType, IntegrityError> {
		self.object(object_type)
			.and_then(|rules| rules.folder_type())
			.cloned()
			.ok_or_else(|| IntegrityError::UnmappedObjectType {
				object_type: object_type.to_string(),
			})
	}
}

/// Batched access to folder membership and folder rows.
#[async_trait]
pub trait FolderDataLoader: Send + Sync {
	/// Drops any folder rows cached by previous loads.
	async fn evict_cached_rows(&self);

	/// Owning folders of every requested record, in one round trip.
	async fn load_owning_folder_ids(
		&self,
		account_id: AccountId,
		request: &BTreeMap<FolderSystemType, BTreeSet<RecordId>>,
	) -> Result<OwningFolders>;

	/// Folder rows for `ids`. Ids that do not exist in the account are omitted.
	async fn load_folders(&self, account_id: AccountId, ids: &BTreeSet<FolderId>) -> Result<Vec<FolderRecord>>;
}

/// Decides whether a caller can see a folder.
#[async_trait]
pub trait FolderPermissionChecker: Send + Sync {
	async fn has_access(&self, folder: &FolderRecord, ctx: &AccessContext) -> Result<bool>;

	/// Ids of the accessible folders among `folders`.
	///
	/// Folders from another account are never accessible.
	async fn filter_accessible_folders(
		&self,
		folders: &[FolderRecord],
		account_id: AccountId,
		ctx: &AccessContext,
	) -> Result<HashSet<FolderId>> {
		let mut accessible = HashSet::new();
		for folder in folders {
			if folder.account_id != account_id {
				continue;
			}
			if self.has_access(folder, ctx).await? {
				accessible.insert(folder.id);
			}
		}
		Ok(accessible)
	}
}
