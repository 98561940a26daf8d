// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record access filtering.
//!
//! [`ObjectAccessManager::filter_accessible_records`] narrows a batch of
//! (object type, record id) pairs in three stages, each of which only removes:
//!
//! 1. **Object gate.** Every object type is checked once against the catalog.
//!    A type the caller cannot read is dropped with all of its records.
//! 2. **Folder gate.** Records of folderable types are kept only if their
//!    owning folder is accessible. Membership for all folderable types is
//!    loaded in a single call. Records with no owning folder are kept.
//! 3. **Direct folder gate.** `Folder` records are kept only if the folder
//!    exists and is accessible.
//!
//! Single-record checks run the same pipeline over a one-element batch.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tollgate_policy_core::{
	FolderSystemType, Operation, RecordId, RecordIdCollection, FOLDER_OBJECT_TYPE,
};
use tracing::instrument;

use crate::catalog_cache::RuleCatalogCache;
use crate::context::AccessContext;
use crate::error::{IntegrityError, Result};
use crate::folder::{FolderDataLoader, FolderPermissionChecker, ObjectFolderability};
use crate::types::FolderId;

pub struct ObjectAccessManager {
	catalogs: Arc<RuleCatalogCache>,
	folder_loader: Arc<dyn FolderDataLoader>,
	folder_permissions: Arc<dyn FolderPermissionChecker>,
	folderability: Option<Arc<dyn ObjectFolderability>>,
}

impl ObjectAccessManager {
	/// Folderability comes from each catalog's `folderType` entries unless
	/// overridden with [`with_folderability`](Self::with_folderability).
	pub fn new(
		catalogs: Arc<RuleCatalogCache>,
		folder_loader: Arc<dyn FolderDataLoader>,
		folder_permissions: Arc<dyn FolderPermissionChecker>,
	) -> Self {
		Self {
			catalogs,
			folder_loader,
			folder_permissions,
			folderability: None,
		}
	}

	pub fn with_folderability(mut self, folderability: Arc<dyn ObjectFolderability>) -> Self {
		self.folderability = Some(folderability);
		self
	}

	/// Whether the caller may read records of `object_type` at all.
	pub async fn can_user_access_object(&self, ctx: &AccessContext, object_type: &str) -> Result<bool> {
		self.can_user_perform(ctx, object_type, Operation::Read).await
	}

	/// Whether the caller may perform `operation` on `object_type`.
	#[instrument(
		level = "debug",
		skip(self, ctx),
		fields(account_id = %ctx.account_id, user_id = %ctx.user_id)
	)]
	pub async fn can_user_perform(
		&self,
		ctx: &AccessContext,
		object_type: &str,
		operation: Operation,
	) -> Result<bool> {
		let catalog = self.catalogs.get(ctx.account_id, ctx.api_version).await?;
		let allowed = catalog.is_allowed(object_type, operation, ctx.abilities(), ctx.feature_flags());
		tracing::debug!(allowed, "object access decided");
		Ok(allowed)
	}

	/// Whether the caller may read one record.
	pub async fn can_user_access_record(
		&self,
		ctx: &AccessContext,
		object_type: &str,
		id: RecordId,
	) -> Result<bool> {
		let candidates = RecordIdCollection::single(object_type, id);
		let accessible = self.filter_accessible_records(ctx, &candidates).await?;
		Ok(accessible.contains_record_id(object_type, id))
	}

	/// Returns the subset of `candidates` the caller may read.
	///
	/// # Errors
	/// Fails with `AccessError::ConfigurationIntegrity` when a folderable type
	/// has no usable folder system mapping. Nothing is returned in that case,
	/// not even the records that were already decided.
	#[instrument(
		skip(self, ctx, candidates),
		fields(account_id = %ctx.account_id, user_id = %ctx.user_id, candidates = candidates.len())
	)]
	pub async fn filter_accessible_records(
		&self,
		ctx: &AccessContext,
		candidates: &RecordIdCollection,
	) -> Result<RecordIdCollection> {
		let mut accessible = candidates.clone();
		if accessible.is_empty() {
			return Ok(accessible);
		}

		let catalog = self.catalogs.get(ctx.account_id, ctx.api_version).await?;
		apply_object_gate(&mut accessible, |object_type| {
			catalog.is_allowed(object_type, Operation::Read, ctx.abilities(), ctx.feature_flags())
		});

		let folderability: &dyn ObjectFolderability = match &self.folderability {
			Some(folderability) => &**folderability,
			None => &*catalog,
		};
		let folder_types = resolve_folder_types(folderability, &accessible)?;
		let has_folders = accessible.contains_object_type(FOLDER_OBJECT_TYPE);

		if !folder_types.is_empty() || has_folders {
			self.invalidate_folder_cache().await;
		}
		if !folder_types.is_empty() {
			self.apply_folder_gate(ctx, &folder_types, &mut accessible).await?;
		}
		if has_folders {
			self.apply_direct_folder_gate(ctx, &mut accessible).await?;
		}

		tracing::debug!(accessible = accessible.len(), "filtered records");
		Ok(accessible)
	}

	/// Evicts folder rows cached by the loader so permission checks see
	/// current data.
	pub async fn invalidate_folder_cache(&self) {
		self.folder_loader.evict_cached_rows().await;
	}

	async fn apply_folder_gate(
		&self,
		ctx: &AccessContext,
		folder_types: &BTreeMap<FolderSystemType, String>,
		accessible: &mut RecordIdCollection,
	) -> Result<()> {
		let before = accessible.len();
		let request: BTreeMap<FolderSystemType, BTreeSet<RecordId>> = folder_types
			.iter()
			.map(|(folder_type, object_type)| {
				(
					folder_type.clone(),
					accessible.record_ids_by_object_type(object_type).clone(),
				)
			})
			.collect();

		let owning = self
			.folder_loader
			.load_owning_folder_ids(ctx.account_id, &request)
			.await?;

		let folder_ids: BTreeSet<FolderId> = owning
			.values()
			.flat_map(|by_record| by_record.values().copied())
			.collect();
		let visible = self.accessible_folders(ctx, &folder_ids).await?;

		for (folder_type, object_type) in folder_types {
			let Some(by_record) = owning.get(folder_type) else {
				continue;
			};
			accessible.retain_record_ids(object_type, |id| {
				by_record
					.get(&id)
					.map_or(true, |folder_id| visible.contains(folder_id))
			});
		}

		tracing::debug!(
			before,
			after = accessible.len(),
			folders = folder_ids.len(),
			"folder gate applied"
		);
		Ok(())
	}

	async fn apply_direct_folder_gate(
		&self,
		ctx: &AccessContext,
		accessible: &mut RecordIdCollection,
	) -> Result<()> {
		let folder_ids = accessible.record_ids_by_object_type(FOLDER_OBJECT_TYPE).clone();
		let visible = self.accessible_folders(ctx, &folder_ids).await?;
		accessible.retain_record_ids(FOLDER_OBJECT_TYPE, |id| visible.contains(&id));

		tracing::debug!(
			before = folder_ids.len(),
			after = accessible.record_ids_by_object_type(FOLDER_OBJECT_TYPE).len(),
			"direct folder gate applied"
		);
		Ok(())
	}

	/// Folders that do not exist are simply not in the result.
	async fn accessible_folders(
		&self,
		ctx: &AccessContext,
		folder_ids: &BTreeSet<FolderId>,
	) -> Result<HashSet<FolderId>> {
		if folder_ids.is_empty() {
			return Ok(HashSet::new());
		}
		let folders = self.folder_loader.load_folders(ctx.account_id, folder_ids).await?;
		self.folder_permissions
			.filter_accessible_folders(&folders, ctx.account_id, ctx)
			.await
	}
}

/// Decides each object type once, however many records it carries.
fn apply_object_gate(accessible: &mut RecordIdCollection, mut can_read: impl FnMut(&str) -> bool) {
	let before = accessible.len();
	for object_type in accessible.object_types() {
		if !can_read(&object_type) {
			accessible.remove_all_by_object_type(&object_type);
		}
	}
	tracing::debug!(before, after = accessible.len(), "object gate applied");
}

/// Maps each folderable type present in `records` to its folder system type.
///
/// The mapping must be one-to-one: owning folders come back keyed by folder
/// system type and have to be attributed to exactly one object type.
fn resolve_folder_types(
	folderability: &dyn ObjectFolderability,
	records: &RecordIdCollection,
) -> std::result::Result<BTreeMap<FolderSystemType, String>, IntegrityError> {
	let mut folder_types: BTreeMap<FolderSystemType, String> = BTreeMap::new();
	for object_type in records.object_types() {
		if object_type == FOLDER_OBJECT_TYPE || !folderability.is_folderable(&object_type) {
			continue;
		}
		let folder_type = folderability.folder_system_type(&object_type)?;
		if let Some(first) = folder_types.get(&folder_type) {
			return Err(IntegrityError::AmbiguousFolderSystemType {
				folder_type,
				first: first.clone(),
				second: object_type,
			});
		}
		folder_types.insert(folder_type, object_type);
	}
	Ok(folder_types)
}
