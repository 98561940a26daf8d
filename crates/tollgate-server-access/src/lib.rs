// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side record access for Tollgate.
//!
//! This crate provides:
//! - [`ObjectAccessManager`], the batch record filter and single-record checks
//! - [`RuleCatalogCache`], rule catalogs per account and API version
//! - The folder and grant collaborator traits the manager consumes
//! - SQLite implementations of those collaborators
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tollgate_server_access::*;
//!
//! let pool = create_pool("sqlite:./tollgate.db").await?;
//! create_schema(&pool).await?;
//!
//! let registries = Arc::new(LeafRegistries::canonical());
//! let source = Arc::new(StaticCatalogSource::from_path("catalog.toml".as_ref())?);
//! let catalogs = Arc::new(RuleCatalogCache::new(source, registries.clone()));
//! let folders = Arc::new(SqliteFolderRepository::new(pool.clone()));
//! let manager = ObjectAccessManager::new(catalogs, folders.clone(), folders);
//!
//! let grants = SqliteGrantRepository::new(pool, registries);
//! let ctx = AccessContext::resolve(account, user, ApiVersion(5), &grants, &grants).await?;
//! let visible = manager.filter_accessible_records(&ctx, &candidates).await?;
//! ```

pub mod catalog_cache;
pub mod context;
pub mod error;
pub mod folder;
pub mod folder_repository;
pub mod grants;
pub mod manager;
pub mod schema;
pub mod types;

pub use catalog_cache::{CatalogSource, RuleCatalogCache, StaticCatalogSource};
pub use context::AccessContext;
pub use error::{AccessError, IntegrityError, Result};
pub use folder::{FolderDataLoader, FolderPermissionChecker, ObjectFolderability, OwningFolders};
pub use folder_repository::SqliteFolderRepository;
pub use grants::{AbilityProvider, FeatureFlagProvider, SqliteGrantRepository, StaticGrants};
pub use manager::ObjectAccessManager;
pub use schema::{create_memory_pool, create_pool, create_schema};
pub use types::{AccountId, FolderId, FolderRecord, UserId};

pub use tollgate_policy_core::{
	ApiVersion, LeafRegistries, Operation, RecordId, RecordIdCollection, RuleCatalog,
};
