// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use tollgate_policy_core::{FolderSystemType, ParseError};

/// Configuration defects discovered while filtering.
///
/// These never happen with a consistent catalog. When one does, the whole
/// filter call fails instead of returning a partially filtered batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
	#[error("object type '{object_type}' is folderable but has no folder system mapping")]
	UnmappedObjectType { object_type: String },

	#[error("folder system type '{folder_type}' is mapped from both '{first}' and '{second}'")]
	AmbiguousFolderSystemType {
		folder_type: FolderSystemType,
		first: String,
		second: String,
	},
}

/// Errors returned by access checks.
///
/// A denied check is never an error; it is a `false` or an omission from the
/// returned collection.
#[derive(Debug, Error)]
pub enum AccessError {
	#[error("configuration integrity error: {0}")]
	ConfigurationIntegrity(#[from] IntegrityError),

	#[error("rule catalog error: {0}")]
	Parse(#[from] ParseError),

	#[error("catalog source error: {0}")]
	CatalogSource(String),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, AccessError>;
