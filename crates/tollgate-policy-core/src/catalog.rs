// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-object-type rule definitions parsed from a catalog document.
//!
//! ```toml
//! [objects.Prospect]
//! featureFlags = "feature.prospects"
//! read = { abilities = { "$anyOf" = ["PROSPECTS_VIEW", "PROSPECTS_VIEW_ALL"] } }
//! update = { abilities = "PROSPECTS_UPDATE" }
//!
//! [objects.Form]
//! folderType = "form"
//! sinceVersion = 4
//! read = { abilities = "FORMS_VIEW" }
//! ```
//!
//! Every object entry is validated regardless of the API version the catalog
//! is built for, so a broken entry is reported even if it is hidden from the
//! requested version.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ability::Ability;
use crate::error::{ParseError, Result};
use crate::feature_flag::FeatureFlag;
use crate::leaf::LeafRegistries;
use crate::parser::{join_path, value_kind, RuleParser, ABILITIES_PROPERTY, FEATURE_FLAGS_PROPERTY};
use crate::record_ids::FOLDER_OBJECT_TYPE;
use crate::rule::AccessRule;

const OBJECTS_KEY: &str = "objects";
const FOLDER_TYPE_KEY: &str = "folderType";
const SINCE_VERSION_KEY: &str = "sinceVersion";

/// API version a catalog is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiVersion(pub u32);

impl std::fmt::Display for ApiVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "v{}", self.0)
	}
}

/// Operations an ability rule can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
	Read,
	Create,
	Update,
	Delete,
}

impl Operation {
	pub const ALL: [Operation; 4] = [
		Operation::Read,
		Operation::Create,
		Operation::Update,
		Operation::Delete,
	];

	/// Catalog key of the operation.
	pub fn as_str(self) -> &'static str {
		match self {
			Operation::Read => "read",
			Operation::Create => "create",
			Operation::Update => "update",
			Operation::Delete => "delete",
		}
	}

	fn index(self) -> usize {
		self as usize
	}
}

/// Identifier of an object type inside the folder system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderSystemType(pub String);

impl FolderSystemType {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for FolderSystemType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// Rules configured for one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRules {
	object_type: String,
	feature_flags: AccessRule<FeatureFlag>,
	operations: [AccessRule<Ability>; 4],
	folder_type: Option<FolderSystemType>,
	since_version: Option<ApiVersion>,
}

impl ObjectRules {
	pub fn object_type(&self) -> &str {
		&self.object_type
	}

	pub fn feature_flags(&self) -> &AccessRule<FeatureFlag> {
		&self.feature_flags
	}

	pub fn ability_rule(&self, operation: Operation) -> &AccessRule<Ability> {
		&self.operations[operation.index()]
	}

	/// Folder-system type, set iff records of this type live in folders.
	pub fn folder_type(&self) -> Option<&FolderSystemType> {
		self.folder_type.as_ref()
	}

	pub fn since_version(&self) -> Option<ApiVersion> {
		self.since_version
	}

	/// The account's flags must satisfy the feature rule and the user's
	/// abilities the operation's rule.
	pub fn is_allowed(
		&self,
		operation: Operation,
		abilities: &HashSet<Ability>,
		feature_flags: &HashSet<FeatureFlag>,
	) -> bool {
		self.feature_flags.evaluate(feature_flags) && self.ability_rule(operation).evaluate(abilities)
	}

	fn visible_in(&self, version: ApiVersion) -> bool {
		self.since_version.map_or(true, |since| since <= version)
	}
}

/// Immutable set of object rules for one API version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCatalog {
	version: ApiVersion,
	objects: BTreeMap<String, ObjectRules>,
}

impl RuleCatalog {
	/// Parses a catalog document.
	#[tracing::instrument(level = "debug", skip_all, fields(version = %version))]
	pub fn parse(document: &Value, registries: &LeafRegistries, version: ApiVersion) -> Result<Self> {
		let root = expect_object(document, "")?;

		for key in root.keys() {
			if key != OBJECTS_KEY {
				return Err(ParseError::InvalidDocument {
					path: key.clone(),
					message: "unknown top-level key".to_string(),
				});
			}
		}

		let objects_value = root.get(OBJECTS_KEY).ok_or_else(|| ParseError::InvalidDocument {
			path: OBJECTS_KEY.to_string(),
			message: "missing object definitions".to_string(),
		})?;
		let entries = expect_object(objects_value, OBJECTS_KEY)?;

		let mut objects = BTreeMap::new();
		let mut hidden = 0usize;
		for (object_type, entry) in entries {
			let path = join_path(OBJECTS_KEY, object_type);
			let rules = parse_object(object_type, entry, &path, registries)?;
			if rules.visible_in(version) {
				objects.insert(object_type.clone(), rules);
			} else {
				hidden += 1;
			}
		}

		tracing::debug!(objects = objects.len(), hidden, "parsed rule catalog");
		Ok(Self { version, objects })
	}

	/// Parses a catalog from TOML text.
	pub fn from_toml_str(
		content: &str,
		registries: &LeafRegistries,
		version: ApiVersion,
	) -> Result<Self> {
		let document: Value =
			toml::from_str(content).map_err(|e| ParseError::Toml(e.to_string()))?;
		Self::parse(&document, registries, version)
	}

	pub fn version(&self) -> ApiVersion {
		self.version
	}

	pub fn object(&self, object_type: &str) -> Option<&ObjectRules> {
		self.objects.get(object_type)
	}

	pub fn objects(&self) -> impl Iterator<Item = &ObjectRules> + '_ {
		self.objects.values()
	}

	pub fn len(&self) -> usize {
		self.objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}

	/// Object types unknown to the catalog are denied.
	pub fn is_allowed(
		&self,
		object_type: &str,
		operation: Operation,
		abilities: &HashSet<Ability>,
		feature_flags: &HashSet<FeatureFlag>,
	) -> bool {
		self.object(object_type)
			.is_some_and(|rules| rules.is_allowed(operation, abilities, feature_flags))
	}
}

fn parse_object(
	object_type: &str,
	entry: &Value,
	path: &str,
	registries: &LeafRegistries,
) -> Result<ObjectRules> {
	let entry = expect_object(entry, path)?;

	for key in entry.keys() {
		let known = key == FEATURE_FLAGS_PROPERTY
			|| key == FOLDER_TYPE_KEY
			|| key == SINCE_VERSION_KEY
			|| Operation::ALL.iter().any(|op| op.as_str() == key);
		if !known {
			return Err(ParseError::InvalidDocument {
				path: join_path(path, key),
				message: "unknown object property".to_string(),
			});
		}
	}

	let feature_flags =
		RuleParser::new(&registries.feature_flags).parse(entry, path, FEATURE_FLAGS_PROPERTY)?;

	let ability_parser = RuleParser::new(&registries.abilities);
	let empty = Map::new();
	let mut operations: [AccessRule<Ability>; 4] = std::array::from_fn(|_| AccessRule::Deny);
	for operation in Operation::ALL {
		let op_path = join_path(path, operation.as_str());
		let node = match entry.get(operation.as_str()) {
			Some(value) => expect_object(value, &op_path)?,
			None => &empty,
		};
		for key in node.keys() {
			if key != ABILITIES_PROPERTY {
				return Err(ParseError::InvalidDocument {
					path: join_path(&op_path, key),
					message: "unknown operation property".to_string(),
				});
			}
		}
		operations[operation.index()] = ability_parser.parse(node, &op_path, ABILITIES_PROPERTY)?;
	}

	let folder_type = match entry.get(FOLDER_TYPE_KEY) {
		None => None,
		Some(Value::String(s)) if !s.trim().is_empty() => {
			if object_type == FOLDER_OBJECT_TYPE {
				return Err(ParseError::InvalidDocument {
					path: join_path(path, FOLDER_TYPE_KEY),
					message: "folders are protected directly and cannot live in folders".to_string(),
				});
			}
			Some(FolderSystemType(s.clone()))
		}
		Some(_) => {
			return Err(ParseError::InvalidDocument {
				path: join_path(path, FOLDER_TYPE_KEY),
				message: "expected a non-empty string".to_string(),
			})
		}
	};

	let since_version = match entry.get(SINCE_VERSION_KEY) {
		None => None,
		Some(value) => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
			Some(v) if v >= 1 => Some(ApiVersion(v)),
			_ => {
				return Err(ParseError::InvalidDocument {
					path: join_path(path, SINCE_VERSION_KEY),
					message: "expected a positive integer".to_string(),
				})
			}
		},
	};

	Ok(ObjectRules {
		object_type: object_type.to_string(),
		feature_flags,
		operations,
		folder_type,
		since_version,
	})
}

fn expect_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>> {
	match value {
		Value::Object(map) => Ok(map),
		other => Err(ParseError::InvalidDocument {
			path: if path.is_empty() {
				"<root>".to_string()
			} else {
				path.to_string()
			},
			message: format!("expected a table, found {}", value_kind(other)),
		}),
	}
}
