// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Tollgate access policy engine.
//!
//! This crate holds everything about access policy that is a pure function of
//! configuration. It is used by the server-side filter pipeline
//! (`tollgate-server-access`) and by the CLI to validate catalogs.
//!
//! # Overview
//!
//! - [`LeafRegistry`]: name → token tables for abilities and feature flags
//! - [`AccessRule`]: immutable `allOf`/`anyOf` rule trees over tokens
//! - [`RuleParser`]: configuration node → rule tree
//! - [`RuleCatalog`]: per-object-type rules for one API version
//! - [`RecordIdCollection`]: the batch unit of work for record filtering
//!
//! # Example
//!
//! ```
//! use std::collections::HashSet;
//! use tollgate_policy_core::{ApiVersion, LeafRegistries, Operation, RuleCatalog};
//!
//! let registries = LeafRegistries::canonical();
//! let catalog = RuleCatalog::from_toml_str(
//!     r#"
//!     [objects.Form]
//!     read = { abilities = { "$anyOf" = ["FORMS_VIEW", "FORMS_UPDATE"] } }
//!     "#,
//!     &registries,
//!     ApiVersion(5),
//! )
//! .unwrap();
//!
//! let abilities: HashSet<_> = [registries.abilities.get("FORMS_VIEW").unwrap()].into();
//! assert!(catalog.is_allowed("Form", Operation::Read, &abilities, &HashSet::new()));
//! assert!(!catalog.is_allowed("Form", Operation::Delete, &abilities, &HashSet::new()));
//! ```

pub mod ability;
pub mod catalog;
pub mod error;
pub mod feature_flag;
pub mod leaf;
pub mod parser;
pub mod record_ids;
pub mod rule;

pub use ability::{Ability, AbilityRegistry, CANONICAL_ABILITIES};
pub use catalog::{ApiVersion, FolderSystemType, ObjectRules, Operation, RuleCatalog};
pub use error::{ParseError, Result};
pub use feature_flag::{FeatureFlag, FeatureFlagRegistry, CANONICAL_FEATURE_FLAGS, FEATURE_PREFIX};
pub use leaf::{Leaf, LeafRegistries, LeafRegistry};
pub use parser::{LeafResolver, RuleParser, ABILITIES_PROPERTY, ALL_OF, ANY_OF, FEATURE_FLAGS_PROPERTY};
pub use record_ids::{RecordId, RecordIdCollection, FOLDER_OBJECT_TYPE};
pub use rule::{evaluate, AccessRule};
