// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{ParseError, Result};
use crate::leaf::{Leaf, LeafRegistry};
use crate::parser::LeafResolver;
use crate::rule::AccessRule;

/// A permission grantable to a user, e.g. "can view all prospects".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ability(u32);

impl Leaf for Ability {
	const KIND: &'static str = "ability";

	fn from_index(index: u32) -> Self {
		Self(index)
	}

	fn index(self) -> u32 {
		self.0
	}
}

impl std::fmt::Display for Ability {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "ability#{}", self.0)
	}
}

pub type AbilityRegistry = LeafRegistry<Ability>;

/// Abilities known to every deployment.
pub const CANONICAL_ABILITIES: &[&str] = &[
	"PROSPECTS_VIEW",
	"PROSPECTS_VIEW_ALL",
	"PROSPECTS_VIEW_UNASSIGNED",
	"PROSPECTS_CREATE",
	"PROSPECTS_UPDATE",
	"PROSPECTS_DELETE",
	"FOLDERS_VIEW",
	"FOLDERS_CREATE",
	"FOLDERS_UPDATE",
	"FOLDERS_DELETE",
	"FORMS_VIEW",
	"FORMS_CREATE",
	"FORMS_UPDATE",
	"FORMS_DELETE",
	"LANDING_PAGES_VIEW",
	"LANDING_PAGES_CREATE",
	"LANDING_PAGES_UPDATE",
	"LANDING_PAGES_DELETE",
	"EMAIL_TEMPLATES_VIEW",
	"EMAIL_TEMPLATES_CREATE",
	"EMAIL_TEMPLATES_UPDATE",
	"EMAIL_TEMPLATES_DELETE",
	"LISTS_VIEW",
	"LISTS_CREATE",
	"LISTS_UPDATE",
	"LISTS_DELETE",
	"CAMPAIGNS_VIEW",
	"CAMPAIGNS_CREATE",
	"CAMPAIGNS_UPDATE",
	"CAMPAIGNS_DELETE",
	"CUSTOM_REDIRECTS_VIEW",
	"CUSTOM_REDIRECTS_UPDATE",
	"ADMIN_USERS_VIEW",
	"ADMIN_USERS_UPDATE",
];

impl LeafResolver for AbilityRegistry {
	type Token = Ability;

	/// Nothing configured means nobody may act.
	fn absent_rule(&self) -> AccessRule<Ability> {
		AccessRule::Deny
	}

	fn resolve(&self, path: &str, name: &str) -> Result<Ability> {
		self.get(name).ok_or_else(|| ParseError::UnknownAbility {
			path: path.to_string(),
			name: name.to_string(),
		})
	}
}
