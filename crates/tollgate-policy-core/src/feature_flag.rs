// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::borrow::Cow;

use crate::error::{ParseError, Result};
use crate::leaf::{Leaf, LeafRegistry};
use crate::parser::LeafResolver;
use crate::rule::AccessRule;

/// Prefix every feature flag reference in configuration must carry.
pub const FEATURE_PREFIX: &str = "feature.";

/// An account-level toggle gating availability of functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureFlag(u32);

impl Leaf for FeatureFlag {
	const KIND: &'static str = "feature flag";

	fn from_index(index: u32) -> Self {
		Self(index)
	}

	fn index(self) -> u32 {
		self.0
	}

	fn normalize_name(name: &str) -> Cow<'_, str> {
		if name.bytes().any(|b| b.is_ascii_uppercase()) {
			Cow::Owned(name.to_ascii_lowercase())
		} else {
			Cow::Borrowed(name)
		}
	}
}

impl std::fmt::Display for FeatureFlag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "feature#{}", self.0)
	}
}

/// Registry of flag names without their `feature.` prefix.
pub type FeatureFlagRegistry = LeafRegistry<FeatureFlag>;

/// Feature flags known to every deployment.
pub const CANONICAL_FEATURE_FLAGS: &[&str] = &[
	"prospects",
	"folders",
	"forms",
	"landing_pages",
	"email_templates",
	"lists",
	"campaigns",
	"custom_redirects",
	"dynamic_content",
	"api_v5",
];

impl LeafResolver for FeatureFlagRegistry {
	type Token = FeatureFlag;

	/// Nothing configured means the object is not gated by any flag.
	fn absent_rule(&self) -> AccessRule<FeatureFlag> {
		AccessRule::AllowAnyone
	}

	fn resolve(&self, path: &str, name: &str) -> Result<FeatureFlag> {
		let Some(suffix) = name.strip_prefix(FEATURE_PREFIX) else {
			return Err(ParseError::MissingFeaturePrefix {
				path: path.to_string(),
				name: name.to_string(),
			});
		};

		self.get(suffix).ok_or_else(|| ParseError::UnknownFeatureFlag {
			path: path.to_string(),
			name: name.to_string(),
		})
	}
}
