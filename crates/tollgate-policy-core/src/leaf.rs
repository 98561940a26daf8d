// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Leaf tokens and the symbol tables that resolve them by name.
//!
//! A rule never stores the name of an ability or feature flag, only the token
//! the registry handed out for it. Each leaf kind has its own token type, so a
//! feature-flag token cannot end up in an ability rule or be checked against a
//! user's ability set.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::ability::{Ability, AbilityRegistry, CANONICAL_ABILITIES};
use crate::feature_flag::{FeatureFlag, FeatureFlagRegistry, CANONICAL_FEATURE_FLAGS};

/// A token type that can appear as a rule leaf.
pub trait Leaf: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {
	/// Human readable kind, used in logs.
	const KIND: &'static str;

	fn from_index(index: u32) -> Self;

	fn index(self) -> u32;

	/// Canonical form of a name before it is stored or looked up.
	fn normalize_name(name: &str) -> Cow<'_, str> {
		Cow::Borrowed(name)
	}
}

/// Name → token symbol table for one leaf kind.
///
/// Tokens are dense indexes in definition order. Duplicate names keep the
/// token of their first definition.
#[derive(Debug, Clone)]
pub struct LeafRegistry<T: Leaf> {
	by_name: HashMap<String, T>,
	names: Vec<String>,
}

impl<T: Leaf> LeafRegistry<T> {
	pub fn from_names<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut by_name = HashMap::new();
		let mut ordered = Vec::new();

		for name in names {
			let key = T::normalize_name(name.as_ref()).into_owned();
			if by_name.contains_key(&key) {
				continue;
			}
			let token = T::from_index(ordered.len() as u32);
			by_name.insert(key.clone(), token);
			ordered.push(key);
		}

		Self {
			by_name,
			names: ordered,
		}
	}

	/// Looks up a token by name.
	pub fn get(&self, name: &str) -> Option<T> {
		self.by_name.get(T::normalize_name(name).as_ref()).copied()
	}

	/// Returns the registered name of a token.
	pub fn name_of(&self, token: T) -> Option<&str> {
		self.names.get(token.index() as usize).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// Iterates over every token in definition order.
	pub fn tokens(&self) -> impl Iterator<Item = T> + '_ {
		(0..self.names.len() as u32).map(T::from_index)
	}
}

/// The two registries a catalog is parsed against.
#[derive(Debug, Clone)]
pub struct LeafRegistries {
	pub abilities: AbilityRegistry,
	pub feature_flags: FeatureFlagRegistry,
}

impl LeafRegistries {
	pub fn new(abilities: AbilityRegistry, feature_flags: FeatureFlagRegistry) -> Self {
		Self {
			abilities,
			feature_flags,
		}
	}

	/// Registries built from the built-in ability and feature flag lists.
	pub fn canonical() -> Self {
		Self::new(
			LeafRegistry::<Ability>::from_names(CANONICAL_ABILITIES.iter().copied()),
			LeafRegistry::<FeatureFlag>::from_names(CANONICAL_FEATURE_FLAGS.iter().copied()),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tokens_are_dense_in_definition_order() {
		let registry = LeafRegistry::<Ability>::from_names(["A", "B", "C"]);
		assert_eq!(registry.len(), 3);
		assert_eq!(registry.get("A"), Some(Ability::from_index(0)));
		assert_eq!(registry.get("C"), Some(Ability::from_index(2)));
		assert_eq!(registry.name_of(Ability::from_index(1)), Some("B"));
	}

	#[test]
	fn duplicate_names_keep_first_token() {
		let registry = LeafRegistry::<Ability>::from_names(["A", "B", "A"]);
		assert_eq!(registry.len(), 2);
		assert_eq!(registry.get("A"), Some(Ability::from_index(0)));
	}

	#[test]
	fn ability_lookup_is_case_sensitive() {
		let registry = LeafRegistry::<Ability>::from_names(["PROSPECTS_VIEW"]);
		assert!(registry.get("PROSPECTS_VIEW").is_some());
		assert!(registry.get("prospects_view").is_none());
	}

	#[test]
	fn feature_flag_lookup_ignores_case() {
		let registry = LeafRegistry::<FeatureFlag>::from_names(["Custom_Redirects"]);
		assert_eq!(registry.name_of(FeatureFlag::from_index(0)), Some("custom_redirects"));
		assert!(registry.get("CUSTOM_REDIRECTS").is_some());
		assert!(registry.get("custom_redirects").is_some());
	}

	#[test]
	fn canonical_registries_are_populated() {
		let registries = LeafRegistries::canonical();
		assert_eq!(registries.abilities.len(), CANONICAL_ABILITIES.len());
		assert_eq!(registries.feature_flags.len(), CANONICAL_FEATURE_FLAGS.len());
		assert!(registries.abilities.get("FOLDERS_VIEW").is_some());
		assert!(registries.feature_flags.get("folders").is_some());
	}

	#[test]
	fn tokens_iterates_every_entry() {
		let registry = LeafRegistry::<Ability>::from_names(["A", "B"]);
		let tokens: Vec<_> = registry.tokens().collect();
		assert_eq!(tokens, vec![Ability::from_index(0), Ability::from_index(1)]);
	}
}
