// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The caller an access check is evaluated for.
//!
//! All attributes are resolved before any check runs: the filter pipeline
//! never goes back to the grant store while it is evaluating rules.

use std::collections::HashSet;

use tollgate_policy_core::{Ability, ApiVersion, FeatureFlag};
use tracing::instrument;

use crate::error::Result;
use crate::grants::{AbilityProvider, FeatureFlagProvider};
use crate::types::{AccountId, UserId};

/// Caller identity plus the abilities and feature flags it possesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
	pub account_id: AccountId,
	pub user_id: UserId,
	pub api_version: ApiVersion,
	abilities: HashSet<Ability>,
	feature_flags: HashSet<FeatureFlag>,
}

impl AccessContext {
	/// Creates a context with no abilities and no enabled flags.
	pub fn new(account_id: AccountId, user_id: UserId, api_version: ApiVersion) -> Self {
		Self {
			account_id,
			user_id,
			api_version,
			abilities: HashSet::new(),
			feature_flags: HashSet::new(),
		}
	}

	/// Loads the caller's abilities and the account's enabled flags.
	#[instrument(
		level = "debug",
		skip(abilities, feature_flags),
		fields(account_id = %account_id, user_id = %user_id, api_version = %api_version)
	)]
	pub async fn resolve(
		account_id: AccountId,
		user_id: UserId,
		api_version: ApiVersion,
		abilities: &dyn AbilityProvider,
		feature_flags: &dyn FeatureFlagProvider,
	) -> Result<Self> {
		let possessed = abilities.abilities_for(account_id, user_id).await?;
		let enabled = feature_flags.enabled_feature_flags(account_id).await?;
		tracing::debug!(
			abilities = possessed.len(),
			feature_flags = enabled.len(),
			"resolved access context"
		);

		Ok(Self {
			account_id,
			user_id,
			api_version,
			abilities: possessed,
			feature_flags: enabled,
		})
	}

	/// Builder: add abilities.
	pub fn with_abilities(mut self, abilities: impl IntoIterator<Item = Ability>) -> Self {
		self.abilities.extend(abilities);
		self
	}

	/// Builder: add enabled feature flags.
	pub fn with_feature_flags(mut self, flags: impl IntoIterator<Item = FeatureFlag>) -> Self {
		self.feature_flags.extend(flags);
		self
	}

	pub fn abilities(&self) -> &HashSet<Ability> {
		&self.abilities
	}

	pub fn feature_flags(&self) -> &HashSet<FeatureFlag> {
		&self.feature_flags
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::grants::StaticGrants;
	use tollgate_policy_core::Leaf;

	#[test]
	fn new_context_possesses_nothing() {
		let ctx = AccessContext::new(AccountId(1), UserId(2), ApiVersion(5));
		assert!(ctx.abilities().is_empty());
		assert!(ctx.feature_flags().is_empty());
	}

	#[test]
	fn builders_extend_sets() {
		let ctx = AccessContext::new(AccountId(1), UserId(2), ApiVersion(5))
			.with_abilities([Ability::from_index(3)])
			.with_feature_flags([FeatureFlag::from_index(1)]);
		assert!(ctx.abilities().contains(&Ability::from_index(3)));
		assert!(ctx.feature_flags().contains(&FeatureFlag::from_index(1)));
	}

	#[tokio::test]
	async fn resolve_reads_both_providers() {
		let grants = StaticGrants::default()
			.grant_ability(AccountId(1), UserId(2), Ability::from_index(4))
			.enable_feature_flag(AccountId(1), FeatureFlag::from_index(0));

		let ctx = AccessContext::resolve(AccountId(1), UserId(2), ApiVersion(5), &grants, &grants)
			.await
			.unwrap();
		assert_eq!(ctx.abilities().len(), 1);
		assert_eq!(ctx.feature_flags().len(), 1);

		let other = AccessContext::resolve(AccountId(1), UserId(9), ApiVersion(5), &grants, &grants)
			.await
			.unwrap();
		assert!(other.abilities().is_empty());
		assert_eq!(other.feature_flags().len(), 1);
	}
}
