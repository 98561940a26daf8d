// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sources of possessed abilities and enabled feature flags.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tollgate_policy_core::{Ability, FeatureFlag, LeafRegistries, FEATURE_PREFIX};
use tracing::instrument;

use crate::error::Result;
use crate::types::{AccountId, UserId};

/// Provides the abilities a user holds.
#[async_trait]
pub trait AbilityProvider: Send + Sync {
	async fn abilities_for(&self, account_id: AccountId, user_id: UserId) -> Result<HashSet<Ability>>;
}

/// Provides the feature flags enabled for an account.
#[async_trait]
pub trait FeatureFlagProvider: Send + Sync {
	async fn enabled_feature_flags(&self, account_id: AccountId) -> Result<HashSet<FeatureFlag>>;
}

/// In-memory grants, for tests and fixed deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticGrants {
	abilities: HashMap<(AccountId, UserId), HashSet<Ability>>,
	feature_flags: HashMap<AccountId, HashSet<FeatureFlag>>,
}

impl StaticGrants {
	pub fn grant_ability(mut self, account_id: AccountId, user_id: UserId, ability: Ability) -> Self {
		self.abilities
			.entry((account_id, user_id))
			.or_default()
			.insert(ability);
		self
	}

	pub fn enable_feature_flag(mut self, account_id: AccountId, flag: FeatureFlag) -> Self {
		self.feature_flags.entry(account_id).or_default().insert(flag);
		self
	}
}

#[async_trait]
impl AbilityProvider for StaticGrants {
	async fn abilities_for(&self, account_id: AccountId, user_id: UserId) -> Result<HashSet<Ability>> {
		Ok(self
			.abilities
			.get(&(account_id, user_id))
			.cloned()
			.unwrap_or_default())
	}
}

#[async_trait]
impl FeatureFlagProvider for StaticGrants {
	async fn enabled_feature_flags(&self, account_id: AccountId) -> Result<HashSet<FeatureFlag>> {
		Ok(self
			.feature_flags
			.get(&account_id)
			.cloned()
			.unwrap_or_default())
	}
}

/// SQLite-backed grants.
///
/// Names are stored as text and resolved through the registries on read.
/// A stored name that no longer resolves (a retired ability, for example) is
/// skipped with a warning rather than failing the caller's request.
#[derive(Clone)]
pub struct SqliteGrantRepository {
	pool: SqlitePool,
	registries: Arc<LeafRegistries>,
}

impl SqliteGrantRepository {
	pub fn new(pool: SqlitePool, registries: Arc<LeafRegistries>) -> Self {
		Self { pool, registries }
	}

	#[instrument(skip(self), fields(account_id = %account_id, user_id = %user_id))]
	pub async fn grant_ability(&self, account_id: AccountId, user_id: UserId, ability: &str) -> Result<()> {
		sqlx::query(
			r#"
			INSERT OR IGNORE INTO user_abilities (account_id, user_id, ability)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(account_id.0)
		.bind(user_id.0)
		.bind(ability)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[instrument(skip(self), fields(account_id = %account_id))]
	pub async fn set_feature_flag(&self, account_id: AccountId, flag: &str, enabled: bool) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO account_feature_flags (account_id, flag, enabled)
			VALUES (?, ?, ?)
			ON CONFLICT (account_id, flag) DO UPDATE SET enabled = excluded.enabled
			"#,
		)
		.bind(account_id.0)
		.bind(flag)
		.bind(enabled)
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[async_trait]
impl AbilityProvider for SqliteGrantRepository {
	#[instrument(skip(self), fields(account_id = %account_id, user_id = %user_id))]
	async fn abilities_for(&self, account_id: AccountId, user_id: UserId) -> Result<HashSet<Ability>> {
		let names: Vec<(String,)> = sqlx::query_as(
			r#"
			SELECT ability FROM user_abilities
			WHERE account_id = ? AND user_id = ?
			"#,
		)
		.bind(account_id.0)
		.bind(user_id.0)
		.fetch_all(&self.pool)
		.await?;

		let mut abilities = HashSet::with_capacity(names.len());
		for (name,) in names {
			match self.registries.abilities.get(&name) {
				Some(ability) => {
					abilities.insert(ability);
				}
				None => tracing::warn!(ability = %name, "skipping unknown stored ability"),
			}
		}
		Ok(abilities)
	}
}

#[async_trait]
impl FeatureFlagProvider for SqliteGrantRepository {
	#[instrument(skip(self), fields(account_id = %account_id))]
	async fn enabled_feature_flags(&self, account_id: AccountId) -> Result<HashSet<FeatureFlag>> {
		let names: Vec<(String,)> = sqlx::query_as(
			r#"
			SELECT flag FROM account_feature_flags
			WHERE account_id = ? AND enabled = 1
			"#,
		)
		.bind(account_id.0)
		.fetch_all(&self.pool)
		.await?;

		let mut flags = HashSet::with_capacity(names.len());
		for (name,) in names {
			let bare = name.strip_prefix(FEATURE_PREFIX).unwrap_or(&name);
			match self.registries.feature_flags.get(bare) {
				Some(flag) => {
					flags.insert(flag);
				}
				None => tracing::warn!(flag = %name, "skipping unknown stored feature flag"),
			}
		}
		Ok(flags)
	}
}
