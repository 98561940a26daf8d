// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::Context;
use tollgate_policy_core::{ApiVersion, LeafRegistries, RecordId, RecordIdCollection};
use tollgate_server_access::{
	create_pool, create_schema, AccessContext, AccountId, ObjectAccessManager, RuleCatalogCache,
	SqliteFolderRepository, SqliteGrantRepository, StaticCatalogSource, UserId,
};
use tollgate_server_config::ServerConfig;

#[derive(Debug, Clone, clap::Args)]
pub struct FilterArgs {
	/// Account the caller belongs to
	#[arg(long)]
	pub account: i64,

	/// Calling user
	#[arg(long)]
	pub user: i64,

	/// API version to evaluate rules for
	#[arg(long)]
	pub api_version: Option<u32>,

	/// Records to check, as `Type:id[,id...]`
	#[arg(required = true)]
	pub records: Vec<String>,
}

pub async fn run(args: FilterArgs, config: &ServerConfig) -> anyhow::Result<()> {
	let candidates = parse_records(&args.records)?;
	let version = ApiVersion(args.api_version.unwrap_or(config.catalog.default_api_version));

	let pool = create_pool(&config.database.url).await?;
	create_schema(&pool).await?;

	let registries = Arc::new(LeafRegistries::canonical());
	let source = Arc::new(StaticCatalogSource::from_path(&config.catalog.path)?);
	let catalogs = Arc::new(RuleCatalogCache::new(source, Arc::clone(&registries)));
	let folders = Arc::new(SqliteFolderRepository::new(pool.clone()));
	let grants = SqliteGrantRepository::new(pool, registries);
	let manager = ObjectAccessManager::new(catalogs, folders.clone(), folders);

	let ctx = AccessContext::resolve(
		AccountId(args.account),
		UserId(args.user),
		version,
		&grants,
		&grants,
	)
	.await?;
	let accessible = manager.filter_accessible_records(&ctx, &candidates).await?;

	println!("{}", serde_json::to_string_pretty(&accessible)?);
	Ok(())
}

/// Parses `Type:id[,id...]` arguments into one collection.
fn parse_records(args: &[String]) -> anyhow::Result<RecordIdCollection> {
	let mut records = RecordIdCollection::new();
	for arg in args {
		let (object_type, ids) = arg
			.split_once(':')
			.with_context(|| format!("record '{arg}' must look like Type:id[,id...]"))?;
		if object_type.is_empty() {
			anyhow::bail!("record '{arg}' has no object type");
		}
		for id in ids.split(',') {
			let id: RecordId = id
				.trim()
				.parse()
				.with_context(|| format!("invalid record id '{id}' in '{arg}'"))?;
			records.add_record_id(object_type, id);
		}
	}
	Ok(records)
}
