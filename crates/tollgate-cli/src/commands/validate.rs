// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use anyhow::Context;
use tollgate_policy_core::{ApiVersion, LeafRegistries, Operation, RuleCatalog};
use tollgate_server_config::ServerConfig;

#[derive(Debug, Clone, clap::Args)]
pub struct ValidateArgs {
	/// Catalog file to check (defaults to the configured catalog path)
	#[arg(long)]
	pub catalog: Option<PathBuf>,

	/// API version to build the catalog for
	#[arg(long)]
	pub api_version: Option<u32>,
}

pub fn run(args: ValidateArgs, config: &ServerConfig) -> anyhow::Result<()> {
	let path = args.catalog.unwrap_or_else(|| config.catalog.path.clone());
	let version = ApiVersion(args.api_version.unwrap_or(config.catalog.default_api_version));

	let content = std::fs::read_to_string(&path)
		.with_context(|| format!("failed to read catalog {}", path.display()))?;
	let registries = LeafRegistries::canonical();
	let catalog = RuleCatalog::from_toml_str(&content, &registries, version)
		.with_context(|| format!("invalid catalog {}", path.display()))?;

	tracing::info!(path = %path.display(), %version, objects = catalog.len(), "catalog is valid");
	println!("{} is valid for {version}", path.display());
	for line in summarize(&catalog, &registries) {
		println!("  {line}");
	}
	Ok(())
}

/// One line per object type: name, folder type and the read rule.
fn summarize(catalog: &RuleCatalog, registries: &LeafRegistries) -> Vec<String> {
	catalog
		.objects()
		.map(|rules| {
			let folder = rules
				.folder_type()
				.map(|t| format!(" folder={t}"))
				.unwrap_or_default();
			format!(
				"{}{folder} flags={} read={}",
				rules.object_type(),
				rules.feature_flags().describe(&registries.feature_flags),
				rules.ability_rule(Operation::Read).describe(&registries.abilities),
			)
		})
		.collect()
}
