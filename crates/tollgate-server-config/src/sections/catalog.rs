// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rule catalog configuration.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_PATH: &str = "/etc/tollgate/catalog.toml";
const DEFAULT_API_VERSION: u32 = 5;

/// Rule catalog configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct CatalogConfig {
	/// TOML catalog document served to every account.
	pub path: PathBuf,
	/// API version used when a caller does not name one.
	pub default_api_version: u32,
}

impl Default for CatalogConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from(DEFAULT_PATH),
			default_api_version: DEFAULT_API_VERSION,
		}
	}
}

/// Rule catalog configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfigLayer {
	#[serde(default)]
	pub path: Option<PathBuf>,
	#[serde(default)]
	pub default_api_version: Option<u32>,
}

impl CatalogConfigLayer {
	pub fn merge(&mut self, other: CatalogConfigLayer) {
		if other.path.is_some() {
			self.path = other.path;
		}
		if other.default_api_version.is_some() {
			self.default_api_version = other.default_api_version;
		}
	}

	pub fn finalize(self) -> CatalogConfig {
		CatalogConfig {
			path: self.path.unwrap_or_else(|| PathBuf::from(DEFAULT_PATH)),
			default_api_version: self.default_api_version.unwrap_or(DEFAULT_API_VERSION),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_defaults() {
		let config = CatalogConfigLayer::default().finalize();
		assert_eq!(config.path, PathBuf::from("/etc/tollgate/catalog.toml"));
		assert_eq!(config.default_api_version, 5);
	}

	proptest! {
		#[test]
		fn later_layer_wins_field_by_field(
			base_version in proptest::option::of(1u32..100),
			over_version in proptest::option::of(1u32..100),
			over_path in proptest::option::of("[a-z]{1,8}\\.toml"),
		) {
			let mut layer = CatalogConfigLayer {
				path: Some(PathBuf::from("base.toml")),
				default_api_version: base_version,
			};
			layer.merge(CatalogConfigLayer {
				path: over_path.clone().map(PathBuf::from),
				default_api_version: over_version,
			});

			let config = layer.finalize();
			prop_assert_eq!(
				config.path,
				PathBuf::from(over_path.unwrap_or_else(|| "base.toml".to_string()))
			);
			prop_assert_eq!(
				config.default_api_version,
				over_version.or(base_version).unwrap_or(5)
			);
		}
	}
}
