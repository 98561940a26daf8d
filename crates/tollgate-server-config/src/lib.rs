// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for Tollgate.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`TOLLGATE_*`)
//!
//! # Usage
//!
//! ```ignore
//! use tollgate_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Catalog at {}", config.catalog.path.display());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub catalog: CatalogConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`TOLLGATE_*`)
/// 2. Config file (`/etc/tollgate/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Merges sources lowest precedence first, so later sources override.
pub fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let catalog = layer.catalog.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&catalog)?;

	info!(
		database = %database.url,
		catalog = %catalog.path.display(),
		default_api_version = catalog.default_api_version,
		log_level = %logging.level,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		catalog,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(catalog: &CatalogConfig) -> Result<(), ConfigError> {
	if catalog.default_api_version == 0 {
		return Err(ConfigError::Validation(
			"catalog.default_api_version must be at least 1".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FixedSource {
		precedence: Precedence,
		layer: ServerConfigLayer,
	}

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.precedence
		}

		fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
			Ok(self.layer.clone())
		}
	}

	fn level_layer(level: &str) -> ServerConfigLayer {
		ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some(level.to_string()),
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_zero_api_version_is_rejected() {
		let catalog = CatalogConfig {
			default_api_version: 0,
			..Default::default()
		};
		let result = validate_config(&catalog);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("at least 1"));
	}

	#[test]
	fn test_defaults_are_valid() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.database.url, "sqlite:./tollgate.db");
		assert_eq!(config.catalog.default_api_version, 5);
		assert_eq!(config.logging.level, "info");
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let sources: Vec<Box<dyn ConfigSource>> = vec![
			Box::new(FixedSource {
				precedence: Precedence::Environment,
				layer: level_layer("trace"),
			}),
			Box::new(FixedSource {
				precedence: Precedence::ConfigFile,
				layer: level_layer("warn"),
			}),
			Box::new(DefaultsSource),
		];
		let config = load_from_sources(sources).unwrap();
		assert_eq!(config.logging.level, "trace");
	}

	#[test]
	fn test_config_file_values_are_used() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(
			&path,
			r#"
			[database]
			url = "sqlite:/var/lib/tollgate/data.db"

			[catalog]
			path = "/srv/tollgate/catalog.toml"
			default_api_version = 3
			"#,
		)
		.unwrap();

		let sources: Vec<Box<dyn ConfigSource>> =
			vec![Box::new(DefaultsSource), Box::new(TomlSource::new(&path))];
		let config = load_from_sources(sources).unwrap();
		assert_eq!(config.database.url, "sqlite:/var/lib/tollgate/data.db");
		assert_eq!(config.catalog.path.to_str(), Some("/srv/tollgate/catalog.toml"));
		assert_eq!(config.catalog.default_api_version, 3);
	}

	#[test]
	fn test_invalid_file_value_fails_validation() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(&path, "[catalog]\ndefault_api_version = 0\n").unwrap();

		let sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(TomlSource::new(&path))];
		let err = load_from_sources(sources).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}
}
