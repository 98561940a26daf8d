// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;

use crate::error::Result;

const SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS folders (
		id INTEGER PRIMARY KEY,
		account_id INTEGER NOT NULL,
		name TEXT NOT NULL,
		use_permissions INTEGER NOT NULL DEFAULT 0
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS folder_objects (
		account_id INTEGER NOT NULL,
		folder_type TEXT NOT NULL,
		object_id INTEGER NOT NULL,
		folder_id INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
		PRIMARY KEY (account_id, folder_type, object_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS folder_user_permissions (
		folder_id INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
		user_id INTEGER NOT NULL,
		can_view INTEGER NOT NULL DEFAULT 0,
		PRIMARY KEY (folder_id, user_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS user_abilities (
		account_id INTEGER NOT NULL,
		user_id INTEGER NOT NULL,
		ability TEXT NOT NULL,
		PRIMARY KEY (account_id, user_id, ability)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS account_feature_flags (
		account_id INTEGER NOT NULL,
		flag TEXT NOT NULL,
		enabled INTEGER NOT NULL DEFAULT 1,
		PRIMARY KEY (account_id, flag)
	)
	"#,
];

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Errors
/// Returns `AccessError::Database` if the URL is invalid or connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

/// Single-connection in-memory pool. Every connection of a `:memory:` pool
/// would otherwise see its own empty database.
pub async fn create_memory_pool() -> Result<SqlitePool> {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await?;
	Ok(pool)
}

/// Creates every table the SQLite repositories use.
#[tracing::instrument(skip(pool))]
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
	for statement in SCHEMA {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(tables = SCHEMA.len(), "schema ready");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn schema_creation_is_repeatable() {
		let pool = create_memory_pool().await.unwrap();
		create_schema(&pool).await.unwrap();
		create_schema(&pool).await.unwrap();

		let (count,): (i64,) = sqlx::query_as(
			"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
		)
		.fetch_one(&pool)
		.await
		.unwrap();
		assert_eq!(count, 5);
	}

	#[tokio::test]
	async fn file_pool_is_created_on_demand() {
		let dir = tempfile::tempdir().unwrap();
		let url = format!("sqlite://{}", dir.path().join("tollgate.db").display());
		let pool = create_pool(&url).await.unwrap();
		create_schema(&pool).await.unwrap();
		assert!(dir.path().join("tollgate.db").exists());
	}
}
