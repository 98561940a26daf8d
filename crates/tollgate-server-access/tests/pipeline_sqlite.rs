// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Full filter pipeline against SQLite-backed collaborators.

use std::sync::Arc;

use tollgate_server_access::{
	create_memory_pool, create_schema, AccessContext, AccessError, AccountId, ApiVersion,
	LeafRegistries, ObjectAccessManager, RecordIdCollection, RuleCatalogCache,
	SqliteFolderRepository, SqliteGrantRepository, StaticCatalogSource, UserId,
};
use tollgate_policy_core::FolderSystemType;

const CATALOG: &str = r#"
[objects.Prospect]
featureFlags = "feature.prospects"
read = { abilities = { "$anyOf" = ["PROSPECTS_VIEW", "PROSPECTS_VIEW_ALL"] } }

[objects.Form]
featureFlags = "feature.forms"
folderType = "form"
read = { abilities = "FORMS_VIEW" }

[objects.LandingPage]
featureFlags = { "$anyOf" = ["feature.landing_pages", "feature.forms"] }
folderType = "landing_page"
read = { abilities = { "$allOf" = ["LANDING_PAGES_VIEW", "FOLDERS_VIEW"] } }

[objects.Folder]
featureFlags = "feature.folders"
read = { abilities = "FOLDERS_VIEW" }
"#;

const ACCOUNT: AccountId = AccountId(100);
const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);

struct Fixture {
	manager: ObjectAccessManager,
	folders: Arc<SqliteFolderRepository>,
	grants: SqliteGrantRepository,
	open: i64,
	restricted: i64,
}

impl Fixture {
	async fn new() -> Self {
		let pool = create_memory_pool().await.unwrap();
		create_schema(&pool).await.unwrap();

		let registries = Arc::new(LeafRegistries::canonical());
		let source = Arc::new(StaticCatalogSource::from_toml_str(CATALOG).unwrap());
		let catalogs = Arc::new(RuleCatalogCache::new(source, registries.clone()));
		let folders = Arc::new(SqliteFolderRepository::new(pool.clone()));
		let grants = SqliteGrantRepository::new(pool, registries);
		let manager = ObjectAccessManager::new(catalogs, folders.clone(), folders.clone());

		for flag in ["prospects", "forms", "folders"] {
			grants.set_feature_flag(ACCOUNT, flag, true).await.unwrap();
		}
		for user in [ALICE, BOB] {
			for ability in ["FORMS_VIEW", "FOLDERS_VIEW", "LANDING_PAGES_VIEW"] {
				grants.grant_ability(ACCOUNT, user, ability).await.unwrap();
			}
		}
		grants.grant_ability(ACCOUNT, ALICE, "PROSPECTS_VIEW").await.unwrap();

		let open = folders.create_folder(ACCOUNT, "Shared", false).await.unwrap();
		let restricted = folders.create_folder(ACCOUNT, "Leadership", true).await.unwrap();
		folders.set_user_permission(restricted, ALICE, true).await.unwrap();

		let form = FolderSystemType("form".to_string());
		let page = FolderSystemType("landing_page".to_string());
		folders.assign(ACCOUNT, &form, 1, open).await.unwrap();
		folders.assign(ACCOUNT, &form, 2, restricted).await.unwrap();
		folders.assign(ACCOUNT, &page, 1, restricted).await.unwrap();
		folders.assign(ACCOUNT, &page, 2, open).await.unwrap();

		Self {
			manager,
			folders,
			grants,
			open,
			restricted,
		}
	}

	async fn ctx(&self, user: UserId) -> AccessContext {
		AccessContext::resolve(ACCOUNT, user, ApiVersion(5), &self.grants, &self.grants)
			.await
			.unwrap()
	}

	fn candidates(&self) -> RecordIdCollection {
		[
			("Prospect", 10),
			("Prospect", 11),
			("Form", 1),
			("Form", 2),
			("Form", 3),
			("LandingPage", 1),
			("LandingPage", 2),
			("Folder", self.open),
			("Folder", self.restricted),
			("Folder", 9999),
		]
		.into_iter()
		.collect()
	}
}

#[tokio::test]
async fn caller_with_folder_permission_sees_restricted_records() {
	let fixture = Fixture::new().await;
	let alice = fixture.ctx(ALICE).await;

	let visible = fixture
		.manager
		.filter_accessible_records(&alice, &fixture.candidates())
		.await
		.unwrap();

	let expected: RecordIdCollection = [
		("Prospect", 10),
		("Prospect", 11),
		("Form", 1),
		("Form", 2),
		("Form", 3),
		("LandingPage", 1),
		("LandingPage", 2),
		("Folder", fixture.open),
		("Folder", fixture.restricted),
	]
	.into_iter()
	.collect();
	assert_eq!(visible, expected);
}

#[tokio::test]
async fn caller_without_folder_permission_loses_restricted_records() {
	let fixture = Fixture::new().await;
	let bob = fixture.ctx(BOB).await;

	let visible = fixture
		.manager
		.filter_accessible_records(&bob, &fixture.candidates())
		.await
		.unwrap();

	// Form 3 has no folder and is kept.
	let expected: RecordIdCollection = [
		("Form", 1),
		("Form", 3),
		("LandingPage", 2),
		("Folder", fixture.open),
	]
	.into_iter()
	.collect();
	assert_eq!(visible, expected);
	assert!(!fixture.manager.can_user_access_object(&bob, "Prospect").await.unwrap());
	assert!(!fixture.manager.can_user_access_record(&bob, "Form", 2).await.unwrap());
	assert!(fixture.manager.can_user_access_record(&bob, "Form", 1).await.unwrap());
}

#[tokio::test]
async fn permission_changes_are_seen_by_the_next_filter_call() {
	let fixture = Fixture::new().await;
	let bob = fixture.ctx(BOB).await;
	let form_two = RecordIdCollection::single("Form", 2);

	let before = fixture.manager.filter_accessible_records(&bob, &form_two).await.unwrap();
	assert!(before.is_empty());
	assert!(fixture.folders.cached_rows().await > 0);

	fixture.folders.set_use_permissions(fixture.restricted, false).await.unwrap();
	let after = fixture.manager.filter_accessible_records(&bob, &form_two).await.unwrap();
	assert_eq!(after, form_two);
}

#[tokio::test]
async fn disabled_feature_flag_hides_object_type() {
	let fixture = Fixture::new().await;
	fixture.grants.set_feature_flag(ACCOUNT, "forms", false).await.unwrap();
	let alice = fixture.ctx(ALICE).await;

	let visible = fixture
		.manager
		.filter_accessible_records(&alice, &fixture.candidates())
		.await
		.unwrap();
	assert!(!visible.contains_object_type("Form"));
	assert!(!visible.contains_object_type("LandingPage"));
	assert!(visible.contains_object_type("Prospect"));
}

#[tokio::test]
async fn catalog_errors_surface_to_the_caller() {
	let pool = create_memory_pool().await.unwrap();
	create_schema(&pool).await.unwrap();
	let registries = Arc::new(LeafRegistries::canonical());
	let source = Arc::new(
		StaticCatalogSource::from_toml_str(
			r#"
			[objects.Prospect]
			read = { abilities = "PROSPECTS_TELEPORT" }
			"#,
		)
		.unwrap(),
	);
	let folders = Arc::new(SqliteFolderRepository::new(pool));
	let manager = ObjectAccessManager::new(
		Arc::new(RuleCatalogCache::new(source, registries)),
		folders.clone(),
		folders,
	);

	let ctx = AccessContext::new(ACCOUNT, ALICE, ApiVersion(5));
	let err = manager
		.filter_accessible_records(&ctx, &RecordIdCollection::single("Prospect", 1))
		.await
		.unwrap_err();
	assert!(matches!(err, AccessError::Parse(_)));
	assert!(err.to_string().contains("PROSPECTS_TELEPORT"));
}
