// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch container of (object type, record id) pairs.
//!
//! This is the unit of work for access filtering. An object type with no ids
//! is never stored: every mutating operation drops buckets that become empty,
//! so "present with no ids" and "absent" cannot be told apart.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub type RecordId = i64;

/// Object type name of folder records themselves.
pub const FOLDER_OBJECT_TYPE: &str = "Folder";

static NO_IDS: BTreeSet<RecordId> = BTreeSet::new();

/// Object type → set of record ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
	from = "BTreeMap<String, BTreeSet<RecordId>>",
	into = "BTreeMap<String, BTreeSet<RecordId>>"
)]
pub struct RecordIdCollection {
	buckets: BTreeMap<String, BTreeSet<RecordId>>,
}

impl RecordIdCollection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a collection holding a single record.
	pub fn single(object_type: impl Into<String>, id: RecordId) -> Self {
		let mut collection = Self::new();
		collection.add_record_id(object_type, id);
		collection
	}

	/// Adds a record. Adding an existing pair is a no-op.
	pub fn add_record_id(&mut self, object_type: impl Into<String>, id: RecordId) {
		self.buckets.entry(object_type.into()).or_default().insert(id);
	}

	/// Adds several records of one type.
	pub fn add_record_ids<I>(&mut self, object_type: impl Into<String>, ids: I)
	where
		I: IntoIterator<Item = RecordId>,
	{
		let object_type = object_type.into();
		let mut ids = ids.into_iter().peekable();
		if ids.peek().is_none() {
			return;
		}
		self.buckets.entry(object_type).or_default().extend(ids);
	}

	/// Removes a record, dropping its bucket if it becomes empty.
	pub fn remove_record_id(&mut self, object_type: &str, id: RecordId) {
		if let Some(ids) = self.buckets.get_mut(object_type) {
			ids.remove(&id);
			if ids.is_empty() {
				self.buckets.remove(object_type);
			}
		}
	}

	/// Removes every record of one type.
	pub fn remove_all_by_object_type(&mut self, object_type: &str) {
		self.buckets.remove(object_type);
	}

	/// Keeps only the ids of `object_type` for which `keep` returns true.
	pub fn retain_record_ids<F>(&mut self, object_type: &str, mut keep: F)
	where
		F: FnMut(RecordId) -> bool,
	{
		if let Some(ids) = self.buckets.get_mut(object_type) {
			ids.retain(|id| keep(*id));
			if ids.is_empty() {
				self.buckets.remove(object_type);
			}
		}
	}

	pub fn contains_object_type(&self, object_type: &str) -> bool {
		self.buckets.contains_key(object_type)
	}

	pub fn contains_record_id(&self, object_type: &str, id: RecordId) -> bool {
		self.buckets
			.get(object_type)
			.is_some_and(|ids| ids.contains(&id))
	}

	/// Object types present, in sorted order.
	pub fn object_types(&self) -> Vec<String> {
		self.buckets.keys().cloned().collect()
	}

	/// Ids of one type; empty for an absent type.
	pub fn record_ids_by_object_type(&self, object_type: &str) -> &BTreeSet<RecordId> {
		self.buckets.get(object_type).unwrap_or(&NO_IDS)
	}

	/// Adds every pair of `other` to this collection.
	pub fn merge(&mut self, other: &RecordIdCollection) {
		for (object_type, ids) in &other.buckets {
			self.add_record_ids(object_type.clone(), ids.iter().copied());
		}
	}

	/// Total number of (type, id) pairs.
	pub fn len(&self) -> usize {
		self.buckets.values().map(BTreeSet::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty()
	}

	/// Iterates over every (type, id) pair, grouped by type.
	pub fn iter(&self) -> impl Iterator<Item = (&str, RecordId)> + '_ {
		self.buckets
			.iter()
			.flat_map(|(object_type, ids)| ids.iter().map(move |id| (object_type.as_str(), *id)))
	}

	/// True if every pair of this collection is also in `other`.
	pub fn is_subset_of(&self, other: &RecordIdCollection) -> bool {
		self.buckets.iter().all(|(object_type, ids)| {
			other
				.buckets
				.get(object_type)
				.is_some_and(|theirs| ids.is_subset(theirs))
		})
	}
}

impl From<BTreeMap<String, BTreeSet<RecordId>>> for RecordIdCollection {
	fn from(mut buckets: BTreeMap<String, BTreeSet<RecordId>>) -> Self {
		buckets.retain(|_, ids| !ids.is_empty());
		Self { buckets }
	}
}

impl From<RecordIdCollection> for BTreeMap<String, BTreeSet<RecordId>> {
	fn from(collection: RecordIdCollection) -> Self {
		collection.buckets
	}
}

impl<S: Into<String>> FromIterator<(S, RecordId)> for RecordIdCollection {
	fn from_iter<I: IntoIterator<Item = (S, RecordId)>>(iter: I) -> Self {
		let mut collection = Self::new();
		for (object_type, id) in iter {
			collection.add_record_id(object_type, id);
		}
		collection
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_is_idempotent() {
		let mut c = RecordIdCollection::new();
		c.add_record_id("Doc", 1);
		c.add_record_id("Doc", 1);
		assert_eq!(c.len(), 1);
		assert!(c.contains_record_id("Doc", 1));
	}

	#[test]
	fn removing_last_id_drops_type() {
		let mut c = RecordIdCollection::single("Doc", 1);
		c.remove_record_id("Doc", 1);
		assert!(!c.contains_object_type("Doc"));
		assert!(c.is_empty());
		assert_eq!(c, RecordIdCollection::new());
	}

	#[test]
	fn removing_absent_record_is_noop() {
		let mut c = RecordIdCollection::single("Doc", 1);
		c.remove_record_id("Doc", 2);
		c.remove_record_id("Widget", 1);
		assert_eq!(c, RecordIdCollection::single("Doc", 1));
	}

	#[test]
	fn remove_all_by_object_type_drops_bucket() {
		let mut c: RecordIdCollection = [("Doc", 1), ("Doc", 2), ("Widget", 3)].into_iter().collect();
		c.remove_all_by_object_type("Doc");
		assert_eq!(c.object_types(), vec!["Widget".to_string()]);
	}

	#[test]
	fn absent_type_has_empty_ids() {
		let c = RecordIdCollection::new();
		assert!(c.record_ids_by_object_type("Doc").is_empty());
	}

	#[test]
	fn adding_no_ids_does_not_create_type() {
		let mut c = RecordIdCollection::new();
		c.add_record_ids("Doc", Vec::new());
		assert!(!c.contains_object_type("Doc"));
	}

	#[test]
	fn retain_drops_emptied_bucket() {
		let mut c: RecordIdCollection = [("Doc", 1), ("Doc", 2)].into_iter().collect();
		c.retain_record_ids("Doc", |id| id == 2);
		assert_eq!(c, RecordIdCollection::single("Doc", 2));
		c.retain_record_ids("Doc", |_| false);
		assert!(c.is_empty());
	}

	#[test]
	fn clone_is_independent() {
		let original: RecordIdCollection = [("Doc", 1), ("Doc", 2)].into_iter().collect();
		let mut copy = original.clone();
		copy.remove_record_id("Doc", 1);
		assert!(original.contains_record_id("Doc", 1));
		assert!(!copy.contains_record_id("Doc", 1));
	}

	#[test]
	fn object_types_are_sorted() {
		let c: RecordIdCollection = [("Widget", 1), ("Doc", 1), ("Folder", 1)].into_iter().collect();
		assert_eq!(c.object_types(), vec!["Doc", "Folder", "Widget"]);
	}

	#[test]
	fn merge_is_union() {
		let mut a: RecordIdCollection = [("Doc", 1), ("Doc", 2)].into_iter().collect();
		let b: RecordIdCollection = [("Doc", 2), ("Widget", 5)].into_iter().collect();
		a.merge(&b);
		assert_eq!(a.len(), 3);
		assert!(b.is_subset_of(&a));
		assert!(!a.is_subset_of(&b));
	}

	#[test]
	fn iter_yields_pairs_grouped_by_type() {
		let c: RecordIdCollection = [("Widget", 1), ("Doc", 3), ("Doc", 2)].into_iter().collect();
		let pairs: Vec<_> = c.iter().collect();
		assert_eq!(pairs, vec![("Doc", 2), ("Doc", 3), ("Widget", 1)]);
	}

	#[test]
	fn deserializing_drops_empty_types() {
		let c: RecordIdCollection =
			serde_json::from_str(r#"{"Doc":[1,2],"Widget":[]}"#).unwrap();
		assert_eq!(c.object_types(), vec!["Doc".to_string()]);
		assert_eq!(serde_json::to_string(&c).unwrap(), r#"{"Doc":[1,2]}"#);
	}
}
